use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};
use vertex_cms::content::{
    CollectionHooks, FindOneOptions, FindQuery, HookOperation, StatusFilter,
};
use vertex_cms::locale::LocaleConfig;
use vertex_cms::metadata::{AccessRules, CollectionDefinition, FieldDefinition, Operation};
use vertex_cms::storage::{DocumentStore, InMemoryDocumentStore};
use vertex_cms::{
    Caller, CmsConfig, CmsError, ContentEngine, Document, DocumentStatus, Result, Vertex,
    playground,
};

fn doc(value: Value) -> Document {
    value.as_object().cloned().expect("object literal")
}

fn id_of(document: &Document) -> String {
    document["_id"].as_str().expect("document id").to_string()
}

async fn boot() -> Vertex {
    let locales = LocaleConfig::new("en", vec!["en".into(), "es".into()]);
    Vertex::builder()
        .config(CmsConfig::new().locales(locales))
        .blocks(playground::blocks())
        .collections(playground::collections())
        .build()
        .await
        .expect("boot playground")
}

async fn create_author(cms: &Vertex, name: &str) -> String {
    let author = cms
        .engine()
        .create(
            "authors",
            doc(json!({"name": name, "email": format!("{}@example.com", name.to_lowercase().replace(' ', "."))})),
        )
        .await
        .expect("create author");
    id_of(&author)
}

async fn create_post(cms: &Vertex, title: &str) -> String {
    let author = create_author(cms, "Jane Doe").await;
    let post = cms
        .engine()
        .create(
            "posts",
            doc(json!({
                "title": title,
                "slug": title.to_lowercase().replace(' ', "-"),
                "content": "<p>body</p>",
                "author": author,
            })),
        )
        .await
        .expect("create post");
    id_of(&post)
}

#[tokio::test]
async fn drafts_are_hidden_from_default_listings() {
    let cms = boot().await;
    let engine = cms.engine();
    let id = create_post(&cms, "Hello World").await;

    let post = engine.find_one("posts", &id, FindOneOptions::new()).await.unwrap();
    assert_eq!(post["status"], json!("draft"));

    let listed = engine.find_all("posts", FindQuery::new()).await.unwrap();
    assert_eq!(listed.total_docs, 0);
    assert!(listed.docs.is_empty());

    let all = engine
        .find_all("posts", FindQuery::new().status(StatusFilter::All))
        .await
        .unwrap();
    assert_eq!(all.total_docs, 1);
    assert_eq!(id_of(&all.docs[0]), id);

    engine.publish("posts", &id).await.unwrap();
    let listed = engine.find_all("posts", FindQuery::new()).await.unwrap();
    assert_eq!(listed.total_docs, 1);
}

#[tokio::test]
async fn collections_without_drafts_list_everything() {
    let cms = boot().await;
    create_author(&cms, "Ada").await;
    let listed = cms.engine().find_all("authors", FindQuery::new()).await.unwrap();
    assert_eq!(listed.total_docs, 1);
    assert!(listed.docs[0].get("status").is_none());
}

#[tokio::test]
async fn localized_fields_resolve_per_request() {
    let cms = boot().await;
    let engine = cms.engine();
    let page = engine
        .create(
            "pages",
            doc(json!({"title": {"en": "Home", "es": "Inicio"}, "slug": "home"})),
        )
        .await
        .unwrap();
    let id = id_of(&page);

    let es = engine
        .find_one("pages", &id, FindOneOptions::new().locale("es"))
        .await
        .unwrap();
    assert_eq!(es["title"], json!("Inicio"));

    let fr = engine
        .find_one("pages", &id, FindOneOptions::new().locale("fr"))
        .await
        .unwrap();
    assert_eq!(fr["title"], json!("Home"));

    let raw = engine
        .find_one("pages", &id, FindOneOptions::new().raw())
        .await
        .unwrap();
    assert_eq!(raw["title"], json!({"en": "Home", "es": "Inicio"}));
}

#[tokio::test]
async fn scalar_update_writes_default_translation() {
    let cms = boot().await;
    let engine = cms.engine();
    let page = engine
        .create(
            "pages",
            doc(json!({"title": {"en": "Home", "es": "Inicio"}, "slug": "home"})),
        )
        .await
        .unwrap();
    let id = id_of(&page);

    let updated = engine
        .update("pages", &id, doc(json!({"title": "Welcome"})))
        .await
        .unwrap();
    assert_eq!(updated["title"], json!({"en": "Welcome", "es": "Inicio"}));

    let listed = engine
        .find_all(
            "pages",
            FindQuery::new().status(StatusFilter::All).locale("es"),
        )
        .await
        .unwrap();
    assert_eq!(listed.docs[0]["title"], json!("Inicio"));
}

#[tokio::test]
async fn unsupported_locale_keys_are_rejected() {
    let cms = boot().await;
    let err = cms
        .engine()
        .create(
            "pages",
            doc(json!({"title": {"en": "Home", "it": "Casa"}, "slug": "home"})),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CmsError::Validation(_)));
}

#[tokio::test]
async fn layout_keeps_only_resolved_blocks() {
    let cms = boot().await;
    let engine = cms.engine();
    let page = engine
        .create(
            "pages",
            doc(json!({
                "title": "Landing",
                "slug": "landing",
                "layout": [
                    {"blockType": "hero", "headline": {"en": "Welcome", "es": "Bienvenido"}},
                    {"blockType": "text-rich", "content": "<p>Hi</p>"},
                ],
            })),
        )
        .await
        .unwrap();

    let es = engine
        .find_one("pages", &id_of(&page), FindOneOptions::new().locale("es"))
        .await
        .unwrap();
    let layout = es["layout"].as_array().unwrap();
    assert_eq!(layout.len(), 2);
    assert_eq!(layout[0]["blockType"], json!("hero"));
    assert_eq!(layout[0]["headline"], json!("Bienvenido"));

    let err = engine
        .create(
            "pages",
            doc(json!({
                "title": "Broken",
                "slug": "broken",
                "layout": [{"blockType": "image", "caption": "nope"}],
            })),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CmsError::Validation(_)));
}

#[tokio::test]
async fn updating_published_document_adds_one_version() {
    let cms = boot().await;
    let engine = cms.engine();
    let id = create_post(&cms, "First").await;

    engine.publish("posts", &id).await.unwrap();
    let before = engine.list_versions("posts", &id).await.unwrap();
    assert_eq!(before.len(), 1);
    let prior_max = before[0].version_number;

    engine
        .update("posts", &id, doc(json!({"title": "Second"})))
        .await
        .unwrap();

    let after = engine.list_versions("posts", &id).await.unwrap();
    assert_eq!(after.len(), 2);
    assert_eq!(after[0].version_number, prior_max + 1);
    assert_eq!(after[0].data["title"], json!("Second"));
    assert_eq!(after[0].created_by, None);
}

#[tokio::test]
async fn draft_updates_and_unpublish_record_no_version() {
    let cms = boot().await;
    let engine = cms.engine();
    let id = create_post(&cms, "Draft").await;

    engine
        .update("posts", &id, doc(json!({"excerpt": "short"})))
        .await
        .unwrap();
    assert!(engine.list_versions("posts", &id).await.unwrap().is_empty());

    engine.publish("posts", &id).await.unwrap();
    let doc_after = engine.unpublish("posts", &id).await.unwrap();
    assert_eq!(DocumentStatus::of(&doc_after), Some(DocumentStatus::Draft));
    assert_eq!(engine.list_versions("posts", &id).await.unwrap().len(), 1);

    let listed = engine.find_all("posts", FindQuery::new()).await.unwrap();
    assert_eq!(listed.total_docs, 0);
}

#[tokio::test]
async fn version_history_is_bounded_and_newest_first() {
    let cms = boot().await;
    let engine = cms.engine();
    let id = create_post(&cms, "Busy").await;
    engine.publish("posts", &id).await.unwrap();

    for n in 0..7 {
        engine
            .update("posts", &id, doc(json!({"title": format!("Busy {n}")})))
            .await
            .unwrap();
    }

    let versions = engine.list_versions("posts", &id).await.unwrap();
    assert!(versions.len() <= 5);
    assert_eq!(versions[0].version_number, 8);
    assert!(
        versions
            .windows(2)
            .all(|pair| pair[0].version_number > pair[1].version_number)
    );
    assert_eq!(versions[0].data["title"], json!("Busy 6"));
}

#[tokio::test]
async fn restore_brings_back_snapshot_fields() {
    let cms = boot().await;
    let engine = cms.engine();
    let id = create_post(&cms, "Original").await;
    engine
        .update("posts", &id, doc(json!({"excerpt": "first cut"})))
        .await
        .unwrap();
    engine.publish("posts", &id).await.unwrap();
    let snapshot = engine.list_versions("posts", &id).await.unwrap().remove(0);

    engine
        .update(
            "posts",
            &id,
            doc(json!({"title": "Rewritten", "excerpt": "second cut"})),
        )
        .await
        .unwrap();

    engine.restore_version("posts", &snapshot.id).await.unwrap();
    let restored = engine
        .find_one("posts", &id, FindOneOptions::new().raw())
        .await
        .unwrap();

    for field in ["title", "slug", "excerpt", "content", "author"] {
        assert_eq!(restored[field], snapshot.data[field], "field {field}");
    }
    assert_eq!(restored["status"], json!("published"));
}

#[tokio::test]
async fn restore_of_foreign_version_is_not_found() {
    let cms = boot().await;
    let engine = cms.engine();
    let id = create_post(&cms, "Mine").await;
    engine.publish("posts", &id).await.unwrap();
    let version = engine.list_versions("posts", &id).await.unwrap().remove(0);

    let err = engine.restore_version("pages", &version.id).await.unwrap_err();
    assert!(matches!(err, CmsError::VersionNotFound(_)));
}

#[tokio::test]
async fn populate_replaces_ids_with_documents() {
    let cms = boot().await;
    let engine = cms.engine();
    let id = create_post(&cms, "Linked").await;

    let plain = engine.find_one("posts", &id, FindOneOptions::new()).await.unwrap();
    assert!(plain["author"].is_string());

    let populated = engine
        .find_one("posts", &id, FindOneOptions::new().populate("author"))
        .await
        .unwrap();
    assert_eq!(populated["author"]["name"], json!("Jane Doe"));
    assert_eq!(populated["author"]["_id"], plain["author"]);
}

#[tokio::test]
async fn populate_many_relationship() {
    let cms = boot().await;
    let engine = cms.engine();
    let author = create_author(&cms, "Sam").await;
    let rust = engine
        .create("tags", doc(json!({"name": "Rust", "slug": "rust"})))
        .await
        .unwrap();
    let cms_tag = engine
        .create("tags", doc(json!({"name": "CMS", "slug": "cms"})))
        .await
        .unwrap();

    let post = engine
        .create(
            "posts",
            doc(json!({
                "title": "Tagged",
                "slug": "tagged",
                "content": "x",
                "author": author,
                "tags": [id_of(&rust), id_of(&cms_tag)],
            })),
        )
        .await
        .unwrap();

    let populated = engine
        .find_one(
            "posts",
            &id_of(&post),
            FindOneOptions::new().populate("author,tags"),
        )
        .await
        .unwrap();
    let names: Vec<&str> = populated["tags"]
        .as_array()
        .unwrap()
        .iter()
        .map(|tag| tag["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Rust", "CMS"]);
    assert_eq!(populated["author"]["name"], json!("Sam"));
}

#[tokio::test]
async fn search_for_relationship_matches_and_projects() {
    let cms = boot().await;
    let engine = cms.engine();
    create_author(&cms, "Jane Doe").await;
    create_author(&cms, "John Smith").await;

    let found = engine
        .search_for_relationship("authors", "jAnE", None, None)
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["name"], json!("Jane Doe"));
    assert!(found[0].contains_key("_id"));
    assert!(!found[0].contains_key("email"));

    let everyone = engine
        .search_for_relationship("authors", "", Some(10), None)
        .await
        .unwrap();
    assert_eq!(everyone.len(), 2);
}

#[tokio::test]
async fn search_skips_unpublished_documents() {
    let cms = boot().await;
    let engine = cms.engine();
    let draft = create_post(&cms, "Hidden Gem").await;
    let found = engine
        .search_for_relationship("posts", "gem", None, None)
        .await
        .unwrap();
    assert!(found.is_empty());

    engine.publish("posts", &draft).await.unwrap();
    let found = engine
        .search_for_relationship("posts", "gem", None, Some(vec!["title".into()]))
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
}

#[tokio::test]
async fn delete_then_lookup_is_not_found() {
    let cms = boot().await;
    let engine = cms.engine();
    let id = create_post(&cms, "Short lived").await;

    let result = engine.delete("posts", &id).await.unwrap();
    assert!(result.deleted);
    assert_eq!(result.id, id);

    let err = engine.find_one("posts", &id, FindOneOptions::new()).await.unwrap_err();
    assert!(err.is_not_found());
    let err = engine.delete("posts", &id).await.unwrap_err();
    assert!(matches!(err, CmsError::DocumentNotFound { .. }));
}

#[tokio::test]
async fn unknown_collection_is_reported() {
    let cms = boot().await;
    let err = cms
        .engine()
        .find_all("comments", FindQuery::new())
        .await
        .unwrap_err();
    assert!(matches!(err, CmsError::CollectionNotFound(ref slug) if slug == "comments"));
}

#[tokio::test]
async fn status_changes_only_through_publish() {
    let cms = boot().await;
    let engine = cms.engine();
    let id = create_post(&cms, "Sneaky").await;
    let err = engine
        .update("posts", &id, doc(json!({"status": "published"})))
        .await
        .unwrap_err();
    assert!(matches!(err, CmsError::Validation(_)));

    let err = engine.publish("authors", "whatever").await.unwrap_err();
    assert!(matches!(err, CmsError::Configuration(_)));
}

#[tokio::test]
async fn validation_rejects_bad_payloads() {
    let cms = boot().await;
    let engine = cms.engine();

    let cases = [
        json!({"year": 2000}),
        json!({"title": "Old", "year": 1850}),
        json!({"title": "Odd", "genre": "comedy"}),
        json!({"title": 42}),
    ];
    for payload in cases {
        let err = engine.create("movies", doc(payload.clone())).await.unwrap_err();
        assert!(matches!(err, CmsError::Validation(_)), "payload {payload}");
    }

    let err = engine
        .create("authors", doc(json!({"name": "X", "email": "not-an-email"})))
        .await
        .unwrap_err();
    assert!(matches!(err, CmsError::Validation(_)));
}

#[tokio::test]
async fn empty_strings_and_unknown_fields_are_dropped() {
    let cms = boot().await;
    let movie = cms
        .engine()
        .create(
            "movies",
            doc(json!({"title": "Heat", "genre": "", "director": "Mann"})),
        )
        .await
        .unwrap();
    assert_eq!(movie["title"], json!("Heat"));
    assert!(movie.get("genre").is_none());
    assert!(movie.get("director").is_none());
    assert!(movie.contains_key("createdAt"));
}

#[tokio::test]
async fn unique_fields_reject_duplicates() {
    let cms = boot().await;
    let engine = cms.engine();
    engine
        .create("pages", doc(json!({"title": "About", "slug": "about"})))
        .await
        .unwrap();
    let err = engine
        .create("pages", doc(json!({"title": "About again", "slug": "about"})))
        .await
        .unwrap_err();
    assert!(matches!(err, CmsError::DuplicateKey { ref field, .. } if field == "slug"));
}

#[tokio::test]
async fn user_hooks_hash_and_hide_passwords() {
    let cms = boot().await;
    let engine = cms.engine();
    let user = engine
        .create(
            "users",
            doc(json!({"email": "admin@example.com", "password": "hunter2", "name": "Admin"})),
        )
        .await
        .unwrap();
    assert!(user.get("password").is_none());

    let id = id_of(&user);
    let fetched = engine.find_one("users", &id, FindOneOptions::new()).await.unwrap();
    assert!(fetched.get("password").is_none());
    assert_eq!(fetched["name"], json!("Admin"));
}

#[tokio::test]
async fn pagination_windows() {
    let cms = boot().await;
    let engine = cms.engine();
    for n in 0..12 {
        engine
            .create("movies", doc(json!({"title": format!("Movie {n}")})))
            .await
            .unwrap();
    }

    let page = engine
        .find_all(
            "movies",
            FindQuery::new().status(StatusFilter::All).limit(5).page(3),
        )
        .await
        .unwrap();
    assert_eq!(page.total_docs, 12);
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.docs.len(), 2);
    assert!(!page.has_next_page());

    let sorted = engine
        .find_all(
            "movies",
            FindQuery::new().status(StatusFilter::All).sort("title").limit(1),
        )
        .await
        .unwrap();
    assert_eq!(sorted.docs[0]["title"], json!("Movie 0"));
}

#[tokio::test]
async fn access_rules_guard_operations() {
    let cms = boot().await;
    let engine = cms.engine();

    let anon = Caller::anonymous();
    assert!(engine.authorize("posts", Operation::Read, &anon).is_ok());
    let err = engine
        .create_as("posts", doc(json!({"title": "x"})), &anon)
        .await
        .unwrap_err();
    assert!(matches!(err, CmsError::Unauthorized(_)));

    let editor = Caller::authenticated("u-1", vec!["editor".into()]);
    let viewer = Caller::authenticated("u-2", vec!["viewer".into()]);
    assert!(engine.authorize("users", Operation::Read, &editor).is_ok());
    assert!(matches!(
        engine.authorize("users", Operation::Read, &viewer),
        Err(CmsError::Forbidden(_))
    ));
    assert!(engine.authorize("users", Operation::Delete, &Caller::admin("root")).is_ok());
}

#[tokio::test]
async fn create_as_records_the_author() {
    let cms = boot().await;
    let engine = cms.engine();
    let editor = Caller::authenticated("u-7", vec!["editor".into()]);
    let author = create_author(&cms, "Kim").await;

    let post = engine
        .create_as(
            "posts",
            doc(json!({"title": "Mine", "slug": "mine", "content": "x", "author": author, "createdBy": "someone-else"})),
            &editor,
        )
        .await
        .unwrap();
    assert_eq!(post["createdBy"], json!("u-7"));

    let id = id_of(&post);
    engine.publish("posts", &id).await.unwrap();
    let versions = engine.list_versions("posts", &id).await.unwrap();
    assert_eq!(versions[0].created_by.as_deref(), Some("u-7"));
}

#[tokio::test]
async fn huge_page_numbers_return_an_empty_page() {
    let cms = boot().await;
    create_post(&cms, "Only Post").await;

    let params = HashMap::from([
        ("page".to_string(), usize::MAX.to_string()),
        ("status".to_string(), "all".to_string()),
    ]);
    let page = assert_ok!(cms.engine().find_all("posts", FindQuery::from_params(&params)).await);
    assert_eq!(page.total_docs, 1);
    assert_eq!(page.page, usize::MAX);
    assert!(page.docs.is_empty());
    assert!(!page.has_next_page());
}

#[tokio::test]
async fn unvalidated_zero_page_limit_still_paginates() {
    let store: Arc<dyn DocumentStore> = Arc::new(InMemoryDocumentStore::new());
    let cms = Vertex::builder()
        .store(Arc::clone(&store))
        .blocks(playground::blocks())
        .collections(playground::collections())
        .build()
        .await
        .unwrap();
    cms.engine()
        .create("movies", doc(json!({"title": "Heat"})))
        .await
        .unwrap();

    let engine = ContentEngine::new(
        store,
        Arc::clone(cms.registry()),
        CmsConfig::new().default_page_limit(0),
    );
    let page = assert_ok!(
        engine
            .find_all("movies", FindQuery::new().status(StatusFilter::All))
            .await
    );
    assert_eq!(page.limit, 1);
    assert_eq!(page.total_pages, 1);
    assert_eq!(page.docs.len(), 1);
}

fn notes() -> CollectionDefinition {
    CollectionDefinition::new("Note", "notes")
        .drafts(false)
        .access(AccessRules::public_read())
        .field(FieldDefinition::text("title"))
        .field(FieldDefinition::relationship("owner", "users"))
}

#[tokio::test]
async fn joined_documents_run_their_own_read_hooks() {
    let cms = Vertex::builder()
        .blocks(playground::blocks())
        .collections(playground::collections())
        .collection(notes())
        .build()
        .await
        .unwrap();
    let engine = cms.engine();
    let user = engine
        .create(
            "users",
            doc(json!({"email": "owner@example.com", "password": "hunter2", "name": "Owner"})),
        )
        .await
        .unwrap();
    let note = engine
        .create("notes", doc(json!({"title": "Groceries", "owner": id_of(&user)})))
        .await
        .unwrap();
    let id = id_of(&note);

    let populated = engine
        .find_one("notes", &id, FindOneOptions::new().populate("owner"))
        .await
        .unwrap();
    assert_eq!(populated["owner"]["name"], json!("Owner"));
    assert!(populated["owner"].get("password").is_none());

    let raw = engine
        .find_one("notes", &id, FindOneOptions::new().raw().populate("owner"))
        .await
        .unwrap();
    assert_eq!(raw["owner"]["_id"], json!(id_of(&user)));
    assert!(raw["owner"].get("password").is_none());
}

/// Rejects every change of the given kind.
struct RejectingHooks {
    operation: HookOperation,
}

#[async_trait]
impl CollectionHooks for RejectingHooks {
    async fn before_change(&self, data: Document, operation: HookOperation) -> Result<Document> {
        if operation == self.operation {
            return Err(CmsError::validation("title is locked"));
        }
        Ok(data)
    }
}

async fn boot_locked(operation: HookOperation) -> Vertex {
    Vertex::builder()
        .collection(
            CollectionDefinition::new("Memo", "memos")
                .hooks(Arc::new(RejectingHooks { operation }))
                .field(FieldDefinition::text("title")),
        )
        .build()
        .await
        .unwrap()
}

#[tokio::test]
async fn failing_before_change_aborts_create() {
    let cms = boot_locked(HookOperation::Create).await;
    let engine = cms.engine();

    let err = assert_err!(engine.create("memos", doc(json!({"title": "x"}))).await);
    assert!(matches!(err, CmsError::Validation(_)));

    let all = engine
        .find_all("memos", FindQuery::new().status(StatusFilter::All))
        .await
        .unwrap();
    assert_eq!(all.total_docs, 0);
}

#[tokio::test]
async fn failing_before_change_aborts_update() {
    let cms = boot_locked(HookOperation::Update).await;
    let engine = cms.engine();
    let memo = engine
        .create("memos", doc(json!({"title": "before"})))
        .await
        .unwrap();
    let id = id_of(&memo);

    let err = assert_err!(engine.update("memos", &id, doc(json!({"title": "after"}))).await);
    assert!(matches!(err, CmsError::Validation(_)));

    let stored = engine
        .find_one("memos", &id, FindOneOptions::new().raw())
        .await
        .unwrap();
    assert_eq!(stored["title"], json!("before"));
}

#[tokio::test]
async fn zero_limit_relationship_search_returns_nothing() {
    let cms = boot().await;
    create_author(&cms, "Ada Lovelace").await;
    let engine = cms.engine();

    let found = engine
        .search_for_relationship("authors", "", Some(0), None)
        .await
        .unwrap();
    assert!(found.is_empty());

    let found = engine
        .search_for_relationship("authors", "", None, None)
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
}
