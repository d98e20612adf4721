//! Sample site definitions used by the server binary and the tests.

use crate::content::{CollectionHooks, HookOperation};
use crate::core::{CmsError, Document, Result};
use crate::metadata::{
    AccessRules, BlockDefinition, CollectionDefinition, FieldDefinition, Operation, SelectOption,
};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

const PASSWORD_FIELD: &str = "password";
const BCRYPT_COST: u32 = 10;

pub fn blocks() -> Vec<BlockDefinition> {
    vec![
        BlockDefinition::new("hero")
            .label("Hero Section")
            .field(FieldDefinition::text("headline").label("Headline").localized())
            .field(FieldDefinition::text("subheadline").label("Subheadline")),
        BlockDefinition::new("text-rich")
            .label("Rich text")
            .field(FieldDefinition::rich_text("content").label("Content")),
        BlockDefinition::new("image")
            .label("Image")
            .field(FieldDefinition::upload("image").label("Picture"))
            .field(FieldDefinition::text("caption").label("Caption")),
    ]
}

pub fn authors() -> CollectionDefinition {
    CollectionDefinition::new("Author", "authors")
        .singular("Author")
        .drafts(false)
        .timestamps(true)
        .access(AccessRules::public_read())
        .field(FieldDefinition::text("name").required().label("Name"))
        .field(FieldDefinition::email("email").required().label("Email"))
        .field(FieldDefinition::text("bio").label("Bio"))
        .field(FieldDefinition::relationship("mentor", "authors").label("Mentor"))
}

pub fn tags() -> CollectionDefinition {
    CollectionDefinition::new("Tag", "tags")
        .singular("Tag")
        .plural("Tags")
        .drafts(false)
        .timestamps(true)
        .access(AccessRules::public_read())
        .field(FieldDefinition::text("name").required().label("Name"))
        .field(FieldDefinition::text("slug").required().label("Slug"))
}

pub fn posts() -> CollectionDefinition {
    CollectionDefinition::new("Post", "posts")
        .singular("Post")
        .timestamps(true)
        .access(AccessRules::public_read())
        .field(FieldDefinition::text("title").required().label("Title"))
        .field(FieldDefinition::text("slug").required().label("Slug"))
        .field(FieldDefinition::text("excerpt").label("Excerpt"))
        .field(FieldDefinition::rich_text("content").required().label("Content"))
        .field(
            FieldDefinition::relationship("author", "authors")
                .required()
                .label("Author"),
        )
        .field(FieldDefinition::relationship("tags", "tags").many().label("Tags"))
}

pub fn pages() -> CollectionDefinition {
    CollectionDefinition::new("Page", "pages")
        .singular("Page")
        .timestamps(true)
        .access(AccessRules::public_read())
        .field(FieldDefinition::text("title").required().localized())
        .field(FieldDefinition::text("slug").required().unique())
        .field(FieldDefinition::blocks("layout", ["hero", "text-rich"]))
}

pub fn movies() -> CollectionDefinition {
    CollectionDefinition::new("Movie", "movies")
        .singular("Movie")
        .timestamps(true)
        .access(AccessRules::public_read())
        .field(FieldDefinition::text("title").required().label("Movie Title"))
        .field(FieldDefinition::number("year").label("Release Year").min(1900.0))
        .field(FieldDefinition::select(
            "genre",
            vec![
                SelectOption::new("Action", "action"),
                SelectOption::new("Drama", "drama"),
            ],
        ))
}

pub fn users() -> CollectionDefinition {
    CollectionDefinition::new("User", "users")
        .singular("User")
        .timestamps(true)
        .drafts(false)
        .access(AccessRules::admin_only().allow(Operation::Read, &["admin", "editor"]))
        .hooks(Arc::new(UserHooks))
        .field(FieldDefinition::email("email").required().unique())
        .field(FieldDefinition::text("password").required().label("Password"))
        .field(FieldDefinition::text("name").label("Full Name"))
}

/// Every playground collection, in dependency order.
pub fn collections() -> Vec<CollectionDefinition> {
    vec![authors(), tags(), posts(), pages(), movies(), users()]
}

/// Hashes passwords on write and never hands them out on read.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserHooks;

fn is_bcrypt_hash(value: &str) -> bool {
    value.len() == 60 && value.starts_with("$2")
}

#[async_trait]
impl CollectionHooks for UserHooks {
    async fn before_change(&self, mut data: Document, _operation: HookOperation) -> Result<Document> {
        let plain = match data.get(PASSWORD_FIELD) {
            Some(Value::String(password)) if !is_bcrypt_hash(password) => password.clone(),
            _ => return Ok(data),
        };
        let hashed = tokio::task::spawn_blocking(move || bcrypt::hash(plain, BCRYPT_COST))
            .await?
            .map_err(|err| CmsError::Storage(format!("password hashing failed: {}", err)))?;
        data.insert(PASSWORD_FIELD.to_string(), Value::String(hashed));
        Ok(data)
    }

    async fn after_read(&self, mut document: Document) -> Result<Document> {
        document.remove(PASSWORD_FIELD);
        Ok(document)
    }
}
