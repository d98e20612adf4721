use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;
use vertex_cms::{Vertex, playground};

async fn router() -> axum::Router {
    let cms = Vertex::builder()
        .blocks(playground::blocks())
        .collections(playground::collections())
        .build()
        .await
        .expect("boot playground");
    axum::Router::new().nest("/api/vertex", cms.config_router())
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

#[tokio::test]
async fn config_lists_public_collections() {
    let response = router().await.oneshot(get("/api/vertex/config")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = decode_json(response).await;
    let slugs: Vec<&str> = body["collections"]
        .as_array()
        .expect("collections array")
        .iter()
        .map(|collection| collection["slug"].as_str().unwrap())
        .collect();
    assert_eq!(slugs, vec!["authors", "tags", "posts", "pages", "movies", "users"]);
}

#[tokio::test]
async fn collection_config_exposes_block_fields() {
    let response = router()
        .await
        .oneshot(get("/api/vertex/config/collections/pages"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = decode_json(response).await;
    assert_eq!(body["slug"], json!("pages"));
    assert_eq!(body["drafts"], json!(true));
    assert_eq!(body["maxVersions"], json!(5));

    let layout = body["fields"]
        .as_array()
        .unwrap()
        .iter()
        .find(|field| field["name"] == "layout")
        .expect("layout field");
    let blocks = layout["blocks"].as_array().expect("resolved blocks");
    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0]["slug"], json!("hero"));
    assert!(blocks[0]["fields"].as_array().unwrap().len() == 2);
    assert!(layout.get("blockTypes").is_none());
}

#[tokio::test]
async fn unknown_and_internal_collections_are_not_found() {
    for uri in [
        "/api/vertex/config/collections/comments",
        "/api/vertex/config/collections/_versions",
    ] {
        let response = router().await.oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
        let body = decode_json(response).await;
        assert_eq!(body["code"], json!("not_found"));
        assert!(body["error"].as_str().is_some());
    }
}

#[tokio::test]
async fn locales_endpoint_reports_configuration() {
    let response = router()
        .await
        .oneshot(get("/api/vertex/config/locales"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = decode_json(response).await;
    assert_eq!(body["default"], json!("en"));
    assert!(
        body["supported"]
            .as_array()
            .unwrap()
            .contains(&json!("es"))
    );
}

async fn decode_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body");
    serde_json::from_slice(&bytes).expect("json body")
}
