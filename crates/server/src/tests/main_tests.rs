use super::*;
use axum::{
    body::{self, Body},
    http::Request,
    response::Response,
};
use catalog_api::LatencyProfile;
use serde::de::DeserializeOwned;
use storage::{seed::DEMO_OWNER_ID, PieceRepository};
use tower::ServiceExt;

const BOUNDARY: &str = "earthen-test-boundary";

fn test_app(session: Option<Identity>) -> (Router, CatalogContext) {
    let catalog = CatalogContext::new(Arc::new(MemoryStore::seeded()))
        .with_latency(LatencyProfile::none());
    let app = build_router(Arc::new(AppState {
        catalog: catalog.clone(),
        session,
    }));
    (app, catalog)
}

fn admin() -> Option<Identity> {
    Some(Identity::new(DEMO_OWNER_ID, "admin@example.com"))
}

async fn json_body<T: DeserializeOwned>(response: Response) -> T {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).expect("request")
}

enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

fn multipart_request(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    let mut payload = Vec::new();
    for part in parts {
        payload.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                payload.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                        .as_bytes(),
                );
            }
            Part::File(file_name, content_type, bytes) => {
                payload.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"images\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                payload.extend_from_slice(bytes);
                payload.extend_from_slice(b"\r\n");
            }
        }
    }
    payload.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::post(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(payload))
        .expect("request")
}

fn mug_fields() -> Vec<Part<'static>> {
    vec![
        Part::Text("name", "Mug"),
        Part::Text("description", "A nice little mug"),
        Part::Text("materials", "Clay"),
        Part::Text("category_id", "cat3"),
    ]
}

#[tokio::test]
async fn healthz_reports_ok() {
    let (app, _catalog) = test_app(None);
    let response = app.oneshot(get("/healthz")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    assert_eq!(body.as_ref(), b"ok");
}

#[tokio::test]
async fn session_route_reflects_auth_bypass() {
    let (app, _catalog) = test_app(admin());
    let response = app.oneshot(get("/session")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let identity: Identity = json_body(response).await;
    assert_eq!(identity.owner_id.as_str(), DEMO_OWNER_ID);

    let (app, _catalog) = test_app(None);
    let response = app.oneshot(get("/session")).await.expect("response");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn categories_route_lists_the_four_defaults() {
    let (app, _catalog) = test_app(None);
    let response = app.oneshot(get("/categories")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let categories: Vec<Category> = json_body(response).await;
    let names: Vec<_> = categories.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["Vases", "Bowls", "Mugs", "Decorative"]);
}

#[tokio::test]
async fn listing_falls_back_to_the_session_owner() {
    let (app, _catalog) = test_app(admin());
    let response = app.clone().oneshot(get("/pieces")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let pieces: Vec<Piece> = json_body(response).await;
    assert_eq!(pieces.len(), 4);
    assert!(pieces.iter().all(|p| p.owner_id.as_str() == DEMO_OWNER_ID));

    let response = app
        .oneshot(get("/pieces?owner_id=anotherMockUserId456"))
        .await
        .expect("response");
    let pieces: Vec<Piece> = json_body(response).await;
    let ids: Vec<_> = pieces.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, ["p3", "p6"]);
}

#[tokio::test]
async fn unscoped_listing_without_session_is_empty() {
    let (app, _catalog) = test_app(None);
    let response = app.oneshot(get("/pieces")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let pieces: Vec<Piece> = json_body(response).await;
    assert!(pieces.is_empty());
}

#[tokio::test]
async fn foreign_and_unknown_pieces_are_both_not_found() {
    let (app, _catalog) = test_app(admin());

    let own = app.clone().oneshot(get("/pieces/p1")).await.expect("response");
    assert_eq!(own.status(), StatusCode::OK);
    let piece: Piece = json_body(own).await;
    assert_eq!(piece.name, "Terracotta Sunrise Vase");

    for uri in ["/pieces/p3", "/pieces/nope"] {
        let response = app.clone().oneshot(get(uri)).await.expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let err: ApiError = json_body(response).await;
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}

#[tokio::test]
async fn json_create_returns_created_piece() {
    let (app, catalog) = test_app(None);
    let before = catalog.store.len().await.expect("len");
    let request = Request::post("/pieces?owner_id=u1")
        .header("content-type", "application/json")
        .body(Body::from(
            serde_json::json!({
                "name": "Mug",
                "description": "A nice little mug",
                "materials": "Clay",
                "category_id": "cat3",
                "image_urls": []
            })
            .to_string(),
        ))
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);
    let piece: Piece = json_body(response).await;
    assert_eq!(piece.owner_id.as_str(), "u1");
    assert_eq!(piece.category.name, "Mugs");
    assert!(piece.image_urls.is_empty());
    assert_eq!(catalog.store.len().await.expect("len"), before + 1);
}

#[tokio::test]
async fn json_create_errors_map_to_status_codes() {
    let (app, catalog) = test_app(None);
    let before = catalog.store.len().await.expect("len");
    let payload = |category: &str| {
        serde_json::json!({
            "name": "Mug",
            "description": "A nice little mug",
            "materials": "Clay",
            "category_id": category,
        })
        .to_string()
    };

    let anonymous = Request::post("/pieces")
        .header("content-type", "application/json")
        .body(Body::from(payload("cat3")))
        .expect("request");
    let response = app.clone().oneshot(anonymous).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let err: ApiError = json_body(response).await;
    assert_eq!(err.code, ErrorCode::Validation);
    assert!(err.field_errors.contains("owner"));

    let dangling = Request::post("/pieces?owner_id=u1")
        .header("content-type", "application/json")
        .body(Body::from(payload("cat99")))
        .expect("request");
    let response = app.clone().oneshot(dangling).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let err: ApiError = json_body(response).await;
    assert_eq!(err.code, ErrorCode::Reference);

    catalog.transport.set_offline(true);
    let offline = Request::post("/pieces?owner_id=u1")
        .header("content-type", "application/json")
        .body(Body::from(payload("cat3")))
        .expect("request");
    let response = app.oneshot(offline).await.expect("response");
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    catalog.transport.set_offline(false);
    assert_eq!(catalog.store.len().await.expect("len"), before);
}

#[tokio::test]
async fn multipart_upload_stages_images_and_reports_rejections() {
    let (app, _catalog) = test_app(admin());
    let mut parts = mug_fields();
    parts.push(Part::Text("height", "9.5"));
    parts.push(Part::File("front.png", "image/png", b"PNG1"));
    parts.push(Part::File("notes.txt", "text/plain", b"not an image"));
    parts.push(Part::File("back.png", "image/png", b"PNG2"));

    let response = app
        .oneshot(multipart_request("/pieces/upload", &parts))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);
    let uploaded: UploadPieceResponse = json_body(response).await;

    assert_eq!(uploaded.piece.owner_id.as_str(), DEMO_OWNER_ID);
    assert_eq!(uploaded.piece.height, Some(9.5));
    assert_eq!(
        uploaded.piece.image_urls,
        [
            "data:image/png;base64,UE5HMQ==",
            "data:image/png;base64,UE5HMg=="
        ]
    );
    let titles: Vec<_> = uploaded.notices.iter().map(|n| n.title.as_str()).collect();
    assert_eq!(titles, ["Invalid File Type", "Success!"]);
}

#[tokio::test]
async fn multipart_upload_reports_field_errors() {
    let (app, catalog) = test_app(admin());
    let before = catalog.store.len().await.expect("len");
    let parts = vec![
        Part::Text("name", "Mu"),
        Part::Text("description", "short"),
        Part::Text("materials", "Clay"),
        Part::Text("category_id", "cat3"),
        Part::Text("width", "-2"),
    ];

    let response = app
        .oneshot(multipart_request("/pieces/upload", &parts))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let err: ApiError = json_body(response).await;
    assert_eq!(err.code, ErrorCode::Validation);
    assert!(err.field_errors.contains("name"));
    assert!(err.field_errors.contains("description"));
    assert_eq!(
        err.field_errors.get("width"),
        Some("Width must be a positive number.")
    );
    assert_eq!(catalog.store.len().await.expect("len"), before);
}

#[tokio::test]
async fn multipart_upload_needs_an_owner_without_bypass() {
    let (app, _catalog) = test_app(None);
    let response = app
        .oneshot(multipart_request("/pieces/upload", &mug_fields()))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let err: ApiError = json_body(response).await;
    assert_eq!(
        err.field_errors.get("owner"),
        Some("You must be logged in to add a piece.")
    );
}

#[tokio::test]
async fn rejected_upload_still_reports_staging_notices() {
    let (app, _catalog) = test_app(admin());
    let parts = vec![
        Part::Text("name", "Mu"),
        Part::Text("description", "A nice little mug"),
        Part::Text("materials", "Clay"),
        Part::Text("category_id", "cat3"),
        Part::File("notes.txt", "text/plain", b"not an image"),
    ];

    let response = app
        .oneshot(multipart_request("/pieces/upload", &parts))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let err: ApiError = json_body(response).await;
    assert!(err.field_errors.contains("name"));
    let titles: Vec<_> = err.notices.iter().map(|n| n.title.as_str()).collect();
    assert_eq!(titles, ["Invalid File Type"]);
}

#[tokio::test]
async fn failed_upload_carries_staging_and_failure_notices() {
    let (app, catalog) = test_app(admin());
    catalog.transport.set_offline(true);
    let mut parts = mug_fields();
    parts.push(Part::File("notes.txt", "text/plain", b"not an image"));

    let response = app
        .oneshot(multipart_request("/pieces/upload", &parts))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let err: ApiError = json_body(response).await;
    assert_eq!(err.code, ErrorCode::Transport);
    let titles: Vec<_> = err.notices.iter().map(|n| n.title.as_str()).collect();
    assert_eq!(titles, ["Invalid File Type", "Submission Failed"]);
}
