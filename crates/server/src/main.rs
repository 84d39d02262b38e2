use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use catalog_api::{create_piece, list_categories, list_pieces, require_piece, CatalogContext};
use serde::Deserialize;
use shared::{
    domain::{Category, Identity, OwnerId, Piece, PieceId},
    error::{ApiError, CatalogError, ErrorCode},
    protocol::{NewPieceSubmission, UploadPieceResponse},
    rules::{
        FIELD_CATEGORY, FIELD_DEPTH, FIELD_DESCRIPTION, FIELD_HEIGHT, FIELD_IMAGES,
        FIELD_MATERIALS, FIELD_NAME, FIELD_WIDTH, MAX_FILE_SIZE_BYTES, MAX_IMAGES,
    },
};
use storage::MemoryStore;
use submission::{ImageFile, PieceForm, SubmissionWorkflow, SubmitOutcome};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{debug, error, info};

mod app_state;
mod config;

use app_state::AppState;
use config::load_settings;

/// Room for a full set of images plus a couple of oversized ones that staging
/// will turn away with a notice.
const MAX_UPLOAD_BYTES: usize = (MAX_IMAGES + 3) * MAX_FILE_SIZE_BYTES;

type HttpError = (StatusCode, Json<ApiError>);

#[derive(Debug, Default, Deserialize)]
struct OwnerQuery {
    owner_id: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settings = load_settings();
    let store = if settings.seed_demo_data {
        MemoryStore::seeded()
    } else {
        MemoryStore::empty()
    };
    let catalog = CatalogContext::new(Arc::new(store))
        .with_latency(settings.latency)
        .with_unscoped_listing(settings.unscoped_listing);

    let session = settings.session_identity();
    match &session {
        Some(identity) => info!(
            owner_id = %identity.owner_id,
            label = %identity.display_label,
            "auth bypass enabled"
        ),
        None => info!("auth bypass disabled; requests must name an owner"),
    }

    let state = AppState { catalog, session };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/session", get(session))
        .route("/categories", get(http_list_categories))
        .route("/pieces", get(http_list_pieces).post(http_create_piece))
        .route("/pieces/upload", post(upload_piece))
        .route("/pieces/:piece_id", get(http_get_piece))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_UPLOAD_BYTES))
        .with_state(state)
}

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::Validation | ErrorCode::Reference => StatusCode::BAD_REQUEST,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Transport => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn catalog_error(err: CatalogError) -> HttpError {
    let body = ApiError::from(err);
    (status_for(body.code), Json(body))
}

fn bad_multipart(err: MultipartError) -> HttpError {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiError::new(
            ErrorCode::Validation,
            format!("malformed multipart body: {err}"),
        )),
    )
}

/// An explicit `owner_id` wins; otherwise the bypass session, if any.
fn resolve_identity(state: &AppState, q: &OwnerQuery) -> Option<Identity> {
    match q.owner_id.as_deref().map(str::trim) {
        Some(owner_id) if !owner_id.is_empty() => Some(Identity::new(owner_id, owner_id)),
        _ => state.session.clone(),
    }
}

fn resolve_owner(state: &AppState, q: &OwnerQuery) -> Option<OwnerId> {
    resolve_identity(state, q).map(|identity| identity.owner_id)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn session(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.session.clone() {
        Some(identity) => Json(identity).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn http_list_categories(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Category>>, HttpError> {
    let categories = list_categories(&state.catalog)
        .await
        .map_err(catalog_error)?;
    Ok(Json(categories))
}

async fn http_list_pieces(
    State(state): State<Arc<AppState>>,
    Query(q): Query<OwnerQuery>,
) -> Result<Json<Vec<Piece>>, HttpError> {
    let owner_id = resolve_owner(&state, &q);
    let pieces = list_pieces(&state.catalog, owner_id.as_ref())
        .await
        .map_err(catalog_error)?;
    Ok(Json(pieces))
}

async fn http_get_piece(
    State(state): State<Arc<AppState>>,
    Path(piece_id): Path<String>,
    Query(q): Query<OwnerQuery>,
) -> Result<Json<Piece>, HttpError> {
    let owner_id = resolve_owner(&state, &q);
    let piece = require_piece(&state.catalog, &PieceId(piece_id), owner_id.as_ref())
        .await
        .map_err(catalog_error)?;
    Ok(Json(piece))
}

async fn http_create_piece(
    State(state): State<Arc<AppState>>,
    Query(q): Query<OwnerQuery>,
    Json(submission): Json<NewPieceSubmission>,
) -> Result<(StatusCode, Json<Piece>), HttpError> {
    let owner_id = resolve_owner(&state, &q);
    let piece = create_piece(&state.catalog, submission, owner_id.as_ref())
        .await
        .map_err(catalog_error)?;
    Ok((StatusCode::CREATED, Json(piece)))
}

/// Runs a browser-style "new piece" form through the submission workflow:
/// text fields fill the form, every `images` part is staged.
async fn upload_piece(
    State(state): State<Arc<AppState>>,
    Query(q): Query<OwnerQuery>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadPieceResponse>), HttpError> {
    let mut form = PieceForm::default();
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().unwrap_or("").to_string();
        if name == FIELD_IMAGES {
            let file_name = field.file_name().unwrap_or("image").to_string();
            let declared_type = field.content_type().unwrap_or("").to_string();
            let bytes = field.bytes().await.map_err(bad_multipart)?;
            files.push(ImageFile::new(file_name, declared_type, bytes.to_vec()));
            continue;
        }

        let slot = match name.as_str() {
            FIELD_NAME => &mut form.name,
            FIELD_DESCRIPTION => &mut form.description,
            FIELD_MATERIALS => &mut form.materials,
            FIELD_CATEGORY => &mut form.category_id,
            FIELD_HEIGHT => &mut form.height,
            FIELD_WIDTH => &mut form.width,
            FIELD_DEPTH => &mut form.depth,
            other => {
                debug!(field = other, "ignoring unknown multipart field");
                continue;
            }
        };
        *slot = field.text().await.map_err(bad_multipart)?;
    }

    let identity = resolve_identity(&state, &q);
    let mut workflow = SubmissionWorkflow::new(Arc::new(state.catalog.clone()), identity);
    workflow.edit(|current| *current = form);
    let mut notices = workflow
        .select_files(files)
        .await
        .map(|report| report.notices)
        .unwrap_or_default();

    match workflow.submit().await {
        SubmitOutcome::Created { piece, notice, .. } => {
            notices.push(notice);
            Ok((
                StatusCode::CREATED,
                Json(UploadPieceResponse { piece, notices }),
            ))
        }
        SubmitOutcome::Invalid(errors) => {
            let (status, Json(body)) = catalog_error(CatalogError::Validation(errors));
            Err((status, Json(body.with_notices(notices))))
        }
        SubmitOutcome::Failed(notice) => {
            let message = notice.description.clone();
            notices.push(notice);
            Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiError::new(ErrorCode::Transport, message).with_notices(notices)),
            ))
        }
        SubmitOutcome::Ignored => {
            error!("fresh submission workflow refused to submit");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(
                    ApiError::new(ErrorCode::Internal, "submission was not attempted")
                        .with_notices(notices),
                ),
            ))
        }
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
