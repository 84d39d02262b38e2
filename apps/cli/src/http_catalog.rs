use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use shared::{
    domain::{Category, Identity, OwnerId, Piece, PieceId},
    error::{ApiError, CatalogError},
    protocol::NewPieceSubmission,
};
use submission::CatalogBackend;
use tracing::debug;

/// Access Layer client speaking to the catalog server over HTTP.
#[derive(Clone)]
pub struct HttpCatalog {
    http: Client,
    server_url: String,
}

impl HttpCatalog {
    pub fn new(server_url: impl Into<String>) -> Self {
        let server_url: String = server_url.into();
        Self {
            http: Client::new(),
            server_url: server_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.server_url)
    }

    /// `/pieces/<id>` with the id percent-encoded as a single segment.
    fn piece_url(&self, id: &PieceId) -> Result<Url, CatalogError> {
        let mut url = Url::parse(&self.server_url)
            .map_err(|err| CatalogError::Transport(format!("invalid server url: {err}")))?;
        url.path_segments_mut()
            .map_err(|()| CatalogError::Transport("server url cannot carry a path".into()))?
            .pop_if_empty()
            .push("pieces")
            .push(id.as_str());
        Ok(url)
    }

    pub async fn session(&self) -> Result<Option<Identity>, CatalogError> {
        let res = send(self.http.get(self.url("/session"))).await?;
        if res.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        decode(res).await.map(Some)
    }

    pub async fn list_pieces(&self, owner_id: Option<&OwnerId>) -> Result<Vec<Piece>, CatalogError> {
        let req = with_owner(self.http.get(self.url("/pieces")), owner_id);
        decode(send(req).await?).await
    }

    /// `None` when the piece is unknown or belongs to someone else.
    pub async fn get_piece(
        &self,
        id: &PieceId,
        owner_id: Option<&OwnerId>,
    ) -> Result<Option<Piece>, CatalogError> {
        let req = with_owner(self.http.get(self.piece_url(id)?), owner_id);
        match decode(send(req).await?).await {
            Ok(piece) => Ok(Some(piece)),
            Err(CatalogError::NotFoundOrForbidden) => Ok(None),
            Err(err) => Err(err),
        }
    }
}

#[async_trait]
impl CatalogBackend for HttpCatalog {
    async fn list_categories(&self) -> Result<Vec<Category>, CatalogError> {
        decode(send(self.http.get(self.url("/categories"))).await?).await
    }

    async fn create_piece(
        &self,
        submission: NewPieceSubmission,
        owner_id: Option<&OwnerId>,
    ) -> Result<Piece, CatalogError> {
        let req = with_owner(self.http.post(self.url("/pieces")), owner_id).json(&submission);
        decode(send(req).await?).await
    }
}

fn with_owner(req: RequestBuilder, owner_id: Option<&OwnerId>) -> RequestBuilder {
    match owner_id {
        Some(owner_id) => req.query(&[("owner_id", owner_id.as_str())]),
        None => req,
    }
}

async fn send(req: RequestBuilder) -> Result<Response, CatalogError> {
    req.send()
        .await
        .map_err(|err| CatalogError::Transport(err.to_string()))
}

async fn decode<T: DeserializeOwned>(res: Response) -> Result<T, CatalogError> {
    let status = res.status();
    let body = res
        .bytes()
        .await
        .map_err(|err| CatalogError::Transport(err.to_string()))?;
    if status.is_success() {
        return serde_json::from_slice(&body)
            .map_err(|err| CatalogError::Transport(format!("unexpected response body: {err}")));
    }
    debug!(%status, "catalog request failed");
    Err(error_from_body(status, &body))
}

fn error_from_body(status: StatusCode, body: &[u8]) -> CatalogError {
    match serde_json::from_slice::<ApiError>(body) {
        Ok(api_error) => api_error.into_catalog_error(),
        Err(_) => CatalogError::Transport(format!("server returned {status}")),
    }
}
