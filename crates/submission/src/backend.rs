use async_trait::async_trait;
use catalog_api::CatalogContext;
use shared::{
    domain::{Category, OwnerId, Piece},
    error::CatalogError,
    protocol::NewPieceSubmission,
};

/// The slice of the Access Layer the submission form talks to.
#[async_trait]
pub trait CatalogBackend: Send + Sync {
    async fn list_categories(&self) -> Result<Vec<Category>, CatalogError>;
    async fn create_piece(
        &self,
        submission: NewPieceSubmission,
        owner_id: Option<&OwnerId>,
    ) -> Result<Piece, CatalogError>;
}

#[async_trait]
impl CatalogBackend for CatalogContext {
    async fn list_categories(&self) -> Result<Vec<Category>, CatalogError> {
        catalog_api::list_categories(self).await
    }

    async fn create_piece(
        &self,
        submission: NewPieceSubmission,
        owner_id: Option<&OwnerId>,
    ) -> Result<Piece, CatalogError> {
        catalog_api::create_piece(self, submission, owner_id).await
    }
}
