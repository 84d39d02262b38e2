use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use shared::domain::{Category, CategoryId, OwnerId, Piece, PieceId};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

pub mod seed;

/// Returned (inside `anyhow::Error`) by `append` when the id is taken, so
/// callers can draw a fresh id and try again.
#[derive(Debug, Error)]
#[error("piece id {0} already exists")]
pub struct DuplicatePieceId(pub PieceId);

/// Create/read capability set over the piece store. There is no update or
/// delete path.
#[async_trait]
pub trait PieceRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Piece>>;
    async fn list_by_owner(&self, owner_id: &OwnerId) -> Result<Vec<Piece>>;
    async fn get_by_id(&self, id: &PieceId) -> Result<Option<Piece>>;
    async fn contains(&self, id: &PieceId) -> Result<bool>;
    /// Appends a piece. Fails on a duplicate id or an unknown category.
    async fn append(&self, piece: Piece) -> Result<()>;
    async fn len(&self) -> Result<usize>;
    async fn categories(&self) -> Result<Vec<Category>>;
    async fn category_by_id(&self, id: &CategoryId) -> Result<Option<Category>>;
}

#[derive(Debug, Default)]
struct StoreState {
    pieces: Vec<Piece>,
    categories: Vec<Category>,
}

impl StoreState {
    fn check_insertable(&self, piece: &Piece) -> Result<()> {
        if self.pieces.iter().any(|p| p.id == piece.id) {
            return Err(DuplicatePieceId(piece.id.clone()).into());
        }
        if !self.categories.contains(&piece.category) {
            bail!("piece {} references unknown category {}", piece.id, piece.category.id);
        }
        Ok(())
    }
}

/// In-memory store owned by whoever constructs it. Clones share the same
/// underlying lists.
#[derive(Clone, Debug)]
pub struct MemoryStore {
    state: Arc<RwLock<StoreState>>,
}

impl MemoryStore {
    pub fn new(categories: Vec<Category>) -> Self {
        Self {
            state: Arc::new(RwLock::new(StoreState {
                pieces: Vec::new(),
                categories,
            })),
        }
    }

    /// Default categories, no pieces.
    pub fn empty() -> Self {
        Self::new(seed::default_categories())
    }

    /// Default categories plus the demo pieces.
    pub fn seeded() -> Self {
        let categories = seed::default_categories();
        let pieces = seed::demo_pieces(&categories);
        Self {
            state: Arc::new(RwLock::new(StoreState { pieces, categories })),
        }
    }

    pub async fn with_pieces(categories: Vec<Category>, pieces: Vec<Piece>) -> Result<Self> {
        let store = Self::new(categories);
        for piece in pieces {
            store.append(piece).await?;
        }
        Ok(store)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::empty()
    }
}

#[async_trait]
impl PieceRepository for MemoryStore {
    async fn list(&self) -> Result<Vec<Piece>> {
        Ok(self.state.read().await.pieces.clone())
    }

    async fn list_by_owner(&self, owner_id: &OwnerId) -> Result<Vec<Piece>> {
        let state = self.state.read().await;
        Ok(state
            .pieces
            .iter()
            .filter(|p| p.is_owned_by(owner_id))
            .cloned()
            .collect())
    }

    async fn get_by_id(&self, id: &PieceId) -> Result<Option<Piece>> {
        let state = self.state.read().await;
        Ok(state.pieces.iter().find(|p| &p.id == id).cloned())
    }

    async fn contains(&self, id: &PieceId) -> Result<bool> {
        Ok(self.state.read().await.pieces.iter().any(|p| &p.id == id))
    }

    async fn append(&self, piece: Piece) -> Result<()> {
        let mut state = self.state.write().await;
        state.check_insertable(&piece)?;
        debug!(piece_id = %piece.id, owner_id = %piece.owner_id, "appending piece");
        state.pieces.push(piece);
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.state.read().await.pieces.len())
    }

    async fn categories(&self) -> Result<Vec<Category>> {
        Ok(self.state.read().await.categories.clone())
    }

    async fn category_by_id(&self, id: &CategoryId) -> Result<Option<Category>> {
        let state = self.state.read().await;
        Ok(state.categories.iter().find(|c| &c.id == id).cloned())
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
