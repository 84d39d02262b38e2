use std::{
    str::FromStr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{
    domain::{Category, OwnerId, Piece, PieceId},
    error::{CatalogError, FieldErrors},
    protocol::NewPieceSubmission,
    rules::{self, FIELD_OWNER},
};
use storage::{DuplicatePieceId, PieceRepository};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

/// Artificial latency applied before each Access Layer call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyProfile {
    pub list: Duration,
    pub get: Duration,
    pub categories: Duration,
    pub create: Duration,
}

impl Default for LatencyProfile {
    fn default() -> Self {
        Self {
            list: Duration::from_millis(500),
            get: Duration::from_millis(300),
            categories: Duration::from_millis(200),
            create: Duration::from_millis(500),
        }
    }
}

impl LatencyProfile {
    pub fn none() -> Self {
        Self::uniform(Duration::ZERO)
    }

    pub fn uniform(delay: Duration) -> Self {
        Self {
            list: delay,
            get: delay,
            categories: delay,
            create: delay,
        }
    }
}

/// What `list_pieces` returns when called without an owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnscopedListing {
    #[default]
    Empty,
    All,
}

#[derive(Debug, Error)]
#[error("unknown unscoped listing policy '{0}', expected 'empty' or 'all'")]
pub struct ParseUnscopedListingError(String);

impl FromStr for UnscopedListing {
    type Err = ParseUnscopedListingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "empty" => Ok(UnscopedListing::Empty),
            "all" => Ok(UnscopedListing::All),
            other => Err(ParseUnscopedListingError(other.to_string())),
        }
    }
}

/// Stand-in for the network hop: a delay, plus an offline switch that makes
/// every call fail with a transport error.
#[derive(Debug, Clone)]
pub struct SimulatedTransport {
    latency: LatencyProfile,
    offline: Arc<AtomicBool>,
}

impl SimulatedTransport {
    pub fn new(latency: LatencyProfile) -> Self {
        Self {
            latency,
            offline: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn latency(&self) -> LatencyProfile {
        self.latency
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }

    async fn round_trip(&self, delay: Duration, operation: &'static str) -> Result<(), CatalogError> {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.is_offline() {
            warn!(operation, "simulated transport is offline");
            return Err(CatalogError::Transport(format!(
                "{operation} failed: catalog service unavailable"
            )));
        }
        Ok(())
    }
}

/// Hands out creation timestamps that never go backwards, even if the wall
/// clock does.
#[derive(Debug, Clone, Default)]
struct CreationClock {
    last: Arc<Mutex<Option<DateTime<Utc>>>>,
}

impl CreationClock {
    fn stamp(&self) -> DateTime<Utc> {
        let mut last = self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let now = Utc::now();
        let stamp = match *last {
            Some(previous) if previous > now => previous,
            _ => now,
        };
        *last = Some(stamp);
        stamp
    }
}

#[derive(Clone)]
pub struct CatalogContext {
    pub store: Arc<dyn PieceRepository>,
    pub transport: SimulatedTransport,
    pub unscoped_listing: UnscopedListing,
    clock: CreationClock,
}

impl CatalogContext {
    pub fn new(store: Arc<dyn PieceRepository>) -> Self {
        Self {
            store,
            transport: SimulatedTransport::new(LatencyProfile::default()),
            unscoped_listing: UnscopedListing::default(),
            clock: CreationClock::default(),
        }
    }

    pub fn with_latency(mut self, latency: LatencyProfile) -> Self {
        self.transport = SimulatedTransport::new(latency);
        self
    }

    pub fn with_unscoped_listing(mut self, policy: UnscopedListing) -> Self {
        self.unscoped_listing = policy;
        self
    }
}

/// Appends racing on the same fresh id retry this many times in total.
const MAX_ID_ATTEMPTS: usize = 5;

/// `p<unix millis>-<8 random hex>`; the suffix keeps rapid successive calls
/// apart.
pub fn generate_piece_id() -> PieceId {
    let suffix = Uuid::new_v4().simple().to_string();
    PieceId(format!(
        "p{}-{}",
        Utc::now().timestamp_millis(),
        &suffix[..8]
    ))
}

fn present(owner_id: Option<&OwnerId>) -> Option<&OwnerId> {
    owner_id.filter(|owner| !owner.is_blank())
}

pub async fn list_pieces(
    ctx: &CatalogContext,
    owner_id: Option<&OwnerId>,
) -> Result<Vec<Piece>, CatalogError> {
    ctx.transport
        .round_trip(ctx.transport.latency.list, "list_pieces")
        .await?;

    match present(owner_id) {
        Some(owner_id) => {
            let pieces = ctx.store.list_by_owner(owner_id).await.map_err(internal)?;
            info!(%owner_id, count = pieces.len(), "listed pieces");
            Ok(pieces)
        }
        None => match ctx.unscoped_listing {
            UnscopedListing::Empty => {
                warn!("list_pieces called without an owner; returning nothing");
                Ok(Vec::new())
            }
            UnscopedListing::All => {
                warn!("list_pieces called without an owner; returning the whole catalog");
                ctx.store.list().await.map_err(internal)
            }
        },
    }
}

/// Absent both when the id is unknown and when the piece belongs to someone
/// else.
pub async fn get_piece(
    ctx: &CatalogContext,
    id: &PieceId,
    owner_id: Option<&OwnerId>,
) -> Result<Option<Piece>, CatalogError> {
    ctx.transport
        .round_trip(ctx.transport.latency.get, "get_piece")
        .await?;

    let Some(piece) = ctx.store.get_by_id(id).await.map_err(internal)? else {
        return Ok(None);
    };

    match present(owner_id) {
        Some(owner_id) if !piece.is_owned_by(owner_id) => {
            warn!(
                %owner_id,
                piece_id = %id,
                actual_owner = %piece.owner_id,
                "ownership mismatch; reporting piece as absent"
            );
            Ok(None)
        }
        Some(_) => Ok(Some(piece)),
        None => {
            warn!(piece_id = %id, "get_piece called without an owner check");
            Ok(Some(piece))
        }
    }
}

pub async fn require_piece(
    ctx: &CatalogContext,
    id: &PieceId,
    owner_id: Option<&OwnerId>,
) -> Result<Piece, CatalogError> {
    get_piece(ctx, id, owner_id)
        .await?
        .ok_or(CatalogError::NotFoundOrForbidden)
}

pub async fn list_categories(ctx: &CatalogContext) -> Result<Vec<Category>, CatalogError> {
    ctx.transport
        .round_trip(ctx.transport.latency.categories, "list_categories")
        .await?;
    ctx.store.categories().await.map_err(internal)
}

pub async fn create_piece(
    ctx: &CatalogContext,
    submission: NewPieceSubmission,
    owner_id: Option<&OwnerId>,
) -> Result<Piece, CatalogError> {
    ctx.transport
        .round_trip(ctx.transport.latency.create, "create_piece")
        .await?;

    let Some(owner_id) = present(owner_id) else {
        return Err(CatalogError::Validation(FieldErrors::single(
            FIELD_OWNER,
            "You must be logged in to add a piece.",
        )));
    };
    rules::check_submission(&submission)?;

    let category = ctx
        .store
        .category_by_id(&submission.category_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| CatalogError::Reference {
            category_id: submission.category_id.clone(),
        })?;

    let mut id = generate_piece_id();
    while ctx.store.contains(&id).await.map_err(internal)? {
        id = generate_piece_id();
    }

    let mut piece = Piece {
        id,
        owner_id: owner_id.clone(),
        name: submission.name,
        description: submission.description,
        materials: submission.materials,
        category,
        image_urls: submission.image_urls,
        height: submission.height,
        width: submission.width,
        depth: submission.depth,
        creation_date: ctx.clock.stamp(),
    };
    let mut attempts = 1;
    loop {
        match ctx.store.append(piece.clone()).await {
            Ok(()) => break,
            Err(err)
                if attempts < MAX_ID_ATTEMPTS
                    && err.downcast_ref::<DuplicatePieceId>().is_some() =>
            {
                warn!(piece_id = %piece.id, attempts, "piece id taken at append; drawing another");
                piece.id = generate_piece_id();
                attempts += 1;
            }
            Err(err) => return Err(internal(err)),
        }
    }
    info!(
        piece_id = %piece.id,
        %owner_id,
        category = %piece.category.name,
        images = piece.image_urls.len(),
        "piece created"
    );
    Ok(piece)
}

fn internal(err: anyhow::Error) -> CatalogError {
    CatalogError::Transport(format!("store failure: {err}"))
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
