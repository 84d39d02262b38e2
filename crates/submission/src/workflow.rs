use std::sync::Arc;

use shared::{
    domain::{Category, Identity, Piece, PieceId},
    error::{CatalogError, FieldErrors},
    protocol::Notice,
    rules::FIELD_CATEGORY,
};
use tracing::{error, info, warn};

use crate::{
    backend::CatalogBackend,
    form::PieceForm,
    staging::{ImageFile, ImageStager, StagedImage, StagingReport},
};

#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowState {
    Editing,
    Validating,
    Submitting,
    Succeeded { piece_id: PieceId },
    Failed { notice: Notice },
}

/// Where the caller should go next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Listing,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Created {
        piece: Piece,
        notice: Notice,
        navigate_to: Navigation,
    },
    /// Back in `Editing` with field errors attached.
    Invalid(FieldErrors),
    /// Transport failure; the notice must be dismissed before retrying.
    Failed(Notice),
    /// Submit was requested outside of `Editing`.
    Ignored,
}

pub struct SubmissionWorkflow {
    backend: Arc<dyn CatalogBackend>,
    identity: Option<Identity>,
    form: PieceForm,
    stager: ImageStager,
    categories: Vec<Category>,
    field_errors: FieldErrors,
    state: WorkflowState,
}

impl SubmissionWorkflow {
    pub fn new(backend: Arc<dyn CatalogBackend>, identity: Option<Identity>) -> Self {
        Self {
            backend,
            identity,
            form: PieceForm::default(),
            stager: ImageStager::new(),
            categories: Vec::new(),
            field_errors: FieldErrors::new(),
            state: WorkflowState::Editing,
        }
    }

    pub fn with_stager(mut self, stager: ImageStager) -> Self {
        self.stager = stager;
        self
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn is_editing(&self) -> bool {
        self.state == WorkflowState::Editing
    }

    pub fn form(&self) -> &PieceForm {
        &self.form
    }

    pub fn field_errors(&self) -> &FieldErrors {
        &self.field_errors
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn staged_images(&self) -> &[StagedImage] {
        self.stager.staged()
    }

    /// Mutates the form. Returns false outside of `Editing`.
    pub fn edit(&mut self, change: impl FnOnce(&mut PieceForm)) -> bool {
        if !self.is_editing() {
            return false;
        }
        change(&mut self.form);
        true
    }

    /// Fetches the category choices. A failure leaves the list empty and
    /// returns a notice instead of an error.
    pub async fn load_categories(&mut self) -> Option<Notice> {
        match self.backend.list_categories().await {
            Ok(categories) => {
                self.categories = categories;
                None
            }
            Err(err) => {
                error!(%err, "failed to fetch categories");
                self.categories.clear();
                Some(Notice::destructive(
                    "Error",
                    "Could not load categories. Please try again later.",
                ))
            }
        }
    }

    pub async fn select_files(&mut self, files: Vec<ImageFile>) -> Option<StagingReport> {
        if !self.is_editing() {
            return None;
        }
        Some(self.stager.stage(files).await)
    }

    pub fn remove_image(&mut self, index: usize) -> Option<StagedImage> {
        if !self.is_editing() {
            return None;
        }
        self.stager.remove(index)
    }

    /// Leaves `Failed` for `Editing`. No-op in every other state.
    pub fn dismiss_notice(&mut self) {
        if matches!(self.state, WorkflowState::Failed { .. }) {
            self.state = WorkflowState::Editing;
        }
    }

    pub async fn submit(&mut self) -> SubmitOutcome {
        if !self.is_editing() {
            warn!(state = ?self.state, "submit ignored outside of editing");
            return SubmitOutcome::Ignored;
        }

        self.state = WorkflowState::Validating;
        let submission = match self.form.validate(&self.stager.image_urls()) {
            Ok(submission) => submission,
            Err(errors) => return self.back_to_editing(errors),
        };
        self.field_errors = FieldErrors::new();

        self.state = WorkflowState::Submitting;
        let owner_id = self.identity.as_ref().map(|identity| &identity.owner_id);
        let result = self.backend.create_piece(submission, owner_id).await;
        match result {
            Ok(piece) => {
                info!(piece_id = %piece.id, "piece submitted");
                self.state = WorkflowState::Succeeded {
                    piece_id: piece.id.clone(),
                };
                let notice = Notice::info(
                    "Success!",
                    format!("\"{}\" has been added to your collection.", piece.name),
                );
                SubmitOutcome::Created {
                    piece,
                    notice,
                    navigate_to: Navigation::Listing,
                }
            }
            Err(CatalogError::Validation(errors)) => self.back_to_editing(errors),
            Err(CatalogError::Reference { category_id }) => {
                warn!(%category_id, "submitted category no longer resolves");
                self.back_to_editing(FieldErrors::single(
                    FIELD_CATEGORY,
                    "Selected category does not exist.",
                ))
            }
            Err(err) => {
                error!(%err, "failed to add pottery piece");
                let notice = Notice::destructive(
                    "Submission Failed",
                    "Could not add your pottery piece. Please try again.",
                );
                self.state = WorkflowState::Failed {
                    notice: notice.clone(),
                };
                SubmitOutcome::Failed(notice)
            }
        }
    }

    fn back_to_editing(&mut self, errors: FieldErrors) -> SubmitOutcome {
        self.state = WorkflowState::Editing;
        self.field_errors = errors.clone();
        SubmitOutcome::Invalid(errors)
    }
}

#[cfg(test)]
#[path = "tests/workflow_tests.rs"]
mod tests;
