//! Client-side piece submission: form validation, image staging and the
//! submit state machine.

mod backend;
pub mod form;
pub mod staging;
pub mod workflow;

pub use backend::CatalogBackend;
pub use form::PieceForm;
pub use staging::{ImageFile, ImageStager, StagedImage, StagingRejection, StagingReport};
pub use workflow::{Navigation, SubmissionWorkflow, SubmitOutcome, WorkflowState};
