//! # referee-shared
//!
//! Domain vocabulary shared by the store and the server: the closed status
//! enums of the review workflow, the editor-decision state machine and a few
//! protocol constants.

pub mod constants;
pub mod error;
pub mod transition;
pub mod types;

pub use error::ParseEnumError;
pub use transition::DraftTransition;
pub use types::*;
