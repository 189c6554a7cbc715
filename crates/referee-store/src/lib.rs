//! # referee-store
//!
//! SQLite persistence for the manuscript review workflow.
//!
//! The crate exposes a synchronous `Database` handle that wraps a
//! `rusqlite::Connection` and provides typed CRUD helpers for drafts, editor
//! checks, reviews, attachments and the local identity directory.  List
//! queries are built from named placeholders through [`query::compose`].

pub mod checks;
pub mod coauthors;
pub mod database;
pub mod drafts;
pub mod files;
pub mod migrations;
pub mod models;
pub mod query;
pub mod reviews;
pub mod users;

mod error;
mod rows;

pub use checks::{DecisionOutcome, EditorDecision};
pub use database::Database;
pub use error::StoreError;
pub use models::*;
pub use query::{compose, Composed, NamedArgs, Page};
