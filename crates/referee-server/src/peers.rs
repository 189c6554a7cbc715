//! Seams to the collaborating services the workflow calls into: the user
//! directory (account lookup, provisioning, role grants) and the notifier.
//!
//! The local implementations keep accounts in the submission database and
//! write notifications to the log.

use referee_shared::Role;
use referee_store::{Draft, RoleGrant, StoreError, User};
use thiserror::Error;
use uuid::Uuid;

use crate::service::SharedDb;

#[derive(Debug, Error)]
pub enum PeerError {
    /// The user already holds this role on the journal.
    #[error("Role already granted")]
    DuplicateRole,

    #[error("Peer service unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub trait UserDirectory: Send + Sync {
    fn find_by_email(&self, email: &str) -> Result<Option<User>, PeerError>;

    fn create_user(&self, email: &str, password: &str) -> Result<User, PeerError>;

    /// Fails with [`PeerError::DuplicateRole`] when the grant already exists.
    fn grant_role(&self, user_id: Uuid, journal_id: Uuid, role: Role)
        -> Result<RoleGrant, PeerError>;
}

pub trait Notifier: Send + Sync {
    fn reviewer_assigned(&self, reviewer: &User, draft: &Draft) -> Result<(), PeerError>;
}

// ---------------------------------------------------------------------------
// Local implementations
// ---------------------------------------------------------------------------

/// User directory backed by the `users` / `user_roles` tables.
pub struct LocalDirectory {
    db: SharedDb,
}

impl LocalDirectory {
    pub fn new(db: SharedDb) -> Self {
        Self { db }
    }

    fn with_db<T>(
        &self,
        f: impl FnOnce(&referee_store::Database) -> Result<T, StoreError>,
    ) -> Result<T, PeerError> {
        let db = self
            .db
            .lock()
            .map_err(|_| PeerError::Unavailable("directory database lock poisoned".into()))?;
        Ok(f(&db)?)
    }
}

impl UserDirectory for LocalDirectory {
    fn find_by_email(&self, email: &str) -> Result<Option<User>, PeerError> {
        self.with_db(|db| db.find_user_by_email(email))
    }

    fn create_user(&self, email: &str, password: &str) -> Result<User, PeerError> {
        self.with_db(|db| db.create_user(email, password))
    }

    fn grant_role(
        &self,
        user_id: Uuid,
        journal_id: Uuid,
        role: Role,
    ) -> Result<RoleGrant, PeerError> {
        match self.with_db(|db| db.assign_role(user_id, journal_id, role)) {
            Err(PeerError::Store(StoreError::Conflict(_))) => Err(PeerError::DuplicateRole),
            other => other,
        }
    }
}

/// Records notifications in the log instead of sending mail.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn reviewer_assigned(&self, reviewer: &User, draft: &Draft) -> Result<(), PeerError> {
        tracing::info!(
            to = %reviewer.email,
            draft_id = %draft.id,
            title = %draft.title,
            "review invitation sent"
        );
        Ok(())
    }
}
