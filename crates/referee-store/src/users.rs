//! Local identity directory: accounts and journal-scoped roles.
//!
//! This directory is a development stand-in for the platform's identity
//! service.  It only records the accounts the review workflow provisions;
//! nothing here authenticates a login.
//!
//! Emails are stored trimmed and lowercased so lookups are case-insensitive.
//! Passwords are kept only as a hex BLAKE3 digest keyed by the account id.
//! That is a fast hash, not a password KDF, so a deployment that checks
//! these credentials must back the directory with a real identity service.

use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use referee_shared::Role;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{RoleGrant, User};
use crate::rows::{enum_at, now, ts, ts_at, uuid_at};

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Digest of `password` salted with the account id.  Not brute-force
/// resistant; see the module docs.
fn password_digest(user_id: Uuid, password: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(user_id.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize().as_bytes())
}

impl Database {
    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = self
            .conn()
            .query_row(
                "SELECT id, email, created_at FROM users WHERE email = ?1",
                params![normalize_email(email)],
                row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    /// Create an account.  An email already in use is a
    /// [`StoreError::Conflict`].
    pub fn create_user(&self, email: &str, password: &str) -> Result<User> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(StoreError::Invalid("email is empty".into()));
        }

        let user = User {
            id: Uuid::new_v4(),
            email,
            created_at: now(),
        };

        self.conn()
            .execute(
                "INSERT INTO users (id, email, password_hash, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    user.id.to_string(),
                    user.email,
                    password_digest(user.id, password),
                    ts(&user.created_at),
                ],
            )
            .map_err(StoreError::from_query)?;

        tracing::info!(user_id = %user.id, "user provisioned");
        Ok(user)
    }

    /// Grant a role.  Granting a role the user already holds on the journal
    /// is a [`StoreError::Conflict`].
    pub fn assign_role(&self, user_id: Uuid, journal_id: Uuid, role: Role) -> Result<RoleGrant> {
        let grant = RoleGrant {
            user_id,
            journal_id,
            role,
            created_at: now(),
        };

        self.conn()
            .execute(
                "INSERT INTO user_roles (user_id, journal_id, role, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    user_id.to_string(),
                    journal_id.to_string(),
                    role.as_str(),
                    ts(&grant.created_at),
                ],
            )
            .map_err(StoreError::from_query)?;

        Ok(grant)
    }

    pub fn list_roles(&self, user_id: Uuid) -> Result<Vec<RoleGrant>> {
        let mut stmt = self.conn().prepare(
            "SELECT user_id, journal_id, role, created_at
             FROM user_roles
             WHERE user_id = ?1
             ORDER BY created_at ASC, rowid ASC",
        )?;

        let rows = stmt.query_map(params![user_id.to_string()], row_to_grant)?;

        let mut grants = Vec::new();
        for row in rows {
            grants.push(row?);
        }
        Ok(grants)
    }
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: uuid_at(row, 0)?,
        email: row.get(1)?,
        created_at: ts_at(row, 2)?,
    })
}

fn row_to_grant(row: &Row<'_>) -> rusqlite::Result<RoleGrant> {
    Ok(RoleGrant {
        user_id: uuid_at(row, 0)?,
        journal_id: uuid_at(row, 1)?,
        role: enum_at(row, 2)?,
        created_at: ts_at(row, 3)?,
    })
}
