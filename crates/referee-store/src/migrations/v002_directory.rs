//! v002 -- Local identity directory (users and journal-scoped roles).

use rusqlite::Connection;

const UP_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id            TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    email         TEXT NOT NULL,
    password_hash TEXT NOT NULL,               -- hex-encoded BLAKE3 digest
    created_at    TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_users_email ON users(email);

CREATE TABLE IF NOT EXISTS user_roles (
    user_id    TEXT NOT NULL,                  -- FK -> users(id)
    journal_id TEXT NOT NULL,
    role       TEXT NOT NULL,                  -- Role
    created_at TEXT NOT NULL,

    PRIMARY KEY (user_id, journal_id, role),
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);
"#;

pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
