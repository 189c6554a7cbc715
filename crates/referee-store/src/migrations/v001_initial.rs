//! v001 -- Initial schema creation.
//!
//! Creates the submission workflow tables: `drafts`, `draft_files`,
//! `co_authors`, `editor_checks`, `file_comments` and `reviews`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Drafts (one row per manuscript revision)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS drafts (
    id                           TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    group_id                     TEXT NOT NULL,              -- manuscript family
    journal_id                   TEXT,
    author_id                    TEXT NOT NULL,
    type                         TEXT NOT NULL DEFAULT '',
    title                        TEXT NOT NULL,
    description                  TEXT NOT NULL DEFAULT '',
    manuscript                   TEXT NOT NULL DEFAULT '',
    cover_letter                 TEXT NOT NULL DEFAULT '',
    supplemental                 TEXT NOT NULL DEFAULT '',
    status                       TEXT NOT NULL,              -- DraftStatus
    step                         TEXT,                       -- Step, NULL = unowned
    editor_status                TEXT,
    reviewer_status              TEXT,
    editor_id                    TEXT,
    editor_comment               TEXT,
    editor_manuscript_comment    TEXT,
    editor_cover_letter_comment  TEXT,
    editor_supplemental_comment  TEXT,
    created_at                   TEXT NOT NULL,              -- RFC-3339, fixed width
    updated_at                   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_drafts_group_created
    ON drafts(group_id, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_drafts_journal ON drafts(journal_id);
CREATE INDEX IF NOT EXISTS idx_drafts_author ON drafts(author_id);

-- ----------------------------------------------------------------
-- Files attached to a draft
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS draft_files (
    id         TEXT PRIMARY KEY NOT NULL,
    draft_id   TEXT NOT NULL,
    url        TEXT NOT NULL,
    type       TEXT NOT NULL,                                -- FileKind
    created_at TEXT NOT NULL,

    FOREIGN KEY (draft_id) REFERENCES drafts(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_draft_files_draft ON draft_files(draft_id);

-- ----------------------------------------------------------------
-- Co-authors
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS co_authors (
    id         TEXT PRIMARY KEY NOT NULL,
    draft_id   TEXT NOT NULL,
    user_id    TEXT NOT NULL,
    created_at TEXT NOT NULL,

    FOREIGN KEY (draft_id) REFERENCES drafts(id) ON DELETE CASCADE
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_co_authors_unique ON co_authors(draft_id, user_id);

-- ----------------------------------------------------------------
-- Editor checks and their per-file comments
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS editor_checks (
    id         TEXT PRIMARY KEY NOT NULL,
    checker_id TEXT NOT NULL,
    draft_id   TEXT NOT NULL,
    type       TEXT NOT NULL,                                -- CheckType
    status     TEXT NOT NULL,                                -- CheckStatus
    comment    TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,

    FOREIGN KEY (draft_id) REFERENCES drafts(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_editor_checks_draft ON editor_checks(draft_id);
CREATE INDEX IF NOT EXISTS idx_editor_checks_checker ON editor_checks(checker_id);

CREATE TABLE IF NOT EXISTS file_comments (
    id         TEXT PRIMARY KEY NOT NULL,
    check_id   TEXT NOT NULL,
    type       TEXT NOT NULL,                                -- FileKind
    file_id    TEXT,
    comment    TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,

    FOREIGN KEY (check_id) REFERENCES editor_checks(id) ON DELETE CASCADE,
    FOREIGN KEY (file_id) REFERENCES draft_files(id) ON DELETE SET NULL
);

CREATE INDEX IF NOT EXISTS idx_file_comments_check ON file_comments(check_id);

-- ----------------------------------------------------------------
-- Reviewer assignments
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS reviews (
    id          TEXT PRIMARY KEY NOT NULL,
    reviewer_id TEXT NOT NULL,
    draft_id    TEXT NOT NULL,
    status      TEXT NOT NULL,                               -- ReviewStatus
    comment     TEXT,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL,

    FOREIGN KEY (draft_id) REFERENCES drafts(id) ON DELETE CASCADE
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_reviews_unique ON reviews(reviewer_id, draft_id);
CREATE INDEX IF NOT EXISTS idx_reviews_draft ON reviews(draft_id);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
