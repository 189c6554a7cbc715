//! Named-placeholder query composition.
//!
//! List queries are written against `:name` placeholders and a map of named
//! arguments.  [`compose`] turns that pair into positional SQL (`?1`, `?2`, …)
//! plus a parameter vector whose order matches the placeholders, scanning the
//! template once from left to right.
//!
//! [`Filter`] collects the `WHERE` clauses for a sparse set of optional
//! inputs.  Absent inputs contribute nothing, so an omitted filter never
//! narrows the result set.  The COUNT query and the page query are rendered
//! from the same clauses and composed independently.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rusqlite::types::Value as SqlValue;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use referee_shared::constants::{DEFAULT_LIMIT, DEFAULT_OFFSET, MAX_LIMIT};

use crate::rows::ts;

/// Named query arguments, keyed without the leading `:`.
pub type NamedArgs = BTreeMap<String, SqlValue>;

/// Positional SQL and its parameters, ready for `rusqlite`.
#[derive(Debug, Clone, PartialEq)]
pub struct Composed {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl Composed {
    pub fn params(&self) -> rusqlite::ParamsFromIter<std::slice::Iter<'_, SqlValue>> {
        rusqlite::params_from_iter(self.params.iter())
    }
}

/// Replace every `:name` found in `args` with the next positional placeholder.
///
/// A name used twice yields two placeholders bound to the same value.  Names
/// missing from `args` are left in place untouched; `::` and anything inside
/// a single-quoted literal are never treated as placeholders.
pub fn compose(template: &str, args: &NamedArgs) -> Composed {
    let mut sql = String::with_capacity(template.len() + 8);
    let mut params = Vec::new();
    let mut chars = template.char_indices().peekable();
    let mut in_literal = false;

    while let Some((i, c)) = chars.next() {
        if in_literal {
            // A doubled quote closes and immediately reopens the literal.
            in_literal = c != '\'';
            sql.push(c);
            continue;
        }

        match c {
            '\'' => {
                in_literal = true;
                sql.push(c);
            }
            ':' if matches!(chars.peek(), Some((_, ':'))) => {
                chars.next();
                sql.push_str("::");
            }
            ':' => {
                let start = i + 1;
                let mut end = start;
                while let Some(&(j, n)) = chars.peek() {
                    let ok = if j == start {
                        n.is_ascii_alphabetic() || n == '_'
                    } else {
                        n.is_ascii_alphanumeric() || n == '_'
                    };
                    if !ok {
                        break;
                    }
                    end = j + n.len_utf8();
                    chars.next();
                }

                let name = &template[start..end];
                match args.get(name) {
                    Some(value) if !name.is_empty() => {
                        params.push(value.clone());
                        sql.push('?');
                        sql.push_str(&params.len().to_string());
                    }
                    _ => {
                        if !name.is_empty() {
                            tracing::debug!(name, "placeholder has no argument, left as is");
                        }
                        sql.push(':');
                        sql.push_str(name);
                    }
                }
            }
            _ => sql.push(c),
        }
    }

    Composed { sql, params }
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub offset: i64,
    pub limit: i64,
}

impl Page {
    /// Offset falls back to 0 when absent or negative; limit falls back to 10
    /// when absent or non-positive and is capped at 100.
    pub fn new(offset: Option<i64>, limit: Option<i64>) -> Self {
        let offset = offset.filter(|o| *o >= 0).unwrap_or(DEFAULT_OFFSET);
        let limit = limit
            .filter(|l| *l > 0)
            .map(|l| l.min(MAX_LIMIT))
            .unwrap_or(DEFAULT_LIMIT);
        Self { offset, limit }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(None, None)
    }
}

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

/// Accumulates `WHERE` clauses together with their named arguments.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    clauses: Vec<String>,
    args: NamedArgs,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a clause that binds no arguments.
    pub fn raw(&mut self, clause: impl Into<String>) -> &mut Self {
        self.clauses.push(clause.into());
        self
    }

    /// `column = :name`, only when `value` is present.
    pub fn eq<V: Into<SqlValue>>(&mut self, column: &str, name: &str, value: Option<V>) -> &mut Self {
        if let Some(value) = value {
            self.clauses.push(format!("{column} = :{name}"));
            self.args.insert(name.to_string(), value.into());
        }
        self
    }

    pub fn eq_id(&mut self, column: &str, name: &str, id: Option<Uuid>) -> &mut Self {
        self.eq(column, name, id.map(|id| id.to_string()))
    }

    /// `column IN (:prefix_0, :prefix_1, ...)`.  An empty slice adds nothing.
    pub fn any_id(&mut self, column: &str, prefix: &str, ids: &[Uuid]) -> &mut Self {
        if ids.is_empty() {
            return self;
        }
        let names: Vec<String> = (0..ids.len()).map(|i| format!("{prefix}_{i}")).collect();
        self.clauses.push(format!(
            "{column} IN ({})",
            names
                .iter()
                .map(|n| format!(":{n}"))
                .collect::<Vec<_>>()
                .join(", ")
        ));
        for (name, id) in names.into_iter().zip(ids) {
            self.args.insert(name, SqlValue::Text(id.to_string()));
        }
        self
    }

    /// Case-insensitive substring match of `text` over any of `columns`.
    /// Blank text is ignored.
    pub fn search(&mut self, columns: &[&str], text: Option<&str>) -> &mut Self {
        let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
            return self;
        };
        if columns.is_empty() {
            return self;
        }

        let matches: Vec<String> = columns
            .iter()
            .map(|c| format!("{c} LIKE '%' || :search || '%' ESCAPE '\\'"))
            .collect();
        self.clauses.push(format!("({})", matches.join(" OR ")));
        self.args
            .insert("search".to_string(), SqlValue::Text(escape_like(text)));
        self
    }

    /// `column >= :name` for a lower time bound.
    pub fn since(&mut self, column: &str, name: &str, at: Option<DateTime<Utc>>) -> &mut Self {
        if let Some(at) = at {
            self.clauses.push(format!("{column} >= :{name}"));
            self.args.insert(name.to_string(), SqlValue::Text(ts(&at)));
        }
        self
    }

    /// `column <= :name` for an upper time bound.
    pub fn until(&mut self, column: &str, name: &str, at: Option<DateTime<Utc>>) -> &mut Self {
        if let Some(at) = at {
            self.clauses.push(format!("{column} <= :{name}"));
            self.args.insert(name.to_string(), SqlValue::Text(ts(&at)));
        }
        self
    }

    pub fn args(&self) -> &NamedArgs {
        &self.args
    }

    pub fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.clauses.join(" AND "))
        }
    }

    /// `SELECT COUNT(*) FROM <from> <where>`.
    pub fn count_sql(&self, from: &str) -> Composed {
        let template = format!("SELECT COUNT(*) FROM {from} {}", self.where_sql());
        compose(template.trim_end(), &self.args)
    }

    /// `<select> <where> ORDER BY <order_by> LIMIT .. OFFSET ..`.
    pub fn page_sql(&self, select: &str, order_by: &str, page: Page) -> Composed {
        let mut args = self.args.clone();
        args.insert("limit".to_string(), SqlValue::Integer(page.limit));
        args.insert("offset".to_string(), SqlValue::Integer(page.offset));

        let template = format!(
            "{select} {} ORDER BY {order_by} LIMIT :limit OFFSET :offset",
            self.where_sql()
        );
        compose(&template, &args)
    }
}

// ---------------------------------------------------------------------------
// Sparse updates
// ---------------------------------------------------------------------------

/// The `SET` list of a sparse `UPDATE`.  Absent values are skipped.
///
/// Assignment arguments are bound as `:set_<column>` so they never collide
/// with the names a [`Filter`] uses for the same column.
#[derive(Debug, Clone, Default)]
pub struct Assignments {
    sets: Vec<String>,
    args: NamedArgs,
}

impl Assignments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<V: Into<SqlValue>>(&mut self, column: &str, value: Option<V>) -> &mut Self {
        if let Some(value) = value {
            self.always(column, value);
        }
        self
    }

    pub fn set_id(&mut self, column: &str, id: Option<Uuid>) -> &mut Self {
        self.set(column, id.map(|id| id.to_string()))
    }

    /// Assign unconditionally; `SqlValue::Null` clears the column.
    pub fn always<V: Into<SqlValue>>(&mut self, column: &str, value: V) -> &mut Self {
        self.sets.push(format!("{column} = :set_{column}"));
        self.args.insert(format!("set_{column}"), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// `UPDATE <table> SET .. <where>`.
    pub fn update_sql(&self, table: &str, filter: &Filter) -> Composed {
        let mut args = filter.args().clone();
        args.extend(self.args.iter().map(|(k, v)| (k.clone(), v.clone())));

        let template = format!(
            "UPDATE {table} SET {} {}",
            self.sets.join(", "),
            filter.where_sql()
        );
        compose(template.trim_end(), &args)
    }
}

fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(pairs: &[(&str, SqlValue)]) -> NamedArgs {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn compose_numbers_in_encounter_order() {
        // Map order (alphabetical) differs from template order on purpose.
        let a = args(&[
            ("author", SqlValue::Text("a".into())),
            ("journal", SqlValue::Text("j".into())),
            ("limit", SqlValue::Integer(5)),
        ]);
        let c = compose(
            "SELECT * FROM drafts WHERE journal_id = :journal AND author_id = :author LIMIT :limit",
            &a,
        );
        assert_eq!(
            c.sql,
            "SELECT * FROM drafts WHERE journal_id = ?1 AND author_id = ?2 LIMIT ?3"
        );
        assert_eq!(
            c.params,
            vec![
                SqlValue::Text("j".into()),
                SqlValue::Text("a".into()),
                SqlValue::Integer(5)
            ]
        );
    }

    #[test]
    fn compose_repeated_name_binds_each_occurrence() {
        let a = args(&[("search", SqlValue::Text("x".into()))]);
        let c = compose("title LIKE :search OR description LIKE :search", &a);
        assert_eq!(c.sql, "title LIKE ?1 OR description LIKE ?2");
        assert_eq!(c.params.len(), 2);
    }

    #[test]
    fn compose_leaves_unknown_names_and_literals_alone() {
        let a = args(&[("id", SqlValue::Text("1".into()))]);
        let c = compose(
            "SELECT '10:30 :id', x::text FROM t WHERE id = :id AND y = :missing",
            &a,
        );
        assert_eq!(
            c.sql,
            "SELECT '10:30 :id', x::text FROM t WHERE id = ?1 AND y = :missing"
        );
        assert_eq!(c.params, vec![SqlValue::Text("1".into())]);
    }

    #[test]
    fn compose_handles_escaped_quotes_and_trailing_colon() {
        let a = args(&[("n", SqlValue::Integer(1))]);
        let c = compose("SELECT 'it''s :n' WHERE a = :n AND b = :", &a);
        assert_eq!(c.sql, "SELECT 'it''s :n' WHERE a = ?1 AND b = :");
        assert_eq!(c.params.len(), 1);
    }

    #[test]
    fn page_defaults() {
        assert_eq!(Page::new(None, None), Page { offset: 0, limit: 10 });
        assert_eq!(Page::new(Some(-3), Some(0)), Page { offset: 0, limit: 10 });
        assert_eq!(Page::new(Some(20), Some(-1)), Page { offset: 20, limit: 10 });
        assert_eq!(Page::new(Some(5), Some(500)), Page { offset: 5, limit: 100 });
    }

    #[test]
    fn absent_inputs_are_omitted() {
        let mut f = Filter::new();
        f.eq_id("journal_id", "journal_id", None)
            .eq::<String>("status", "status", None)
            .search(&["title"], Some("   "))
            .since("created_at", "since", None);
        assert_eq!(f.where_sql(), "");
        assert!(f.args().is_empty());

        let count = f.count_sql("drafts");
        assert_eq!(count.sql, "SELECT COUNT(*) FROM drafts");
        assert!(count.params.is_empty());
    }

    #[test]
    fn count_and_page_share_filters() {
        let journal = Uuid::new_v4();
        let mut f = Filter::new();
        f.eq_id("d.journal_id", "journal_id", Some(journal))
            .search(&["d.title", "d.description"], Some("graph"));

        let count = f.count_sql("drafts d");
        assert_eq!(
            count.sql,
            "SELECT COUNT(*) FROM drafts d WHERE d.journal_id = ?1 AND \
             (d.title LIKE '%' || ?2 || '%' ESCAPE '\\' OR d.description LIKE '%' || ?3 || '%' ESCAPE '\\')"
        );
        assert_eq!(count.params.len(), 3);

        let page = f.page_sql("SELECT d.id FROM drafts d", "d.created_at DESC", Page::new(Some(10), Some(5)));
        assert!(page.sql.ends_with("ORDER BY d.created_at DESC LIMIT ?4 OFFSET ?5"));
        assert_eq!(&page.params[..3], &count.params[..]);
        assert_eq!(page.params[3], SqlValue::Integer(5));
        assert_eq!(page.params[4], SqlValue::Integer(10));
    }

    #[test]
    fn any_id_expands_in_slice_order() {
        let ids = [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
        let mut f = Filter::new();
        f.any_id("id", "id", &ids);
        let c = compose(&format!("DELETE FROM t {}", f.where_sql()), f.args());
        assert_eq!(c.sql, "DELETE FROM t WHERE id IN (?1, ?2, ?3)");
        let expected: Vec<SqlValue> = ids.iter().map(|i| SqlValue::Text(i.to_string())).collect();
        assert_eq!(c.params, expected);
    }

    #[test]
    fn assignments_skip_absent_values() {
        let id = Uuid::new_v4();
        let mut set = Assignments::new();
        set.set("title", Some("T".to_string()))
            .set::<String>("description", None)
            .always("step", SqlValue::Null);
        let mut f = Filter::new();
        f.eq_id("id", "id", Some(id));

        let c = set.update_sql("drafts", &f);
        assert_eq!(
            c.sql,
            "UPDATE drafts SET title = ?1, step = ?2 WHERE id = ?3"
        );
        assert_eq!(
            c.params,
            vec![
                SqlValue::Text("T".into()),
                SqlValue::Null,
                SqlValue::Text(id.to_string())
            ]
        );
    }

    #[test]
    fn search_escapes_like_wildcards() {
        assert_eq!(escape_like("100%_a\\b"), "100\\%\\_a\\\\b");
    }
}
