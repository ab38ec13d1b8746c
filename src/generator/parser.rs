//! Response parsing for generated SQL
//!
//! The generation service answers in free text following a marker
//! convention:
//!
//! ```text
//! SQL_QUERY:
//! <statement>
//!
//! EXPLANATION:
//! <prose>
//! ```
//!
//! The convention is not guaranteed, so parsing is total: any input yields
//! a (possibly empty) SQL candidate and explanation.

use lazy_static::lazy_static;
use regex::Regex;

pub const SQL_MARKER: &str = "SQL_QUERY:";
pub const EXPLANATION_MARKER: &str = "EXPLANATION:";

/// Words that open a statement and so are never a fence language tag
const STATEMENT_KEYWORDS: &[&str] = &[
    "select", "with", "insert", "update", "delete", "values", "explain", "pragma",
];

lazy_static! {
    /// First line after an opening fence: a candidate tag, then the rest of the line
    static ref FENCE_LINE: Regex = Regex::new(r"^([A-Za-z0-9_+.#\-]*)([^\n]*)(?:\n|$)").unwrap();
    static ref TRAILING_FENCE: Regex = Regex::new(r"\s*```$").unwrap();
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedResponse {
    pub sql: String,
    pub explanation: String,
}

/// Position of the parser relative to the two markers
enum Stage<'a> {
    Start(&'a str),
    AfterSqlMarker(&'a str),
    Split { sql: &'a str, explanation: &'a str },
}

pub fn parse_response(text: &str) -> ParsedResponse {
    let mut stage = Stage::Start(text);

    let (sql, explanation) = loop {
        stage = match stage {
            Stage::Start(text) => match text.find(SQL_MARKER) {
                None => break (text, ""),
                Some(pos) => Stage::AfterSqlMarker(&text[pos + SQL_MARKER.len()..]),
            },
            Stage::AfterSqlMarker(rest) => match rest.find(EXPLANATION_MARKER) {
                None => break (rest, ""),
                Some(pos) => Stage::Split {
                    sql: &rest[..pos],
                    explanation: &rest[pos + EXPLANATION_MARKER.len()..],
                },
            },
            Stage::Split { sql, explanation } => break (sql, explanation),
        };
    };

    ParsedResponse {
        sql: strip_code_fence(sql.trim()),
        explanation: explanation.trim().to_string(),
    }
}

/// Remove one leading and one trailing markdown fence
pub fn strip_code_fence(sql: &str) -> String {
    let without_leading = strip_leading_fence(sql);
    let without_trailing = TRAILING_FENCE.replace(without_leading, "");
    without_trailing.trim().to_string()
}

/// A tag is dropped when it stands alone on the fence line, or when it is
/// `sql`/`sqlite` followed by spaces. Statement keywords always stay.
fn strip_leading_fence(sql: &str) -> &str {
    let Some(rest) = sql.strip_prefix("```") else {
        return sql;
    };
    let Some(caps) = FENCE_LINE.captures(rest) else {
        return rest;
    };
    let tag = caps.get(1).map_or("", |m| m.as_str());
    let tail = caps.get(2).map_or("", |m| m.as_str());

    if tag.is_empty() || is_statement_keyword(tag) {
        return rest;
    }
    if tail.trim().is_empty() {
        let line_end = caps.get(0).map_or(rest.len(), |m| m.end());
        return &rest[line_end..];
    }
    let sql_tag = tag.eq_ignore_ascii_case("sql") || tag.eq_ignore_ascii_case("sqlite");
    if sql_tag && tail.starts_with(|c: char| c == ' ' || c == '\t') {
        return &rest[tag.len()..];
    }
    rest
}

fn is_statement_keyword(word: &str) -> bool {
    STATEMENT_KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(word))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_markers() {
        let parsed = parse_response(
            "SQL_QUERY:\nSELECT COUNT(*) AS cnt FROM customers WHERE country = 'Canada';\n\nEXPLANATION:\nCounts Canadian customers.",
        );
        assert_eq!(parsed.sql, "SELECT COUNT(*) AS cnt FROM customers WHERE country = 'Canada';");
        assert_eq!(parsed.explanation, "Counts Canadian customers.");
    }

    #[test]
    fn test_sql_marker_only() {
        let parsed = parse_response("Here you go.\nSQL_QUERY:\n  SELECT 1;  \n");
        assert_eq!(parsed.sql, "SELECT 1;");
        assert_eq!(parsed.explanation, "");
    }

    #[test]
    fn test_no_markers() {
        let parsed = parse_response("\n  SELECT name FROM students  \n");
        assert_eq!(parsed.sql, "SELECT name FROM students");
        assert_eq!(parsed.explanation, "");
    }

    #[test]
    fn test_explanation_without_sql_marker_is_sql_text() {
        let parsed = parse_response("SELECT 1\nEXPLANATION: one");
        assert_eq!(parsed.sql, "SELECT 1\nEXPLANATION: one");
        assert_eq!(parsed.explanation, "");
    }

    #[test]
    fn test_fence_with_language_tag() {
        let parsed = parse_response(
            "SQL_QUERY:\n```sql\nSELECT p.product_name\nFROM products p;\n```\nEXPLANATION:\nLists products.",
        );
        assert_eq!(parsed.sql, "SELECT p.product_name\nFROM products p;");
        assert_eq!(parsed.explanation, "Lists products.");
    }

    #[test]
    fn test_fence_variants() {
        assert_eq!(strip_code_fence("```\nSELECT 1\n```"), "SELECT 1");
        assert_eq!(strip_code_fence("```sqlite\nSELECT 1```"), "SELECT 1");
        assert_eq!(strip_code_fence("```SQL SELECT 1 ```"), "SELECT 1");
        assert_eq!(strip_code_fence("```postgresql\nSELECT 1\n```"), "SELECT 1");
        // Statement on the fence line is not mistaken for a tag
        assert_eq!(strip_code_fence("```SELECT 1```"), "SELECT 1");
        assert_eq!(strip_code_fence("SELECT '```' AS f"), "SELECT '```' AS f");
        assert_eq!(strip_code_fence("```sql\r\nSELECT 1\r\n```"), "SELECT 1");
    }

    #[test]
    fn test_keyword_on_fence_line_is_kept() {
        let parsed = parse_response("SQL_QUERY:\n```select\n  name\nFROM students\n```");
        assert_eq!(parsed.sql, "select\n  name\nFROM students");

        assert_eq!(strip_code_fence("```WITH\nt AS (SELECT 1) SELECT * FROM t\n```"), "WITH\nt AS (SELECT 1) SELECT * FROM t");
        assert_eq!(strip_code_fence("```pragma\ntable_info(students)```"), "pragma\ntable_info(students)");
        assert_eq!(strip_code_fence("```Delete\nFROM grades```"), "Delete\nFROM grades");
    }

    #[test]
    fn test_mixed_case_and_hyphenated_tags() {
        assert_eq!(strip_code_fence("```PostgreSQL\nSELECT 1\n```"), "SELECT 1");
        assert_eq!(strip_code_fence("```T-SQL\nSELECT 1\n```"), "SELECT 1");
        assert_eq!(strip_code_fence("```SQLite   \nSELECT 1\n```"), "SELECT 1");
        // A non-sql tag followed by text on the same line is not a tag
        assert_eq!(strip_code_fence("```mysql SELECT 1```"), "mysql SELECT 1");
    }

    #[test]
    fn test_repeated_markers_split_at_first() {
        let parsed = parse_response(
            "SQL_QUERY: SELECT 1 EXPLANATION: first SQL_QUERY: SELECT 2 EXPLANATION: second",
        );
        assert_eq!(parsed.sql, "SELECT 1");
        assert_eq!(parsed.explanation, "first SQL_QUERY: SELECT 2 EXPLANATION: second");
    }

    #[test]
    fn test_degenerate_inputs() {
        assert_eq!(parse_response(""), ParsedResponse::default());
        assert_eq!(parse_response("SQL_QUERY:"), ParsedResponse::default());
        assert_eq!(parse_response("SQL_QUERY:EXPLANATION:").sql, "");
        assert_eq!(parse_response("```").sql, "");
        assert_eq!(parse_response("SQL_QUERY:\n```sql\n```").sql, "");
        // Multi-byte text around the markers
        let parsed = parse_response("ñ SQL_QUERY: SELECT 'é' EXPLANATION: ü");
        assert_eq!(parsed.sql, "SELECT 'é'");
        assert_eq!(parsed.explanation, "ü");
    }
}
