//! Clause extraction over the scanner's keyword stream.

use std::collections::HashMap;

use common::err::GatewayError;

use super::scanner::{self, is_clause_keyword, is_join_keyword};

/// A `SELECT` broken into its top-level clauses, plus a few booleans the
/// pagination engine and the façade use to decide how aggressive a
/// rewrite is safe.
#[derive(Debug, Clone)]
pub struct ParsedSql {
    pub original: String,
    pub select: String,
    pub from: String,
    pub where_clause: String,
    pub group_by: String,
    pub having: String,
    pub order_by: String,
    pub has_join: bool,
    pub has_subquery: bool,
    pub is_complex: bool,
    /// True if the original text already carried a top-level `LIMIT`
    /// and/or `OFFSET` — the pagination dialects strip it before
    /// appending their own.
    pub had_limit_offset: bool,
    pub args: Vec<String>,
}

pub fn parse_select(sql: &str, args: &[String]) -> Result<ParsedSql, GatewayError> {
    let trimmed = sql.trim();
    if trimmed.is_empty() {
        return Err(GatewayError::InvalidSql("sql is empty".into()));
    }
    if !starts_with_keyword(trimmed, "SELECT") && !starts_with_keyword(trimmed, "WITH") {
        return Err(GatewayError::UnsupportedSql(
            "only SELECT statements (optionally CTE-prefixed) are paginable".into(),
        ));
    }

    let scan = scanner::scan(trimmed);
    let top_level: Vec<_> = scan
        .hits
        .iter()
        .filter(|h| h.depth == 0 && is_clause_keyword(h.keyword))
        .collect();

    // A top-level LIMIT/OFFSET truncates whichever clause would otherwise
    // run to the end of the string.
    let tail_cut = scan
        .hits
        .iter()
        .filter(|h| h.depth == 0 && (h.keyword == "LIMIT" || h.keyword == "OFFSET"))
        .map(|h| h.start)
        .min();
    let had_limit_offset = tail_cut.is_some();

    let mut bounds: HashMap<&'static str, (usize, usize)> = HashMap::new();
    for (idx, hit) in top_level.iter().enumerate() {
        let mut end = top_level.get(idx + 1).map(|h| h.start).unwrap_or(trimmed.len());
        if let Some(cut) = tail_cut {
            if cut > hit.end && cut < end {
                end = cut;
            }
        }
        bounds.entry(hit.keyword).or_insert((hit.end, end));
    }

    let clause = |kw: &str| -> String {
        bounds
            .get(kw)
            .map(|&(s, e)| trimmed[s..e].trim().to_string())
            .unwrap_or_default()
    };

    let group_by = clause("GROUP BY");
    let has_join = scan.hits.iter().any(|h| is_join_keyword(h.keyword));
    let has_union = scan.hits.iter().any(|h| h.keyword == "UNION" && h.depth == 0);
    let has_cte = starts_with_keyword(trimmed, "WITH");
    let is_complex = has_join || scan.has_subquery || has_union || has_cte || !group_by.is_empty();

    Ok(ParsedSql {
        original: trimmed.to_string(),
        select: clause("SELECT"),
        from: clause("FROM"),
        where_clause: clause("WHERE"),
        group_by,
        having: clause("HAVING"),
        order_by: clause("ORDER BY"),
        has_join,
        has_subquery: scan.has_subquery,
        is_complex,
        had_limit_offset,
        args: args.to_vec(),
    })
}

fn starts_with_keyword(sql: &str, kw: &str) -> bool {
    let bytes = sql.as_bytes();
    if bytes.len() < kw.len() {
        return false;
    }
    if !sql[..kw.len()].eq_ignore_ascii_case(kw) {
        return false;
    }
    matches!(bytes.get(kw.len()), None | Some(b' ') | Some(b'\t') | Some(b'\n') | Some(b'\r') | Some(b'('))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_simple_select() {
        let p = parse_select("SELECT id, name FROM users WHERE age > 18 ORDER BY id", &[]).unwrap();
        assert_eq!(p.select, "id, name");
        assert_eq!(p.from, "users");
        assert_eq!(p.where_clause, "age > 18");
        assert_eq!(p.order_by, "id");
        assert!(!p.is_complex);
    }

    #[test]
    fn detects_join_as_complex() {
        let p = parse_select("SELECT * FROM a JOIN b ON a.id = b.a_id", &[]).unwrap();
        assert!(p.has_join);
        assert!(p.is_complex);
    }

    #[test]
    fn detects_subquery_in_from_as_complex() {
        let p = parse_select("SELECT * FROM (SELECT id FROM t) sub", &[]).unwrap();
        assert!(p.has_subquery);
        assert!(p.is_complex);
    }

    #[test]
    fn group_by_marks_complex() {
        let p = parse_select("SELECT dept, count(*) FROM emp GROUP BY dept", &[]).unwrap();
        assert_eq!(p.group_by, "dept");
        assert!(p.is_complex);
    }

    #[test]
    fn cte_is_detected() {
        let p = parse_select("WITH recent AS (SELECT id FROM t) SELECT * FROM recent", &[]).unwrap();
        assert!(p.is_complex);
    }

    #[test]
    fn rejects_non_select_statements() {
        assert!(parse_select("DELETE FROM users", &[]).is_err());
        assert!(parse_select("  ", &[]).is_err());
    }

    #[test]
    fn existing_limit_offset_is_excluded_from_order_by_clause() {
        let p = parse_select("SELECT * FROM t ORDER BY id LIMIT 10 OFFSET 20", &[]).unwrap();
        assert_eq!(p.order_by, "id");
        assert!(p.had_limit_offset);
    }

    #[test]
    fn where_clause_ignores_literal_keywords() {
        let p = parse_select("SELECT * FROM t WHERE name = 'FROM nowhere'", &[]).unwrap();
        assert_eq!(p.where_clause, "name = 'FROM nowhere'");
    }
}
