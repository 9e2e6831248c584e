use crate::sql::parser::ParsedSql;

use super::{base_query, count_query, Dialect};

/// SQLite shares PostgreSQL's `LIMIT n OFFSET off` pagination policy.
pub struct SqliteDialect;

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn build_paginated(&self, parsed: &ParsedSql, page: u64, size: u64) -> String {
        let offset = (page - 1) * size;
        if parsed.is_complex {
            format!("SELECT * FROM ({}) sub LIMIT {size} OFFSET {offset}", parsed.original)
        } else {
            let mut sql = base_query(parsed);
            if !parsed.order_by.is_empty() {
                sql.push_str(" ORDER BY ");
                sql.push_str(&parsed.order_by);
            }
            sql.push_str(&format!(" LIMIT {size} OFFSET {offset}"));
            sql
        }
    }

    fn build_count(&self, parsed: &ParsedSql) -> String {
        count_query(parsed)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sql::parser::parse_select;

    #[test]
    fn preserves_order_by_already_present() {
        let p = parse_select("SELECT id FROM t WHERE a = 1 ORDER BY id DESC LIMIT 50", &[]).unwrap();
        let sql = SqliteDialect.build_paginated(&p, 2, 10);
        assert_eq!(sql, "SELECT id FROM t WHERE a = 1 ORDER BY id DESC LIMIT 10 OFFSET 10");
    }

    #[test]
    fn complex_select_wraps_the_original_verbatim() {
        let p = parse_select("SELECT * FROM a JOIN b ON a.id = b.a_id", &[]).unwrap();
        let sql = SqliteDialect.build_paginated(&p, 2, 10);
        assert_eq!(sql, "SELECT * FROM (SELECT * FROM a JOIN b ON a.id = b.a_id) sub LIMIT 10 OFFSET 10");
    }
}
