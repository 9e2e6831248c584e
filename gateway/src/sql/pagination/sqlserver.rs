use crate::sql::parser::ParsedSql;

use super::{base_query, count_query, Dialect};

pub struct SqlServerDialect;

impl Dialect for SqlServerDialect {
    fn name(&self) -> &'static str {
        "sqlserver"
    }

    fn build_paginated(&self, parsed: &ParsedSql, page: u64, size: u64) -> String {
        let mut sql = if parsed.is_complex {
            format!("SELECT * FROM ({}) sub", parsed.original)
        } else {
            base_query(parsed)
        };
        // OFFSET/FETCH requires an ORDER BY; synthesize a no-op one so a
        // caller that forgot one still gets a stable (if arbitrary) page.
        if parsed.order_by.is_empty() {
            sql.push_str(" ORDER BY (SELECT NULL)");
        } else {
            sql.push_str(" ORDER BY ");
            sql.push_str(&parsed.order_by);
        }
        let offset = (page - 1) * size;
        sql.push_str(&format!(" OFFSET {offset} ROWS FETCH NEXT {size} ROWS ONLY"));
        sql
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
    fn synthesizes_order_by_when_missing() {
        let p = parse_select("SELECT id FROM t", &[]).unwrap();
        let sql = SqlServerDialect.build_paginated(&p, 1, 20);
        assert_eq!(
            sql,
            "SELECT id FROM t ORDER BY (SELECT NULL) OFFSET 0 ROWS FETCH NEXT 20 ROWS ONLY"
        );
    }

    #[test]
    fn uses_existing_order_by() {
        let p = parse_select("SELECT id FROM t ORDER BY id", &[]).unwrap();
        let sql = SqlServerDialect.build_paginated(&p, 2, 20);
        assert_eq!(sql, "SELECT id FROM t ORDER BY id OFFSET 20 ROWS FETCH NEXT 20 ROWS ONLY");
    }

    #[test]
    fn complex_select_wraps_the_original_verbatim() {
        let p = parse_select("SELECT * FROM a JOIN b ON a.id = b.a_id", &[]).unwrap();
        let sql = SqlServerDialect.build_paginated(&p, 1, 20);
        assert_eq!(
            sql,
            "SELECT * FROM (SELECT * FROM a JOIN b ON a.id = b.a_id) sub ORDER BY (SELECT NULL) OFFSET 0 ROWS FETCH NEXT 20 ROWS ONLY"
        );
    }
}
