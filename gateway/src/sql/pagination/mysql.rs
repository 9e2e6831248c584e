use crate::sql::parser::ParsedSql;

use super::{base_query, count_query, Dialect};

pub struct MysqlDialect;

impl Dialect for MysqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn build_paginated(&self, parsed: &ParsedSql, page: u64, size: u64) -> String {
        let offset = (page - 1) * size;
        if parsed.is_complex {
            format!("SELECT * FROM ({}) sub LIMIT {offset}, {size}", parsed.original)
        } else {
            let mut sql = base_query(parsed);
            if !parsed.order_by.is_empty() {
                sql.push_str(" ORDER BY ");
                sql.push_str(&parsed.order_by);
            }
            sql.push_str(&format!(" LIMIT {offset}, {size}"));
            sql
        }
    }

    fn build_count(&self, parsed: &ParsedSql) -> String {
        count_query(parsed)
    }
}
