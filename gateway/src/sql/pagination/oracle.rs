use crate::sql::parser::ParsedSql;

use super::{base_query, count_query, Dialect};

pub struct OracleDialect;

impl Dialect for OracleDialect {
    fn name(&self) -> &'static str {
        "oracle"
    }

    fn build_paginated(&self, parsed: &ParsedSql, page: u64, size: u64) -> String {
        let order_by = if parsed.order_by.is_empty() {
            "ROWID".to_string()
        } else {
            parsed.order_by.clone()
        };
        let inner = if parsed.is_complex {
            parsed.original.clone()
        } else {
            base_query(parsed)
        };
        let offset = (page - 1) * size;
        format!(
            "SELECT * FROM (SELECT inner_.*, ROW_NUMBER() OVER (ORDER BY {order_by}) rn__ FROM ({inner}) inner_) WHERE rn__ > {offset} AND rn__ <= {}",
            offset + size
        )
    }

    fn build_count(&self, parsed: &ParsedSql) -> String {
        count_query(parsed)
    }
}
