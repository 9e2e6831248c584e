//! C4: dialect-specific pagination SQL generation and the orchestration
//! (`paginate`) that ties it to a result cache and a query executor.

mod mysql;
mod oracle;
mod postgres;
mod sqlite;
mod sqlserver;

pub use mysql::MysqlDialect;
pub use oracle::OracleDialect;
pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;
pub use sqlserver::SqlServerDialect;

use async_trait::async_trait;
use common::err::GatewayError;

use crate::record::{Record, Value};
use crate::sql::parser::{parse_select, ParsedSql};

/// Per-database SQL generation for a page of rows and a total count.
pub trait Dialect: Send + Sync {
    fn name(&self) -> &'static str;
    fn build_paginated(&self, parsed: &ParsedSql, page: u64, size: u64) -> String;
    fn build_count(&self, parsed: &ParsedSql) -> String;
}

/// The dialect tags callers select a pagination adapter by. Unknown tags
/// fall back to MySQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialectTag {
    Mysql,
    Postgresql,
    Sqlite,
    SqlServer,
    Oracle,
}

impl DialectTag {
    pub fn parse(tag: &str) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "postgresql" | "postgres" | "pg" => DialectTag::Postgresql,
            "sqlite" | "sqlite3" => DialectTag::Sqlite,
            "sqlserver" | "mssql" => DialectTag::SqlServer,
            "oracle" => DialectTag::Oracle,
            _ => DialectTag::Mysql,
        }
    }

    pub fn dialect(self) -> &'static dyn Dialect {
        match self {
            DialectTag::Mysql => &MysqlDialect,
            DialectTag::Postgresql => &PostgresDialect,
            DialectTag::Sqlite => &SqliteDialect,
            DialectTag::SqlServer => &SqlServerDialect,
            DialectTag::Oracle => &OracleDialect,
        }
    }
}

/// Executes the SQL a dialect produces. The gateway façade's driver layer
/// implements this; pagination itself stays storage-agnostic.
#[async_trait]
pub trait PageExecutor: Send + Sync {
    async fn fetch_rows(&self, sql: &str, args: &[Value]) -> Result<Vec<Record>, GatewayError>;
    async fn fetch_count(&self, sql: &str, args: &[Value]) -> Result<u64, GatewayError>;
}

#[derive(Debug)]
pub struct PageResult {
    pub items: Vec<Record>,
    pub page: u64,
    pub size: u64,
    pub total: u64,
    pub page_count: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

pub const COUNT_CACHE_REPO: &str = "__page_count__";

pub async fn paginate(
    executor: &dyn PageExecutor,
    dialect: &dyn Dialect,
    cache: Option<&dyn crate::cache::CacheProvider>,
    sql: &str,
    args: &[Value],
    page: u64,
    size: u64,
    max_page_size: u64,
) -> Result<PageResult, GatewayError> {
    if page == 0 {
        return Err(GatewayError::invalid_argument("page must be 1 or greater"));
    }
    if size == 0 || size > max_page_size {
        return Err(GatewayError::invalid_argument(format!(
            "size must be between 1 and {max_page_size}"
        )));
    }

    let arg_labels: Vec<String> = args.iter().map(describe_arg).collect();
    let parsed = parse_select(sql, &arg_labels)?;

    let total = resolve_total(executor, dialect, cache, &parsed, args).await?;

    let page_sql = dialect.build_paginated(&parsed, page, size);
    let items = executor.fetch_rows(&page_sql, args).await?;

    let page_count = if total == 0 { 0 } else { (total + size - 1) / size };
    Ok(PageResult {
        items,
        page,
        size,
        total,
        page_count,
        has_next: page < page_count,
        has_prev: page > 1,
    })
}

async fn resolve_total(
    executor: &dyn PageExecutor,
    dialect: &dyn Dialect,
    cache: Option<&dyn crate::cache::CacheProvider>,
    parsed: &ParsedSql,
    args: &[Value],
) -> Result<u64, GatewayError> {
    let key = count_key(dialect, parsed);
    if let Some(c) = cache {
        if let Some(Value::U64(total)) = c.get(COUNT_CACHE_REPO, &key).await {
            return Ok(total);
        }
    }

    let count_sql = dialect.build_count(parsed);
    let total = executor.fetch_count(&count_sql, args).await?;

    if let Some(c) = cache {
        c.set(COUNT_CACHE_REPO, &key, Value::U64(total), None).await;
    }
    Ok(total)
}

pub fn pagination_key(dialect: &dyn Dialect, parsed: &ParsedSql, page: u64, size: u64) -> String {
    fingerprint(
        "PAGINATE",
        parsed,
        &[
            ("DIALECT", dialect.name().to_string()),
            ("PAGE", page.to_string()),
            ("SIZE", size.to_string()),
        ],
    )
}

pub fn count_key(dialect: &dyn Dialect, parsed: &ParsedSql) -> String {
    fingerprint("COUNT", parsed, &[("DIALECT", dialect.name().to_string())])
}

pub fn template_key(dialect: &dyn Dialect, parsed: &ParsedSql) -> String {
    fingerprint("PAGINATE_TEMPLATE", parsed, &[("DIALECT", dialect.name().to_string())])
}

fn fingerprint(label: &str, parsed: &ParsedSql, extra: &[(&str, String)]) -> String {
    let mut buf = String::from(label);
    buf.push(';');
    buf.push_str("SELECT:");
    buf.push_str(&parsed.select);
    buf.push_str(";FROM:");
    buf.push_str(&parsed.from);
    buf.push_str(";WHERE:");
    buf.push_str(&parsed.where_clause);
    buf.push_str(";GROUP:");
    buf.push_str(&parsed.group_by);
    buf.push_str(";HAVING:");
    buf.push_str(&parsed.having);
    buf.push_str(";ORDER:");
    buf.push_str(&parsed.order_by);
    buf.push_str(";COMPLEX:");
    buf.push_str(&parsed.is_complex.to_string());
    buf.push_str(";SUBQUERY:");
    buf.push_str(&parsed.has_subquery.to_string());
    buf.push_str(";JOIN:");
    buf.push_str(&parsed.has_join.to_string());
    buf.push_str(";ARGS:");
    buf.push_str(&parsed.args.join(","));
    for (k, v) in extra {
        buf.push(';');
        buf.push_str(k);
        buf.push(':');
        buf.push_str(v);
    }
    format!("{:x}", md5::compute(buf.as_bytes()))
}

fn describe_arg(v: &Value) -> String {
    match v {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::I64(i) => i.to_string(),
        Value::U64(u) => u.to_string(),
        Value::F64(f) => f.to_string(),
        Value::Str(s) => s.clone(),
        Value::Bytes(b) => format!("<{} bytes>", b.len()),
        Value::Time(t) => t.to_string(),
        Value::Array(_) => "<array>".to_string(),
        Value::Record(_) => "<record>".to_string(),
        Value::Opaque(_) => "<opaque>".to_string(),
    }
}

/// Builds the `SELECT <cols> FROM <from> [WHERE ...] [GROUP BY ...]
/// [HAVING ...]` prefix shared by every dialect's count/page query.
pub(super) fn base_query(parsed: &ParsedSql) -> String {
    let mut sql = format!("SELECT {} FROM {}", parsed.select, parsed.from);
    if !parsed.where_clause.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&parsed.where_clause);
    }
    if !parsed.group_by.is_empty() {
        sql.push_str(" GROUP BY ");
        sql.push_str(&parsed.group_by);
    }
    if !parsed.having.is_empty() {
        sql.push_str(" HAVING ");
        sql.push_str(&parsed.having);
    }
    sql
}

/// `COUNT(*)` over the base query. Complex selects (joins, subqueries,
/// unions, CTEs, `GROUP BY`) are counted by wrapping the original text
/// unchanged — clause splitting isn't trustworthy for these, and a flat
/// `COUNT(*)` over a `GROUP BY` would count rows, not groups.
pub(super) fn count_query(parsed: &ParsedSql) -> String {
    if parsed.is_complex {
        format!("SELECT COUNT(*) FROM ({}) c", parsed.original)
    } else {
        let mut sql = format!("SELECT COUNT(*) FROM {}", parsed.from);
        if !parsed.where_clause.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&parsed.where_clause);
        }
        sql
    }
}
