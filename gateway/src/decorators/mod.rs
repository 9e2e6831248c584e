//! Per-table behavior layered over raw CRUD: auto timestamps, soft
//! deletes, and optimistic locking. Consulted in a fixed order —
//! timestamps, then soft-delete, then optimistic-lock — so a table with
//! more than one enabled never depends on registration order to decide
//! which column wins a write.

mod optimistic_lock;
mod soft_delete;
mod timestamps;

pub use optimistic_lock::OptimisticLockConfig;
pub use soft_delete::{SoftDeleteConfig, TrashedMode};
pub use timestamps::TimestampsConfig;

use chrono::Utc;
use dashmap::DashMap;

use crate::record::Record;

#[derive(Debug, Clone, Default)]
pub struct TableDecorators {
    pub timestamps: Option<TimestampsConfig>,
    pub soft_delete: Option<SoftDeleteConfig>,
    pub optimistic_lock: Option<OptimisticLockConfig>,
}

/// Table-name-keyed registry of which decorators apply where.
#[derive(Default)]
pub struct DecoratorRegistry {
    tables: DashMap<String, TableDecorators>,
}

impl DecoratorRegistry {
    pub fn new() -> Self {
        DecoratorRegistry { tables: DashMap::new() }
    }

    pub fn configure(&self, table: &str, decorators: TableDecorators) {
        self.tables.insert(table.to_string(), decorators);
    }

    pub fn is_soft_delete(&self, table: &str) -> Option<String> {
        self.tables.get(table)?.soft_delete.as_ref().map(|s| s.deleted_at_col.clone())
    }

    pub fn optimistic_lock_column(&self, table: &str) -> Option<String> {
        self.tables
            .get(table)?
            .optimistic_lock
            .as_ref()
            .map(|o| o.version_col.clone())
    }

    /// Fixed order: timestamps, then soft-delete defaults (deleted_at
    /// starts NULL so nothing to do here), then optimistic-lock seeds
    /// the version column at 0.
    pub fn apply_before_insert(&self, table: &str, record: &Record) {
        let Some(cfg) = self.tables.get(table) else { return };
        if let Some(ts) = &cfg.timestamps {
            let now = Utc::now().naive_utc();
            record.set(ts.created_at_col.as_str(), now);
            record.set(ts.updated_at_col.as_str(), now);
        }
        if let Some(ol) = &cfg.optimistic_lock {
            if !record.has(&ol.version_col) {
                record.set(ol.version_col.as_str(), 0i64);
            }
        }
    }

    /// Same fixed order applied before an `UPDATE`. Returns the
    /// optimistic-lock version the caller observed before bumping it, so
    /// the statement's `WHERE version = ?` can be built against it.
    pub fn apply_before_update(&self, table: &str, record: &Record) -> Option<i64> {
        let Some(cfg) = self.tables.get(table) else { return None };
        if let Some(ts) = &cfg.timestamps {
            record.set(ts.updated_at_col.as_str(), Utc::now().naive_utc());
        }
        cfg.optimistic_lock.as_ref().map(|ol| {
            let observed = record.get_i64(&ol.version_col);
            record.set(ol.version_col.as_str(), observed + 1);
            observed
        })
    }

    /// `None` when the table has no soft-delete column or the caller
    /// asked for `WithTrashed` (no filter at all).
    pub fn soft_delete_predicate(&self, table: &str, mode: TrashedMode) -> Option<String> {
        if mode == TrashedMode::WithTrashed {
            return None;
        }
        let cfg = self.tables.get(table)?;
        let sd = cfg.soft_delete.as_ref()?;
        Some(match mode {
            TrashedMode::Exclude => format!("{} IS NULL", sd.deleted_at_col),
            TrashedMode::OnlyTrashed => format!("{} IS NOT NULL", sd.deleted_at_col),
            TrashedMode::WithTrashed => unreachable!(),
        })
    }
}
