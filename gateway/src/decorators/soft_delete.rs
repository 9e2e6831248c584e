#[derive(Debug, Clone)]
pub struct SoftDeleteConfig {
    pub deleted_at_col: String,
}

impl SoftDeleteConfig {
    pub fn new(deleted_at_col: impl Into<String>) -> Self {
        SoftDeleteConfig {
            deleted_at_col: deleted_at_col.into(),
        }
    }
}

/// How a soft-deleted table should be filtered on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrashedMode {
    /// Default: `deleted_at IS NULL`.
    Exclude,
    /// `deleted_at IS NOT NULL` only.
    OnlyTrashed,
    /// No filter at all.
    WithTrashed,
}
