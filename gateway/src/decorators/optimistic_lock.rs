#[derive(Debug, Clone)]
pub struct OptimisticLockConfig {
    pub version_col: String,
}

impl OptimisticLockConfig {
    pub fn new(version_col: impl Into<String>) -> Self {
        OptimisticLockConfig {
            version_col: version_col.into(),
        }
    }
}
