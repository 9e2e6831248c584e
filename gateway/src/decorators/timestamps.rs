#[derive(Debug, Clone)]
pub struct TimestampsConfig {
    pub created_at_col: String,
    pub updated_at_col: String,
}

impl TimestampsConfig {
    pub fn new(created_at_col: impl Into<String>, updated_at_col: impl Into<String>) -> Self {
        TimestampsConfig {
            created_at_col: created_at_col.into(),
            updated_at_col: updated_at_col.into(),
        }
    }
}
