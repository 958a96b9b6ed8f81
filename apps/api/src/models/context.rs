use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Free-form background text about the candidate, merged into every prompt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackgroundContext {
    pub text: String,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ContextRow {
    pub body: String,
    pub updated_at: DateTime<Utc>,
}

impl From<ContextRow> for BackgroundContext {
    fn from(row: ContextRow) -> Self {
        Self {
            text: row.body,
            updated_at: Some(row.updated_at),
        }
    }
}
