use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A stored signup as read back from the table.
///
/// Rows may come from other signup forms writing to the same table, so the
/// fields are kept as stored and only parsed where an email is sent.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Subscriber {
    pub id: Uuid,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub subscribed: bool,
    pub source: String,
}
