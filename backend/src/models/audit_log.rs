use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{types::Json, FromRow};

use crate::types::{AuditLogId, UserId};

/// Event recorded when a check-out is blocked by a stale open session.
pub const EVENT_STALE_OPEN_SESSION: &str = "STALE_OPEN_SESSION";
/// Event recorded when more than one open session is observed for a user.
pub const EVENT_MULTIPLE_ACTIVE_SESSIONS: &str = "MULTIPLE_ACTIVE_SESSIONS";
/// User-lifecycle events.
pub const EVENT_USER_CREATED: &str = "USER_CREATED";
pub const EVENT_USER_SOFT_DELETED: &str = "USER_SOFT_DELETED";
pub const EVENT_USER_RESTORED: &str = "USER_RESTORED";
pub const EVENT_USERS_PURGED: &str = "USERS_PURGED";

/// Session-id lists in audit metadata are capped at this many entries.
pub const MAX_AUDITED_SESSION_IDS: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AuditLog {
    pub id: AuditLogId,
    pub occurred_at: DateTime<Utc>,
    pub actor_id: Option<UserId>,
    pub event_type: String,
    pub target_type: Option<String>,
    pub target_id: Option<String>,
    pub metadata: Option<Json<Value>>,
}

impl AuditLog {
    pub fn new(
        actor_id: Option<UserId>,
        event_type: &str,
        target_type: Option<&str>,
        target_id: Option<String>,
        metadata: Option<Value>,
    ) -> Self {
        Self {
            id: AuditLogId::new(),
            occurred_at: Utc::now(),
            actor_id,
            event_type: event_type.to_string(),
            target_type: target_type.map(str::to_string),
            target_id,
            metadata: metadata.map(Json),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audit_entry_serializes_metadata_json() {
        let entry = AuditLog::new(
            Some(UserId::new()),
            EVENT_MULTIPLE_ACTIVE_SESSIONS,
            Some("attendance"),
            None,
            Some(serde_json::json!({"open_count": 2})),
        );
        assert_eq!(entry.event_type, "MULTIPLE_ACTIVE_SESSIONS");
        assert_eq!(
            entry.metadata.as_ref().map(|m| m.0["open_count"].clone()),
            Some(serde_json::json!(2))
        );
    }
}
