use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Audit event types for the queue lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    // System events
    ServiceStarted {
        version: String,
        config_hash: String,
    },
    ServiceStopped {
        reason: String,
    },

    // Queue item lifecycle
    QueueItemAdded {
        item_id: i64,
        catalog_id: Option<String>,
        kind: String,
        requested_by: Option<String>,
    },
    StateChanged {
        item_id: i64,
        from_status: String,
        to_status: String,
        reason: Option<String>,
    },
    QueueItemUpdated {
        item_id: i64,
        fields: Vec<String>,
    },
    DownloadStarted {
        item_id: i64,
        assigned_id: String,
    },
    DownloadProgress {
        item_id: i64,
        progress: f64,
        download_speed_bps: u64,
    },
    DownloadCompleted {
        item_id: i64,
        assigned_id: String,
    },
    DownloadFailed {
        item_id: i64,
        reason: String,
    },
    DownloadCancelled {
        item_id: i64,
        cancelled_by: Option<String>,
    },
    DownloadPaused {
        item_id: i64,
    },
    DownloadResumed {
        item_id: i64,
    },
}

impl AuditEvent {
    /// Returns the event type as a string for storage
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ServiceStarted { .. } => "service_started",
            Self::ServiceStopped { .. } => "service_stopped",
            Self::QueueItemAdded { .. } => "queue:item_added",
            Self::StateChanged { .. } => "state:changed",
            Self::QueueItemUpdated { .. } => "queue:updated",
            Self::DownloadStarted { .. } => "download:started",
            Self::DownloadProgress { .. } => "download:progress",
            Self::DownloadCompleted { .. } => "download:completed",
            Self::DownloadFailed { .. } => "download:failed",
            Self::DownloadCancelled { .. } => "download:cancelled",
            Self::DownloadPaused { .. } => "download:paused",
            Self::DownloadResumed { .. } => "download:resumed",
        }
    }

    /// Extract the queue item id if this event is item-related
    pub fn item_id(&self) -> Option<i64> {
        match self {
            Self::ServiceStarted { .. } | Self::ServiceStopped { .. } => None,
            Self::QueueItemAdded { item_id, .. }
            | Self::StateChanged { item_id, .. }
            | Self::QueueItemUpdated { item_id, .. }
            | Self::DownloadStarted { item_id, .. }
            | Self::DownloadProgress { item_id, .. }
            | Self::DownloadCompleted { item_id, .. }
            | Self::DownloadFailed { item_id, .. }
            | Self::DownloadCancelled { item_id, .. }
            | Self::DownloadPaused { item_id }
            | Self::DownloadResumed { item_id } => Some(*item_id),
        }
    }

    /// Extract user_id if this event was triggered by a user action
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::QueueItemAdded { requested_by, .. } => requested_by.as_deref(),
            Self::DownloadCancelled { cancelled_by, .. } => cancelled_by.as_deref(),
            _ => None,
        }
    }
}

/// A stored audit record with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub item_id: Option<i64>,
    pub user_id: Option<String>,
    pub data: AuditEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_service_started() {
        let event = AuditEvent::ServiceStarted {
            version: "0.1.0".to_string(),
            config_hash: "abc123".to_string(),
        };
        assert_eq!(event.event_type(), "service_started");
        assert_eq!(event.item_id(), None);
        assert_eq!(event.user_id(), None);
    }

    #[test]
    fn test_event_type_queue_item_added() {
        let event = AuditEvent::QueueItemAdded {
            item_id: 1,
            catalog_id: Some("cat-1".to_string()),
            kind: "torrent".to_string(),
            requested_by: Some("user-456".to_string()),
        };
        assert_eq!(event.event_type(), "queue:item_added");
        assert_eq!(event.item_id(), Some(1));
        assert_eq!(event.user_id(), Some("user-456"));
    }

    #[test]
    fn test_event_type_state_changed() {
        let event = AuditEvent::StateChanged {
            item_id: 1,
            from_status: "queued".to_string(),
            to_status: "searching".to_string(),
            reason: Some("auto-transition".to_string()),
        };
        assert_eq!(event.event_type(), "state:changed");
        assert_eq!(event.item_id(), Some(1));
        assert_eq!(event.user_id(), None);
    }

    #[test]
    fn test_event_type_download_cancelled() {
        let event = AuditEvent::DownloadCancelled {
            item_id: 1,
            cancelled_by: Some("admin".to_string()),
        };
        assert_eq!(event.event_type(), "download:cancelled");
        assert_eq!(event.item_id(), Some(1));
        assert_eq!(event.user_id(), Some("admin"));
    }

    #[test]
    fn test_serialize_deserialize_service_started() {
        let event = AuditEvent::ServiceStarted {
            version: "0.1.0".to_string(),
            config_hash: "abc123".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"service_started\""));
        assert!(json.contains("\"version\":\"0.1.0\""));

        let deserialized: AuditEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.event_type(), "service_started");
    }

    #[test]
    fn test_serialize_deserialize_queue_item_added() {
        let event = AuditEvent::QueueItemAdded {
            item_id: 42,
            catalog_id: None,
            kind: "magnet".to_string(),
            requested_by: Some("user-1".to_string()),
        };
        let json = serde_json::to_string(&event).unwrap();
        let deserialized: AuditEvent = serde_json::from_str(&json).unwrap();

        assert_eq!(deserialized.event_type(), "queue:item_added");
        assert_eq!(deserialized.item_id(), Some(42));
        assert_eq!(deserialized.user_id(), Some("user-1"));
    }

    #[test]
    fn test_audit_record_serialize() {
        let record = AuditRecord {
            id: 1,
            timestamp: Utc::now(),
            event_type: "service_started".to_string(),
            item_id: None,
            user_id: None,
            data: AuditEvent::ServiceStarted {
                version: "0.1.0".to_string(),
                config_hash: "abc123".to_string(),
            },
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"id\":1"));
        assert!(json.contains("\"event_type\":\"service_started\""));
    }
}
