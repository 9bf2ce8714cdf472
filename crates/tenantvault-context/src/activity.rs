//! Bounded log of a tenant's data operations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The log keeps only this many of the most recent entries
pub const MAX_ACTIVITY_ENTRIES: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityAction {
    Set,
    Get,
    Delete,
}

impl ActivityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityAction::Set => "set",
            ActivityAction::Get => "get",
            ActivityAction::Delete => "delete",
        }
    }
}

impl fmt::Display for ActivityAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub action: ActivityAction,
    pub key: String,
    pub timestamp: DateTime<Utc>,
}

impl ActivityEntry {
    pub fn new(action: ActivityAction, key: impl Into<String>) -> Self {
        Self {
            action,
            key: key.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Append `entry`, evicting the oldest entries beyond the bound
pub(crate) fn push_bounded(log: &mut Vec<ActivityEntry>, entry: ActivityEntry) {
    log.push(entry);
    if log.len() > MAX_ACTIVITY_ENTRIES {
        let excess = log.len() - MAX_ACTIVITY_ENTRIES;
        log.drain(..excess);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_evicts_oldest() {
        let mut log = Vec::new();
        for i in 0..MAX_ACTIVITY_ENTRIES + 5 {
            push_bounded(&mut log, ActivityEntry::new(ActivityAction::Set, format!("k{i}")));
        }

        assert_eq!(log.len(), MAX_ACTIVITY_ENTRIES);
        assert_eq!(log[0].key, "k5");
        assert_eq!(log[MAX_ACTIVITY_ENTRIES - 1].key, format!("k{}", MAX_ACTIVITY_ENTRIES + 4));
    }

    #[test]
    fn test_oversized_stored_log_is_trimmed_on_next_push() {
        let mut log: Vec<_> = (0..150)
            .map(|i| ActivityEntry::new(ActivityAction::Get, format!("k{i}")))
            .collect();

        push_bounded(&mut log, ActivityEntry::new(ActivityAction::Delete, "last"));

        assert_eq!(log.len(), MAX_ACTIVITY_ENTRIES);
        assert_eq!(log.last().unwrap().key, "last");
    }

    #[test]
    fn test_action_wire_format() {
        let entry = ActivityEntry::new(ActivityAction::Delete, "k");
        let json = serde_json::to_value(&entry).unwrap();

        assert_eq!(json["action"], "delete");
        assert_eq!(ActivityAction::Get.to_string(), "get");
    }
}
