// AMT event log and audit log records

use serde::{Deserialize, Serialize};

/// One entry of the AMT event log (`/amt/log/event/{guid}`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLogEntry {
    #[serde(rename = "Time", default)]
    pub time: Option<String>,
    #[serde(rename = "Desc", default)]
    pub description: Option<String>,
    #[serde(rename = "EventSeverity", default)]
    pub severity: Option<String>,
    #[serde(rename = "EntityStr", default)]
    pub entity: Option<String>,
    /// Raw entity field; MPS sends it next to the readable `EntityStr`
    #[serde(rename = "Entity", default, skip_serializing_if = "Option::is_none")]
    pub entity_raw: Option<serde_json::Value>,
}

impl EventLogEntry {
    /// `EntityStr` when present, otherwise the raw `Entity` value
    pub fn entity_name(&self) -> Option<String> {
        if let Some(entity) = self.entity.as_deref().filter(|e| !e.is_empty()) {
            return Some(entity.to_string());
        }
        match self.entity_raw.as_ref()? {
            serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} [{}] {}: {}",
            self.time.as_deref().unwrap_or("-"),
            self.severity.as_deref().unwrap_or("Unknown"),
            self.entity_name().as_deref().unwrap_or("Unknown entity"),
            self.description.as_deref().unwrap_or("(no description)")
        )
    }
}

/// Page of the AMT audit log (`/amt/log/audit/{guid}`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditLog {
    #[serde(rename = "totalCnt", default)]
    pub total_count: u64,
    #[serde(default)]
    pub records: Vec<AuditRecord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditRecord {
    #[serde(rename = "Time", default)]
    pub time: Option<String>,
    #[serde(rename = "AuditApp", default)]
    pub audit_app: Option<String>,
    #[serde(rename = "Event", default)]
    pub event: Option<String>,
    #[serde(rename = "Initiator", default)]
    pub initiator: Option<String>,
    #[serde(rename = "NetAddress", default)]
    pub net_address: Option<String>,
}

impl AuditRecord {
    pub fn summary(&self) -> String {
        let mut line = format!(
            "{} {}: {} by {}",
            self.time.as_deref().unwrap_or("-"),
            self.audit_app.as_deref().unwrap_or("Unknown app"),
            self.event.as_deref().unwrap_or("Unknown event"),
            self.initiator.as_deref().unwrap_or("unknown initiator")
        );
        if let Some(address) = self.net_address.as_deref().filter(|a| !a.is_empty()) {
            line.push_str(&format!(" ({})", address));
        }
        line
    }
}
