use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Errors raised while validating domain values
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("invalid device GUID `{0}`: expected a UUID such as 4c4c4544-0044-4810-8033-b4c04f4e4332")]
    InvalidGuid(String),

    #[error("unsupported power action {0}")]
    UnsupportedPowerAction(u16),

    #[error("invalid device status filter {0}: expected 0 (disconnected) or 1 (connected)")]
    InvalidStatusFilter(i64),
}

/// GUID of an Intel AMT device, as reported by MPS
///
/// Always holds a well-formed UUID, so it is safe to splice into request paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceGuid(pub Uuid);

impl DeviceGuid {
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        Uuid::parse_str(value.trim())
            .map(Self)
            .map_err(|_| CoreError::InvalidGuid(value.to_string()))
    }
}

impl FromStr for DeviceGuid {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for DeviceGuid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // MPS stores GUIDs in lowercase hyphenated form
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Filter applied when listing devices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceStatusFilter {
    #[default]
    Connected,
    Disconnected,
    All,
}

impl DeviceStatusFilter {
    /// Value of the `status` query parameter, `None` when it must be omitted
    pub fn query_value(&self) -> Option<u8> {
        match self {
            Self::Connected => Some(1),
            Self::Disconnected => Some(0),
            Self::All => None,
        }
    }

    pub fn from_code(code: i64) -> Result<Self, CoreError> {
        match code {
            1 => Ok(Self::Connected),
            0 => Ok(Self::Disconnected),
            other => Err(CoreError::InvalidStatusFilter(other)),
        }
    }
}

/// A device known to the Management Presence Server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub guid: DeviceGuid,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub friendly_name: Option<String>,
    #[serde(default)]
    pub connection_status: bool,
    #[serde(default)]
    pub mps_instance: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub dns_suffix: Option<String>,
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub last_connected: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_disconnected: Option<DateTime<Utc>>,
}

impl Device {
    pub fn connection_label(&self) -> &'static str {
        if self.connection_status {
            "Connected"
        } else {
            "Disconnected"
        }
    }
}

/// Device counts reported by `/devices/stats`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStats {
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub connected_count: u64,
    #[serde(default)]
    pub disconnected_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guid_parse_normalizes_case() {
        let guid = DeviceGuid::parse("4C4C4544-0044-4810-8033-B4C04F4E4332").unwrap();
        assert_eq!(guid.to_string(), "4c4c4544-0044-4810-8033-b4c04f4e4332");
    }

    #[test]
    fn test_guid_rejects_path_segments() {
        assert!(DeviceGuid::parse("../admin/profiles").is_err());
        assert!(DeviceGuid::parse("").is_err());
        assert_eq!(
            "not-a-guid".parse::<DeviceGuid>(),
            Err(CoreError::InvalidGuid("not-a-guid".to_string()))
        );
    }

    #[test]
    fn test_status_filter_codes() {
        assert_eq!(DeviceStatusFilter::from_code(1), Ok(DeviceStatusFilter::Connected));
        assert_eq!(DeviceStatusFilter::from_code(0), Ok(DeviceStatusFilter::Disconnected));
        assert!(DeviceStatusFilter::from_code(2).is_err());

        assert_eq!(DeviceStatusFilter::default().query_value(), Some(1));
        assert_eq!(DeviceStatusFilter::All.query_value(), None);
    }

    #[test]
    fn test_device_deserialize_mps_payload() {
        let json = serde_json::json!({
            "guid": "4c4c4544-0044-4810-8033-b4c04f4e4332",
            "hostname": "nuc-01",
            "tags": ["lab"],
            "mpsInstance": "mps-0",
            "connectionStatus": true,
            "mpsusername": "admin",
            "tenantId": "",
            "friendlyName": null,
            "dnsSuffix": null,
            "lastConnected": "2024-05-01T10:00:00.000Z",
            "lastSeen": "2024-05-01T10:05:00.000Z",
            "lastDisconnected": null,
            "deviceInfo": { "fwVersion": "16.1.27" }
        });

        let device: Device = serde_json::from_value(json).unwrap();
        assert_eq!(device.hostname.as_deref(), Some("nuc-01"));
        assert!(device.friendly_name.is_none());
        assert_eq!(device.tags, vec!["lab".to_string()]);
        assert_eq!(device.connection_label(), "Connected");
        assert!(device.last_connected.is_some());
        assert!(device.last_disconnected.is_none());
    }

    #[test]
    fn test_device_guid_validated_on_deserialize() {
        let device: Device = serde_json::from_value(serde_json::json!({
            "guid": "4C4C4544-0044-4810-8033-B4C04F4E4332",
            "connectionStatus": false
        }))
        .unwrap();
        assert_eq!(device.guid.to_string(), "4c4c4544-0044-4810-8033-b4c04f4e4332");

        let malformed = serde_json::from_value::<Device>(serde_json::json!({
            "guid": "../../admin",
            "connectionStatus": true
        }));
        assert!(malformed.is_err());
    }

    #[test]
    fn test_device_stats_deserialize() {
        let stats: DeviceStats = serde_json::from_str(
            r#"{"totalCount": 5, "connectedCount": 3, "disconnectedCount": 2}"#,
        )
        .unwrap();
        assert_eq!(stats.total_count, 5);
        assert_eq!(stats.connected_count, 3);
        assert_eq!(stats.disconnected_count, 2);
    }
}
