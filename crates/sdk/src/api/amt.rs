//! AMT information and log endpoints (MPS).

use crate::client::DmtClient;
use crate::error::DmtResult;
use dmt_core::{AuditLog, DeviceGuid, EventLogEntry};

/// AMT API for firmware information and device logs.
pub struct AmtApi<'a> {
    client: &'a DmtClient,
}

impl<'a> AmtApi<'a> {
    pub(crate) fn new(client: &'a DmtClient) -> Self {
        Self { client }
    }

    /// Get AMT firmware and software version details.
    ///
    /// The payload mirrors the AMT WS-MAN classes, so it is returned as JSON.
    pub async fn version(&self, guid: &DeviceGuid) -> DmtResult<serde_json::Value> {
        self.client.mps.get(&format!("amt/version/{}", guid)).await
    }

    /// Get hardware inventory (CPU, memory, BIOS, chassis).
    pub async fn hardware_info(&self, guid: &DeviceGuid) -> DmtResult<serde_json::Value> {
        self.client
            .mps
            .get(&format!("amt/hardwareInfo/{}", guid))
            .await
    }

    /// Get the AMT event log.
    pub async fn event_log(&self, guid: &DeviceGuid) -> DmtResult<Vec<EventLogEntry>> {
        self.client.mps.get(&format!("amt/log/event/{}", guid)).await
    }

    /// Get one page of the AMT audit log starting at `start_index`.
    pub async fn audit_log(&self, guid: &DeviceGuid, start_index: u32) -> DmtResult<AuditLog> {
        self.client
            .mps
            .get_with_query(
                &format!("amt/log/audit/{}", guid),
                &[("startIndex", start_index)],
            )
            .await
    }
}
