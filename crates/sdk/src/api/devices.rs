//! Device inventory endpoints (MPS).

use crate::client::DmtClient;
use crate::error::DmtResult;
use dmt_core::{Device, DeviceGuid, DeviceStats, DeviceStatusFilter};

/// Devices API for querying devices known to MPS.
pub struct DevicesApi<'a> {
    client: &'a DmtClient,
}

impl<'a> DevicesApi<'a> {
    pub(crate) fn new(client: &'a DmtClient) -> Self {
        Self { client }
    }

    /// List devices matching `filter`.
    pub async fn list(&self, filter: DeviceStatusFilter) -> DmtResult<Vec<Device>> {
        match filter.query_value() {
            Some(status) => {
                self.client
                    .mps
                    .get_with_query("devices", &[("status", status)])
                    .await
            }
            None => self.client.mps.get("devices").await,
        }
    }

    /// Get a single device by GUID.
    pub async fn get(&self, guid: &DeviceGuid) -> DmtResult<Device> {
        self.client.mps.get(&format!("devices/{}", guid)).await
    }

    /// Get connected/disconnected device counts.
    pub async fn stats(&self) -> DmtResult<DeviceStats> {
        self.client.mps.get("devices/stats").await
    }
}
