//! AMT power endpoints (MPS).

use crate::client::DmtClient;
use crate::error::DmtResult;
use dmt_core::power::PowerStateResponse;
use dmt_core::{
    DeviceGuid, PowerAction, PowerActionOutcome, PowerActionRequest, PowerCapabilities, PowerState,
};
use tracing::info;

/// Power API for reading and changing device power state.
pub struct PowerApi<'a> {
    client: &'a DmtClient,
}

impl<'a> PowerApi<'a> {
    pub(crate) fn new(client: &'a DmtClient) -> Self {
        Self { client }
    }

    /// Get the current power state.
    pub async fn state(&self, guid: &DeviceGuid) -> DmtResult<PowerState> {
        let response: PowerStateResponse = self
            .client
            .mps
            .get(&format!("amt/power/state/{}", guid))
            .await?;
        Ok(response.state())
    }

    /// Get the power actions the device supports.
    pub async fn capabilities(&self, guid: &DeviceGuid) -> DmtResult<PowerCapabilities> {
        self.client
            .mps
            .get(&format!("amt/power/capabilities/{}", guid))
            .await
    }

    /// Perform an out-of-band power action.
    pub async fn action(
        &self,
        guid: &DeviceGuid,
        action: PowerAction,
        use_sol: bool,
    ) -> DmtResult<PowerActionOutcome> {
        info!(guid = %guid, action = %action, use_sol, "Sending power action");
        self.client
            .mps
            .post(
                &format!("amt/power/action/{}", guid),
                &PowerActionRequest::new(action, use_sol),
            )
            .await
    }
}
