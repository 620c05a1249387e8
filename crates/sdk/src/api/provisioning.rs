//! Provisioning configuration endpoints (RPS).

use crate::client::DmtClient;
use crate::error::DmtResult;
use dmt_core::{Domain, Profile};

/// Provisioning API for the profiles and domains used to activate AMT.
pub struct ProvisioningApi<'a> {
    client: &'a DmtClient,
}

impl<'a> ProvisioningApi<'a> {
    pub(crate) fn new(client: &'a DmtClient) -> Self {
        Self { client }
    }

    /// List provisioning profiles.
    pub async fn profiles(&self) -> DmtResult<Vec<Profile>> {
        self.client.rps.get("admin/profiles").await
    }

    /// List provisioning certificate domains.
    pub async fn domains(&self) -> DmtResult<Vec<Domain>> {
        self.client.rps.get("admin/domains").await
    }
}
