//! Typed API groups for MPS and RPS.

pub mod amt;
pub mod devices;
pub mod power;
pub mod provisioning;

pub use amt::AmtApi;
pub use devices::DevicesApi;
pub use power::PowerApi;
pub use provisioning::ProvisioningApi;
