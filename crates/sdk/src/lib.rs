//! # DMT SDK
//!
//! Asynchronous client for the Device Management Toolkit REST APIs: the
//! Management Presence Server (MPS) and the Remote Provisioning Server (RPS).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dmt_sdk::{Credentials, DeviceStatusFilter, DmtClient, DmtResult};
//!
//! #[tokio::main]
//! async fn main() -> DmtResult<()> {
//!     let client = DmtClient::builder()
//!         .mps_url("http://localhost:8181/api/v1")
//!         .credentials(Credentials::new("admin", "G@ppm0ym")?)
//!         .build()?;
//!
//!     // Requests are refused until a token is held
//!     client.authorize().await?;
//!
//!     let devices = client.devices().list(DeviceStatusFilter::Connected).await?;
//!     println!("Found {} connected devices", devices.len());
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod session;
pub mod transport;

// Re-export main client
pub use client::{DmtClient, DmtClientBuilder};
pub use config::{ClientConfig, Credentials, RetryConfig};
pub use error::{DmtError, DmtResult};

// Re-export core types for convenience
pub use dmt_core::{
    ActivationMode, AuditLog, AuditRecord, Device, DeviceGuid, DeviceStats, DeviceStatusFilter,
    Domain, EventLogEntry, PowerAction, PowerActionOutcome, PowerCapabilities, PowerState,
    Profile,
};
