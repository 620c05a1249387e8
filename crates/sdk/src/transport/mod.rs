//! Transport layer for the DMT SDK.

pub mod http;

pub use http::HttpTransport;
