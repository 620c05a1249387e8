// MCP (Model Context Protocol) server for the Device Management Toolkit
// Exposes MPS/RPS device operations as tools to agent clients over stdio

pub mod auth;
pub mod config;
pub mod protocol;
pub mod server;
pub mod tools;

pub use auth::AuthGate;
pub use server::McpServer;
