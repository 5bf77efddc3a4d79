//! repo-host-server: HTTP surface and operator CLI for the repo host.

pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
