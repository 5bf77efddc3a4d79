//! Request handlers, one module per resource.
//!
//! Each handler extracts wire parameters, hands them to the
//! [`ResourceGateway`](repo_host_core::ResourceGateway) and shapes the reply.

pub mod directories;
pub mod files;
pub mod health;
pub mod repos;

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct PathResponse {
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub subdirectories: Vec<String>,
}
