//! Directory handlers.
//!
//! POST /create-directory : JSON body
//! GET  /list-directories : query string

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::Query;
use axum::{Extension, Json};
use repo_host_core::{CreateDirectoryParams, ListDirectoriesParams, ResourceGateway};

use super::{ListResponse, PathResponse};
use crate::error::AppError;

pub async fn create_directory(
    Extension(gateway): Extension<Arc<ResourceGateway>>,
    payload: Result<Json<CreateDirectoryParams>, JsonRejection>,
) -> Result<Json<PathResponse>, AppError> {
    let Json(params) = payload?;
    let path = gateway.create_directory(params).await?;
    Ok(Json(PathResponse { path }))
}

pub async fn list_directories(
    Extension(gateway): Extension<Arc<ResourceGateway>>,
    query: Result<Query<ListDirectoriesParams>, QueryRejection>,
) -> Result<Json<ListResponse>, AppError> {
    let Query(params) = query?;
    let subdirectories = gateway.list_directories(params).await?;
    Ok(Json(ListResponse { subdirectories }))
}
