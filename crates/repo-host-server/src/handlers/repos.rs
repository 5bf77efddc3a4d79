//! POST /create-repo: create a repository owned by the caller.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::{Extension, Json};
use repo_host_core::{CreateRepositoryParams, ResourceGateway};

use super::PathResponse;
use crate::error::AppError;

pub async fn create_repo(
    Extension(gateway): Extension<Arc<ResourceGateway>>,
    payload: Result<Json<CreateRepositoryParams>, JsonRejection>,
) -> Result<Json<PathResponse>, AppError> {
    let Json(params) = payload?;
    let path = gateway.create_repository(params).await?;
    Ok(Json(PathResponse { path }))
}
