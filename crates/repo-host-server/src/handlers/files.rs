//! File handlers.
//!
//! GET /download-file: query string, replies with the raw bytes
//! PUT /upload-file  : query string plus the raw request body

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, QueryRejection};
use axum::extract::Query;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use repo_host_core::{DownloadFileParams, ResourceGateway, UploadFileParams};

use super::PathResponse;
use crate::error::AppError;

/// `attachment; filename=".."` with characters that would break the quoted
/// string replaced.
fn content_disposition(file_name: &str) -> HeaderValue {
    let safe: String = file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();
    HeaderValue::from_str(&format!("attachment; filename=\"{safe}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

pub async fn download_file(
    Extension(gateway): Extension<Arc<ResourceGateway>>,
    query: Result<Query<DownloadFileParams>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(params) = query?;
    let download = gateway.download_file(params).await?;

    let content_type = HeaderValue::from_str(&download.contents.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (
                header::CONTENT_DISPOSITION,
                content_disposition(&download.file_name),
            ),
        ],
        download.contents.bytes,
    )
        .into_response())
}

pub async fn upload_file(
    Extension(gateway): Extension<Arc<ResourceGateway>>,
    query: Result<Query<UploadFileParams>, QueryRejection>,
    body: Result<Bytes, BytesRejection>,
) -> Result<(StatusCode, Json<PathResponse>), AppError> {
    let Query(params) = query?;
    let body = body?;
    let path = gateway.upload_file(params, &body).await?;
    Ok((StatusCode::CREATED, Json(PathResponse { path })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disposition_quotes_plain_names() {
        assert_eq!(
            content_disposition("report.pdf"),
            "attachment; filename=\"report.pdf\""
        );
    }

    #[test]
    fn disposition_replaces_unsafe_characters() {
        assert_eq!(
            content_disposition("a\"b\r\nc.txt"),
            "attachment; filename=\"a_b__c.txt\""
        );
        assert_eq!(
            content_disposition("résumé.pdf"),
            "attachment; filename=\"r_sum_.pdf\""
        );
    }
}
