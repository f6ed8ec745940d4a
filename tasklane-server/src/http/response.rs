//! Success envelopes
//!
//! `{message, data, success}`, `{message, success}` and the paginated
//! `{message, data, meta, success}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::models::{Page, PaginationMeta};

#[derive(Debug, Serialize)]
pub struct DataEnvelope<T> {
    pub message: &'static str,
    pub data: T,
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct MessageEnvelope {
    pub message: &'static str,
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct PageEnvelope<T> {
    pub message: &'static str,
    pub data: Vec<T>,
    pub meta: PaginationMeta,
    pub success: bool,
}

pub fn with_data<T: Serialize>(status: StatusCode, message: &'static str, data: T) -> Response {
    (
        status,
        Json(DataEnvelope {
            message,
            data,
            success: true,
        }),
    )
        .into_response()
}

pub fn message_only(status: StatusCode, message: &'static str) -> Response {
    (
        status,
        Json(MessageEnvelope {
            message,
            success: true,
        }),
    )
        .into_response()
}

/// 200 with one page of records.
pub fn paginated<T: Serialize>(message: &'static str, page: Page<T>) -> Response {
    Json(PageEnvelope {
        message,
        data: page.items,
        meta: page.meta,
        success: true,
    })
    .into_response()
}
