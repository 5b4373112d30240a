//! Request extractors whose rejections render as [`ApiError`]
//!
//! axum's own `Json`, `Path` and `Query` reject with a plain-text body (422
//! for a JSON body that does not fit the type). These wrappers turn every
//! rejection into a 400 with the usual JSON error envelope.

use axum::extract::{FromRequest, FromRequestParts};

use crate::ApiError;

/// JSON request body
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Path parameters
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

/// Query string
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);
