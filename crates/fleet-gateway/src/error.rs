//! HTTP surface for the workspace's shared error taxonomy.
//!
//! Every sibling crate's error enum already converts `Into<FleetError>`;
//! `ApiError` is the one place that knows how to turn a `FleetError` into
//! an axum [`Response`], so handlers just propagate with `?`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use fleet_types::FleetError;

use crate::json::CamelJson;

pub struct ApiError(pub FleetError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, CamelJson(self.0.to_body())).into_response()
    }
}

impl<E: Into<FleetError>> From<E> for ApiError {
    fn from(err: E) -> Self {
        ApiError(err.into())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
