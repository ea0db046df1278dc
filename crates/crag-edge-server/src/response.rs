//! HTTP response conversion from rendered responses.

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Response, StatusCode};
use tracing::warn;

use crag_edge_common::RenderResponse;

/// Conversion of a [`RenderResponse`] into an axum response.
pub trait IntoAxumResponse {
    /// Convert to an axum response.
    ///
    /// Headers the HTTP stack cannot represent are dropped; an out of range
    /// status becomes 500.
    fn into_axum_response(self) -> Response<Body>;
}

impl IntoAxumResponse for RenderResponse {
    fn into_axum_response(self) -> Response<Body> {
        let status = StatusCode::from_u16(self.status).unwrap_or_else(|_| {
            warn!(status = self.status, "Invalid status code in rendered response");
            StatusCode::INTERNAL_SERVER_ERROR
        });

        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = status;

        let headers = response.headers_mut();
        for (name, value) in &self.headers {
            match (
                HeaderName::try_from(name.as_str()),
                HeaderValue::try_from(value.as_str()),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.append(name, value);
                }
                _ => warn!(header = %name, "Dropping invalid header from rendered response"),
            }
        }

        response
    }
}
