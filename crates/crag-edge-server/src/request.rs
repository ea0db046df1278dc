//! HTTP request conversion for the dispatcher.
//!
//! Turns an axum request into a [`RenderRequest`] without interpreting it:
//! method, URI, every header (order and duplicates kept) and the body.

use axum::http::request::Parts;
use bytes::Bytes;

use crag_edge_common::RenderRequest;

/// Build a [`RenderRequest`] from request parts and a buffered body.
///
/// Header values that are not valid UTF-8 are carried lossily. An empty body
/// becomes `None`.
pub fn from_parts(parts: &Parts, body: Bytes) -> RenderRequest {
    let headers = parts
        .headers
        .iter()
        .map(|(name, value)| {
            let value = value.to_str().map_or_else(
                |_| String::from_utf8_lossy(value.as_bytes()).into_owned(),
                str::to_string,
            );
            (name.to_string(), value)
        })
        .collect();

    RenderRequest {
        method: parts.method.to_string(),
        uri: parts.uri.to_string(),
        headers,
        body: (!body.is_empty()).then(|| body.to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Method, Request};

    fn parts(request: Request<()>) -> Parts {
        request.into_parts().0
    }

    #[test]
    fn test_from_parts() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/zones/7/parking?sort=capacity")
            .header("Content-Type", "application/json")
            .header("X-Request-Id", "123")
            .body(())
            .unwrap();

        let body = Bytes::from(r#"{"capacity": 20}"#);
        let req = from_parts(&parts(request), body);

        assert_eq!(req.method, "POST");
        assert_eq!(req.uri, "/zones/7/parking?sort=capacity");
        assert_eq!(req.path(), "/zones/7/parking");
        assert_eq!(req.headers.len(), 2);
        assert_eq!(req.get_header("content-type"), Some("application/json"));
        assert_eq!(req.body.as_deref(), Some(br#"{"capacity": 20}"#.as_slice()));
    }

    #[test]
    fn test_empty_body_is_none() {
        let request = Request::builder().uri("/").body(()).unwrap();
        let req = from_parts(&parts(request), Bytes::new());

        assert_eq!(req.method, "GET");
        assert!(req.body.is_none());
    }

    #[test]
    fn test_duplicate_headers_kept_in_order() {
        let request = Request::builder()
            .uri("/")
            .header("Cookie", "a=1")
            .header("Cookie", "b=2")
            .body(())
            .unwrap();
        let req = from_parts(&parts(request), Bytes::new());

        assert_eq!(
            req.headers,
            vec![
                ("cookie".to_string(), "a=1".to_string()),
                ("cookie".to_string(), "b=2".to_string()),
            ]
        );
    }

    #[test]
    fn test_non_utf8_header_is_lossy() {
        let value = axum::http::HeaderValue::from_bytes(b"caf\xe9").unwrap();
        let request = Request::builder()
            .uri("/")
            .header("X-Name", value)
            .body(())
            .unwrap();
        let req = from_parts(&parts(request), Bytes::new());

        assert_eq!(req.get_header("x-name"), Some("caf\u{fffd}"));
    }
}
