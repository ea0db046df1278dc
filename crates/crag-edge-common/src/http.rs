//! Request and response values exchanged with a render handler.
//!
//! These are plain data: the HTTP layer builds a [`RenderRequest`] from the
//! inbound request and turns the returned [`RenderResponse`] back into a
//! wire response. The same types are the JSON documents the SSR bundle reads
//! on stdin and writes on stdout.

use serde::{Deserialize, Serialize};

/// An inbound request, as handed to the renderer.
///
/// Header order and repeated headers are kept exactly as received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderRequest {
    /// HTTP method (GET, POST, etc.)
    pub method: String,
    /// Request URI including the query string
    pub uri: String,
    /// Request headers as name/value pairs
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    /// Optional request body
    #[serde(
        default,
        with = "wire_body::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub body: Option<Vec<u8>>,
}

impl RenderRequest {
    /// Create a request without headers or body.
    pub fn new(method: &str, uri: &str) -> Self {
        Self {
            method: method.to_string(),
            uri: uri.to_string(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Add a header.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Attach a body.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Get a header value by name (case-insensitive).
    pub fn get_header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// The path component of the URI, without the query string.
    pub fn path(&self) -> &str {
        let end = self.uri.find(['?', '#']).unwrap_or(self.uri.len());
        &self.uri[..end]
    }
}

/// A rendered response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers as name/value pairs
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    /// Response body
    #[serde(default, with = "wire_body")]
    pub body: Vec<u8>,
}

impl RenderResponse {
    /// Create a rendered HTML document.
    pub fn html(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: vec![(
                "content-type".to_string(),
                "text/html; charset=utf-8".to_string(),
            )],
            body: body.as_bytes().to_vec(),
        }
    }

    /// Create a simple text response.
    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: vec![(
                "content-type".to_string(),
                "text/plain; charset=utf-8".to_string(),
            )],
            body: body.as_bytes().to_vec(),
        }
    }

    /// Create a JSON response.
    pub fn json(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: body.as_bytes().to_vec(),
        }
    }

    /// Create an error response with JSON body.
    pub fn error(status: u16, message: &str) -> Self {
        let body = serde_json::json!({
            "error": message
        })
        .to_string();
        Self::json(status, &body)
    }

    /// Add a header to the response.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Get a header value by name (case-insensitive).
    pub fn get_header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Body encoding on the bundle's stdio.
///
/// UTF-8 bodies travel as a JSON string, anything else as an array of byte
/// values. Both forms are accepted when decoding.
mod wire_body {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    struct Encoded<'a>(&'a [u8]);

    impl Serialize for Encoded<'_> {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            match std::str::from_utf8(self.0) {
                Ok(text) => serializer.serialize_str(text),
                Err(_) => serializer.collect_seq(self.0),
            }
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Decoded {
        Text(String),
        Bytes(Vec<u8>),
    }

    impl Decoded {
        fn into_bytes(self) -> Vec<u8> {
            match self {
                Self::Text(text) => text.into_bytes(),
                Self::Bytes(bytes) => bytes,
            }
        }
    }

    pub fn serialize<S: Serializer>(body: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        Encoded(body).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        Decoded::deserialize(deserializer).map(Decoded::into_bytes)
    }

    pub mod optional {
        use super::{Decoded, Encoded};
        use serde::{Deserialize, Deserializer, Serialize, Serializer};

        #[allow(clippy::ref_option)]
        pub fn serialize<S: Serializer>(
            body: &Option<Vec<u8>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            body.as_deref().map(Encoded).serialize(serializer)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Vec<u8>>, D::Error> {
            Ok(Option::<Decoded>::deserialize(deserializer)?.map(Decoded::into_bytes))
        }
    }
}
