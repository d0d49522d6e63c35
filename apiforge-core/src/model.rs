//! Domain model types for apiforge.
//!
//! This module defines the identifiers and per-call request description
//! shared by every vendor module:
//! - [`VendorId`] - Identifier for a vendor module (e.g., "slack", "sharepoint")
//! - [`CredentialId`] - Identifier of a persisted credential record
//! - [`RequestSpec`] - One outbound HTTP call, built per operation
//! - [`Authorization`] - How a request authenticates against the vendor

use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::secret::Secret;

/// Identifier for a vendor module (e.g., "slack", "sharepoint", "terminus").
///
/// Vendor IDs are normalized to lowercase.
///
/// # Examples
///
/// ```
/// use apiforge_core::VendorId;
///
/// let slack = VendorId::new("Slack");
/// assert_eq!(slack.as_str(), "slack");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VendorId(String);

impl VendorId {
    /// Create a new vendor ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().to_lowercase())
    }

    /// Get the vendor ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VendorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for VendorId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for VendorId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Identifier of a persisted credential record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialId(String);

impl CredentialId {
    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wrap an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CredentialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CredentialId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// How an outbound request authenticates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
    /// No credentials attached.
    None,

    /// `Authorization: {token_type} {token}`.
    Token { token_type: String, token: Secret },

    /// HTTP Basic credentials, used for client authentication at token
    /// endpoints.
    Basic { username: String, password: Secret },

    /// An API key sent in a vendor-specific header.
    ApiKey { header: String, key: Secret },
}

/// Request payload.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(serde_json::Value),
    Form(Vec<(String, String)>),
}

/// Characters that are escaped when a path template is placed on the wire.
///
/// Everything else in the template is sent exactly as written, including
/// `$`, `,`, `@`, `*` and `=` inside literal query strings.
const PATH_ESCAPES: &[(char, &str)] = &[('\'', "%27"), ('|', "%7C"), ('\\', "%5C"), ('^', "%5E")];

/// One outbound HTTP call.
///
/// Built per operation by a vendor facade and handed to the
/// [`RequestExecutor`](crate::http::RequestExecutor).
#[derive(Debug, Clone)]
pub struct RequestSpec {
    /// HTTP method.
    pub method: Method,

    /// Path template relative to the vendor base URL. May carry a literal
    /// query string (`/sites?search=*`).
    pub path: String,

    /// Extra query parameters, form-encoded and appended after the template.
    pub query: Vec<(String, String)>,

    /// Request body.
    pub body: Option<RequestBody>,

    /// Credentials to attach.
    pub authorization: Authorization,

    /// Opaque absolute URL of the next page. When set, `path` and `query`
    /// are ignored.
    pub next_page_url: Option<String>,
}

impl RequestSpec {
    /// Create a request for the given method and path template.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            authorization: Authorization::None,
            next_page_url: None,
        }
    }

    /// Create a GET request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// Create a POST request.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Add a query parameter.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Set a JSON body.
    pub fn with_json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    /// Set a form-encoded body.
    pub fn with_form(mut self, fields: Vec<(String, String)>) -> Self {
        self.body = Some(RequestBody::Form(fields));
        self
    }

    /// Attach credentials.
    pub fn with_authorization(mut self, authorization: Authorization) -> Self {
        self.authorization = authorization;
        self
    }

    /// Set the next-page cursor URL.
    pub fn with_next_page_url(mut self, url: Option<String>) -> Self {
        self.next_page_url = url;
        self
    }

    /// Resolve the absolute URL this request goes to.
    ///
    /// The next-page URL wins verbatim. Otherwise the path template is
    /// appended to `base_url` with only [`PATH_ESCAPES`] applied, followed by
    /// any extra query parameters.
    pub fn resolve_url(&self, base_url: &str) -> String {
        if let Some(next) = &self.next_page_url {
            return next.clone();
        }

        let mut target = String::with_capacity(base_url.len() + self.path.len());
        target.push_str(base_url.trim_end_matches('/'));
        if !self.path.is_empty() && !self.path.starts_with('/') {
            target.push('/');
        }
        for c in self.path.chars() {
            match PATH_ESCAPES.iter().find(|(raw, _)| *raw == c) {
                Some((_, escaped)) => target.push_str(escaped),
                None => target.push(c),
            }
        }

        if !self.query.is_empty() {
            let encoded = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(self.query.iter())
                .finish();
            target.push(if self.path.contains('?') { '&' } else { '?' });
            target.push_str(&encoded);
        }

        target
    }
}
