//! sw_fetch tool implementation.
//!
//! Hands one intercepted request to the worker and returns what it answered,
//! or `{"intercepted": false}` when the host should use its default network
//! behavior. Bodies that are not valid UTF-8 are returned base64-encoded.

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use menucache_client::{Interception, OfflineProxy, ResponseSource};
use menucache_core::{Error, ProxyRequest, RoutingClass};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

use super::json_result;

/// Parameters for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Absolute URL of the intercepted request.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Request headers; names are case-insensitive.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_method() -> String {
    "GET".into()
}

/// How `body` is encoded in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyEncoding {
    Utf8,
    Base64,
}

/// Body as text when it is valid UTF-8, otherwise base64 of the raw bytes.
fn encode_body(body: Vec<u8>) -> (String, BodyEncoding) {
    match String::from_utf8(body) {
        Ok(text) => (text, BodyEncoding::Utf8),
        Err(e) => (STANDARD.encode(e.into_bytes()), BodyEncoding::Base64),
    }
}

/// Output from the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwFetchOutput {
    pub intercepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<RoutingClass>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ResponseSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<BodyEncoding>,
    /// When the served snapshot was stored, if it came from a partition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stored_at: Option<String>,
}

impl SwFetchOutput {
    fn pass_through() -> Self {
        Self {
            intercepted: false,
            class: None,
            source: None,
            status: None,
            url: None,
            headers: BTreeMap::new(),
            body: None,
            encoding: None,
            stored_at: None,
        }
    }
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(proxy: &OfflineProxy, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }
    if params.method.trim().is_empty() {
        return Err(Error::InvalidInput("method cannot be empty".into()).into());
    }

    let url = Url::parse(params.url.trim()).map_err(|e| Error::InvalidUrl(format!("{}: {e}", params.url)))?;
    let request = params
        .headers
        .iter()
        .fold(ProxyRequest::new(params.method.trim().to_ascii_uppercase(), url), |req, (name, value)| {
            req.with_header(name, value.as_str())
        });

    let output = match proxy.fetch(&request).await? {
        Interception::PassThrough => SwFetchOutput::pass_through(),
        Interception::Respond(served) => {
            let (body, encoding) = encode_body(served.response.body);
            SwFetchOutput {
                intercepted: true,
                class: Some(served.class),
                source: Some(served.source),
                status: Some(served.response.status),
                url: Some(served.response.url),
                headers: served.response.headers,
                body: Some(body),
                encoding: Some(encoding),
                stored_at: served.response.stored_at,
            }
        }
    };

    json_result(&output)
}
