//! `http_request` handler (spec.md §4.3).

use aiq_core::{CancelToken, ErrorType, ToolResult};
use async_trait::async_trait;
use aiq_tools::ToolHandler;

const BODY_SNIPPET_CAP: usize = 16_384;

pub struct HttpHandler {
    client: reqwest::Client,
}

impl Default for HttpHandler {
    fn default() -> Self {
        Self { client: reqwest::Client::new() }
    }
}

#[async_trait]
impl ToolHandler for HttpHandler {
    async fn call(&self, args: &serde_json::Map<String, serde_json::Value>, _cancel: &CancelToken) -> anyhow::Result<ToolResult> {
        let Some(method) = args.get("method").and_then(|v| v.as_str()) else {
            return Ok(ToolResult::error(ErrorType::Unknown, "http_request requires a \"method\" argument"));
        };
        let Some(url) = args.get("url").and_then(|v| v.as_str()) else {
            return Ok(ToolResult::error(ErrorType::Unknown, "http_request requires a \"url\" argument"));
        };

        let method = match reqwest::Method::from_bytes(method.as_bytes()) {
            Ok(method) => method,
            Err(_) => return Ok(ToolResult::error(ErrorType::Unknown, format!("unsupported HTTP method: {method}"))),
        };

        let mut builder = self.client.request(method, url);

        if let Some(headers) = args.get("headers").and_then(|v| v.as_object()) {
            for (name, value) in headers {
                if let Some(value) = value.as_str() {
                    builder = builder.header(name, value);
                }
            }
        }
        if let Some(body) = args.get("body").and_then(|v| v.as_str()) {
            builder = builder.body(body.to_string());
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(err) => {
                let extracted = crate::error_extraction::extract(&err.to_string());
                return Ok(ToolResult::Error {
                    error: err.to_string(),
                    error_code: None,
                    error_type: extracted.error_type,
                    affected_resources: Vec::new(),
                    dependencies: Vec::new(),
                    suggested_actions: Vec::new(),
                });
            }
        };

        let status_code = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.to_string(), v.to_string())))
            .collect::<std::collections::BTreeMap<_, _>>();

        let body = response.text().await.unwrap_or_default();
        let body_snippet = truncate_chars(&body, BODY_SNIPPET_CAP);

        Ok(ToolResult::ok(
            serde_json::json!({"status_code": status_code, "headers": headers, "body_snippet": body_snippet}),
            false,
        ))
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut truncated: String = s.chars().take(max).collect();
    truncated.push('…');
    truncated
}
