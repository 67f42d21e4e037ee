//! Configuration loading: LLM settings from the environment and the tool
//! endpoint bootstrap file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::llm::LlmSettings;

/// Bootstrap description of tool endpoints, loaded from `endpoints.json`.
///
/// ```json
/// {
///   "toolEndpoints": {
///     "photos": { "url": "http://127.0.0.1:8731/mcp", "builtin": true }
///   }
/// }
/// ```
///
/// Only consulted when the persisted registry is empty; after that the
/// registry's own store is authoritative.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct EndpointsFile {
    #[serde(rename = "toolEndpoints", default)]
    pub tool_endpoints: HashMap<String, EndpointEntry>,
}

/// One endpoint entry in the bootstrap file.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EndpointEntry {
    pub url: String,
    #[serde(default)]
    pub builtin: bool,
}

/// Load the endpoint bootstrap file, expanding `${VAR}` placeholders in URLs.
pub fn load_endpoints_file(path: impl AsRef<Path>) -> anyhow::Result<EndpointsFile> {
    let txt = std::fs::read_to_string(path)?;
    let mut parsed: EndpointsFile = serde_json::from_str(&txt)?;
    for entry in parsed.tool_endpoints.values_mut() {
        entry.url = expand_env_placeholders(&entry.url);
    }
    Ok(parsed)
}

/// Expand "${VAR}" placeholders from the process environment.
/// Missing variables leave the placeholder unchanged.
pub fn expand_env_placeholders(input: &str) -> String {
    let mut out = input.to_string();
    for (k, v) in std::env::vars() {
        let needle = format!("${{{k}}}");
        if out.contains(&needle) {
            out = out.replace(&needle, &v);
        }
    }
    out
}

/// Load `.env` into the process environment, if one exists. Call once at
/// startup, before any settings are read.
pub fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        tracing::debug!("Loaded environment from .env");
    }
}

/// Load LLM connection settings from the environment.
///
/// `LLM_BASE_URL` and `LLM_MODEL` are required; `LLM_API_KEY` is optional
/// (local inference servers typically need none).
pub fn load_llm_settings() -> Result<LlmSettings, String> {
    let base_url = std::env::var("LLM_BASE_URL")
        .map_err(|_| "Missing required env var: LLM_BASE_URL".to_string())?;
    if base_url.trim().is_empty() {
        return Err("LLM_BASE_URL cannot be empty".to_string());
    }

    let model = std::env::var("LLM_MODEL")
        .map_err(|_| "Missing required env var: LLM_MODEL".to_string())?;
    if model.trim().is_empty() {
        return Err("LLM_MODEL cannot be empty".to_string());
    }

    let api_key = std::env::var("LLM_API_KEY")
        .ok()
        .filter(|s| !s.trim().is_empty());

    Ok(LlmSettings {
        base_url,
        api_key,
        model,
    })
}

/// Directory for the file-backed store (`PHOTOPILOT_DATA_DIR`, default `./data`).
#[must_use]
pub fn data_dir() -> PathBuf {
    std::env::var("PHOTOPILOT_DATA_DIR").map_or_else(|_| PathBuf::from("data"), PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_endpoints_file() {
        let json = r#"{
            "toolEndpoints": {
                "photos": { "url": "http://127.0.0.1:8731/mcp", "builtin": true },
                "faces": { "url": "http://127.0.0.1:9000/mcp" }
            }
        }"#;
        let parsed: EndpointsFile = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.tool_endpoints.len(), 2);
        assert!(parsed.tool_endpoints["photos"].builtin);
        assert!(!parsed.tool_endpoints["faces"].builtin);
    }

    #[test]
    fn expands_known_placeholders_only() {
        // SAFETY: test-local variable, nothing else reads it concurrently.
        unsafe { std::env::set_var("PHOTOPILOT_TEST_HOST", "localhost") };
        assert_eq!(
            expand_env_placeholders("http://${PHOTOPILOT_TEST_HOST}:1234"),
            "http://localhost:1234"
        );
        assert_eq!(
            expand_env_placeholders("http://${PHOTOPILOT_NO_SUCH_VAR}/x"),
            "http://${PHOTOPILOT_NO_SUCH_VAR}/x"
        );
    }
}
