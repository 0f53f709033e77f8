//! Text normalizer: ask a local Ollama model to restructure OCR text as
//! markdown.
//!
//! One request per call to `POST {endpoint}/api/generate` with streaming off.
//! No retries: the step is best-effort, and [`normalize`] hands failures back
//! as readable strings so a caller can display whatever it gets.

use crate::config::NormalizerConfig;
use crate::error::NormalizationError;
use crate::pipeline::postprocess::clean_markdown;
use crate::prompts::cleanup_prompt;
use reqwest::Url;
use serde::Serialize;
use std::net::IpAddr;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

/// Normalize `text`, returning the model's markdown or an error description.
///
/// Never fails; see [`try_normalize`] for the typed error. The error strings
/// are the `Display` text of [`NormalizationError`], e.g.
/// `"Error calling Ollama API: 500 - model not found"`.
pub async fn normalize(text: &str, config: &NormalizerConfig) -> String {
    match try_normalize(text, config).await {
        Ok(markdown) => markdown,
        Err(e) => {
            warn!("Text normalization failed: {}", e);
            e.to_string()
        }
    }
}

/// Normalize `text`, returning the model's markdown.
///
/// Empty input is sent like any other text.
pub async fn try_normalize(
    text: &str,
    config: &NormalizerConfig,
) -> Result<String, NormalizationError> {
    let url = format!("{}/api/generate", config.endpoint.trim_end_matches('/'));
    let request = GenerateRequest {
        model: &config.model,
        prompt: cleanup_prompt(text),
        stream: false,
        options: GenerateOptions {
            temperature: config.temperature,
        },
    };

    let mut builder = reqwest::Client::builder().timeout(Duration::from_secs(config.timeout_secs));
    if is_loopback(&config.endpoint) {
        builder = builder.no_proxy();
    }
    let client = builder
        .build()
        .map_err(|e| NormalizationError::Transport(e.to_string()))?;

    info!(
        "Normalizing {} chars with model '{}' at {}",
        text.len(),
        config.model,
        url
    );
    let start = Instant::now();

    let response = client
        .post(&url)
        .json(&request)
        .send()
        .await
        .map_err(|e| transport_error(e, config.timeout_secs))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| transport_error(e, config.timeout_secs))?;

    if !status.is_success() {
        return Err(NormalizationError::Http {
            status: status.as_u16(),
            body,
        });
    }

    let markdown = extract_response_field(&body)
        .ok_or(NormalizationError::MalformedResponse { body })?;

    debug!(
        "Normalizer answered {} chars in {}ms",
        markdown.len(),
        start.elapsed().as_millis()
    );

    if config.clean_output {
        Ok(clean_markdown(&markdown))
    } else {
        Ok(markdown)
    }
}

fn transport_error(e: reqwest::Error, timeout_secs: u64) -> NormalizationError {
    if e.is_timeout() {
        NormalizationError::Timeout { secs: timeout_secs }
    } else {
        NormalizationError::Transport(e.to_string())
    }
}

/// Read the `response` string from an Ollama reply, matching the key
/// case-insensitively.
fn extract_response_field(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .as_object()?
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case("response"))
        .and_then(|(_, v)| v.as_str())
        .map(str::to_string)
}

/// Whether the endpoint host is `localhost` or a loopback address.
fn is_loopback(endpoint: &str) -> bool {
    let Ok(url) = Url::parse(endpoint) else {
        return false;
    };
    match url.host_str() {
        Some(host) if host.eq_ignore_ascii_case("localhost") => true,
        Some(host) => host
            .trim_start_matches('[')
            .trim_end_matches(']')
            .parse::<IpAddr>()
            .map(|ip| ip.is_loopback())
            .unwrap_or(false),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_field_is_case_insensitive() {
        assert_eq!(
            extract_response_field(r##"{"model":"m","response":"# Hi","done":true}"##).as_deref(),
            Some("# Hi")
        );
        assert_eq!(
            extract_response_field(r#"{"Response":"x"}"#).as_deref(),
            Some("x")
        );
    }

    #[test]
    fn missing_or_non_string_response_is_none() {
        assert_eq!(extract_response_field(r#"{"done":true}"#), None);
        assert_eq!(extract_response_field(r#"{"response":null}"#), None);
        assert_eq!(extract_response_field("not json"), None);
        assert_eq!(extract_response_field(r#"["response"]"#), None);
    }

    #[test]
    fn empty_response_string_is_kept() {
        assert_eq!(extract_response_field(r#"{"response":""}"#).as_deref(), Some(""));
    }

    #[test]
    fn loopback_detection() {
        assert!(is_loopback("http://localhost:11434"));
        assert!(is_loopback("http://127.0.0.1:11434/"));
        assert!(is_loopback("http://[::1]:11434"));
        assert!(!is_loopback("http://ollama.internal:11434"));
        assert!(!is_loopback("http://10.0.0.5:11434"));
        assert!(!is_loopback("not a url"));
    }

    #[test]
    fn request_body_shape() {
        let req = GenerateRequest {
            model: "llama3.2:latest",
            prompt: cleanup_prompt("abc"),
            stream: false,
            options: GenerateOptions { temperature: 0.1 },
        };
        let json: serde_json::Value = serde_json::to_value(&req).unwrap();
        assert_eq!(json["model"], "llama3.2:latest");
        assert_eq!(json["stream"], false);
        assert!(json["prompt"].as_str().unwrap().contains("OCR Output:\nabc"));
        assert!((json["options"]["temperature"].as_f64().unwrap() - 0.1).abs() < 1e-6);
    }
}
