//! Normalizer tests against a throwaway HTTP server on 127.0.0.1.
//!
//! The server answers exactly one request with a canned status and body and
//! hands the parsed request back to the test for inspection.

use ocr2md::{normalize, try_normalize, NormalizationError, NormalizerConfig};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

struct CapturedRequest {
    request_line: String,
    body: Value,
}

/// Serve one canned response. Returns the base URL and a receiver for the
/// request the server saw.
async fn serve_once(status: u16, body: &str) -> (String, oneshot::Receiver<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let body = body.to_string();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let (head, raw_body) = read_request(&mut socket).await;

        let response = format!(
            "HTTP/1.1 {status} {reason}\r\ncontent-type: application/json\r\ncontent-length: {len}\r\nconnection: close\r\n\r\n{body}",
            reason = if status == 200 { "OK" } else { "Error" },
            len = body.len(),
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();

        let _ = tx.send(CapturedRequest {
            request_line: head.lines().next().unwrap_or_default().to_string(),
            body: serde_json::from_slice(&raw_body).unwrap_or(Value::Null),
        });
    });

    (format!("http://{addr}"), rx)
}

/// Read headers and a `content-length` body.
async fn read_request(socket: &mut tokio::net::TcpStream) -> (String, Vec<u8>) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = socket.read(&mut chunk).await.unwrap();
        assert!(n > 0, "client closed before sending headers");
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);

    let mut body = buf[header_end..].to_vec();
    while body.len() < content_length {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }
    (head, body)
}

fn config_for(endpoint: &str) -> NormalizerConfig {
    NormalizerConfig::builder()
        .endpoint(endpoint)
        .timeout_secs(5)
        .build()
        .unwrap()
}

#[tokio::test]
async fn returns_the_model_response() {
    let body = r##"{"model":"llama3.2:latest","response":"# Invoice\n- Total: 42","done":true}"##;
    let (endpoint, seen) = serve_once(200, body).await;

    let markdown = normalize("Page 1:\nInvoice Total 42", &config_for(&endpoint)).await;
    assert_eq!(markdown, "# Invoice\n- Total: 42");

    let request = seen.await.unwrap();
    assert_eq!(request.request_line, "POST /api/generate HTTP/1.1");
    assert_eq!(request.body["model"], "llama3.2:latest");
    assert_eq!(request.body["stream"], false);
    let prompt = request.body["prompt"].as_str().unwrap();
    assert!(prompt.contains("OCR Output:\nPage 1:\nInvoice Total 42\n"));
}

#[tokio::test]
async fn response_key_is_matched_case_insensitively() {
    let (endpoint, _seen) = serve_once(200, r#"{"Response":"ok"}"#).await;
    let markdown = try_normalize("x", &config_for(&endpoint)).await.unwrap();
    assert_eq!(markdown, "ok");
}

#[tokio::test]
async fn trailing_slash_on_endpoint_is_tolerated() {
    let (endpoint, seen) = serve_once(200, r#"{"response":"fine"}"#).await;
    let markdown = normalize("x", &config_for(&format!("{endpoint}/"))).await;
    assert_eq!(markdown, "fine");
    assert_eq!(seen.await.unwrap().request_line, "POST /api/generate HTTP/1.1");
}

#[tokio::test]
async fn empty_input_sends_a_well_formed_request() {
    let (endpoint, seen) = serve_once(200, r#"{"response":""}"#).await;

    let markdown = normalize("", &config_for(&endpoint)).await;
    assert_eq!(markdown, "");

    let request = seen.await.unwrap();
    assert_eq!(request.body["stream"], false);
    let temperature = request.body["options"]["temperature"].as_f64().unwrap();
    assert!((temperature - 0.1).abs() < 1e-6);
    assert!(request.body["prompt"].as_str().unwrap().contains("OCR Output:\n\n"));
}

#[tokio::test]
async fn http_error_becomes_error_string() {
    let body = r#"{"error":"model 'llama3.2:latest' not found"}"#;
    let (endpoint, _seen) = serve_once(500, body).await;

    let text = normalize("x", &config_for(&endpoint)).await;
    assert!(text.starts_with("Error calling Ollama API: 500"), "{text}");
    assert!(text.contains("not found"), "{text}");
}

#[tokio::test]
async fn http_error_is_typed_in_try_normalize() {
    let (endpoint, _seen) = serve_once(404, "no such route").await;
    let err = try_normalize("x", &config_for(&endpoint)).await.unwrap_err();
    assert_eq!(
        err,
        NormalizationError::Http {
            status: 404,
            body: "no such route".into()
        }
    );
}

#[tokio::test]
async fn body_without_response_is_malformed() {
    let body = r#"{"done":true}"#;
    let (endpoint, _seen) = serve_once(200, body).await;

    let text = normalize("x", &config_for(&endpoint)).await;
    assert_eq!(text, format!("Unexpected response format:\n{body}"));
}

#[tokio::test]
async fn non_json_body_is_malformed() {
    let (endpoint, _seen) = serve_once(200, "<html>proxy login</html>").await;
    let err = try_normalize("x", &config_for(&endpoint)).await.unwrap_err();
    assert!(matches!(err, NormalizationError::MalformedResponse { .. }));
}

#[tokio::test]
async fn clean_output_tidies_the_markdown() {
    let body = r#"{"response":"```markdown\n# Title\n\n\n\nBody   \n```"}"#;
    let (endpoint, _seen) = serve_once(200, body).await;
    let config = NormalizerConfig::builder()
        .endpoint(&endpoint)
        .clean_output(true)
        .build()
        .unwrap();

    let markdown = normalize("x", &config).await;
    assert_eq!(markdown, "# Title\n\nBody\n");
}

#[tokio::test]
async fn unreachable_endpoint_becomes_error_string() {
    // Bind then drop to get a port nothing listens on.
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };

    let text = normalize("x", &config_for(&format!("http://127.0.0.1:{port}"))).await;
    assert!(text.starts_with("Exception during AI cleanup:"), "{text}");
}

#[tokio::test]
async fn slow_endpoint_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        // Accept and never answer.
        let (socket, _) = listener.accept().await.unwrap();
        tokio::time::sleep(std::time::Duration::from_secs(10)).await;
        drop(socket);
    });

    let config = NormalizerConfig::builder()
        .endpoint(format!("http://{addr}"))
        .timeout_secs(1)
        .build()
        .unwrap();

    let err = try_normalize("x", &config).await.unwrap_err();
    assert_eq!(err, NormalizationError::Timeout { secs: 1 });
    assert_eq!(err.to_string(), "Text normalization timed out after 1s");
    server.abort();
}
