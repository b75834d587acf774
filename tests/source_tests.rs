mod common;

use common::*;
use octofhir_validation_support::*;
use serde_json::json;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Serve one HTTP response on a local port; the raw request text is sent
/// back through the returned channel.
async fn serve_once(
    status: &'static str,
    body: String,
    delay: Duration,
) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    let (request_tx, request_rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buffer = vec![0u8; 8192];
        let read = socket.read(&mut buffer).await.unwrap_or(0);
        let _ = request_tx.send(String::from_utf8_lossy(&buffer[..read]).into_owned());

        tokio::time::sleep(delay).await;
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: application/fhir+json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let _ = socket.write_all(response.as_bytes()).await;
        let _ = socket.shutdown().await;
    });

    (
        format!("http://{address}/fhir/StructureDefinition-HcxClaim.json"),
        request_rx,
    )
}

#[tokio::test]
async fn test_http_source_loads_definition() {
    let (location, request) =
        serve_once("200 OK", custom_claim_profile().to_string(), Duration::ZERO).await;
    let source = HttpDefinitionSource::new(Duration::from_secs(5)).unwrap();

    let definition = source.load(&location).await.unwrap();
    assert_eq!(definition.url, CUSTOM_CLAIM_URL);
    assert_eq!(definition.type_name, "Claim");

    let request = request.await.unwrap().to_lowercase();
    assert!(request.starts_with("get /fhir/structuredefinition-hcxclaim.json"));
    assert!(request.contains("accept: application/fhir+json"));
}

#[tokio::test]
async fn test_http_error_status_is_fetch_error() {
    let (location, _request) =
        serve_once("404 Not Found", "{}".to_string(), Duration::ZERO).await;
    let source = HttpDefinitionSource::new(Duration::from_secs(5)).unwrap();

    let err = source.load(&location).await.unwrap_err();
    assert!(err.is_fetch());
    assert_eq!(err.location(), Some(location.as_str()));
    assert!(err.to_string().contains("404"));
}

#[tokio::test]
async fn test_http_timeout_is_fetch_error() {
    let (location, _request) = serve_once(
        "200 OK",
        custom_claim_profile().to_string(),
        Duration::from_secs(5),
    )
    .await;
    let source = HttpDefinitionSource::new(Duration::from_millis(100)).unwrap();

    let err = source.load(&location).await.unwrap_err();
    assert!(err.is_fetch());
    assert!(err.to_string().contains("timed out after 100 ms"));
}

#[tokio::test]
async fn test_unreachable_host_is_fetch_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);

    let source = HttpDefinitionSource::new(Duration::from_secs(5)).unwrap();
    let err = source
        .load(&format!("http://{address}/StructureDefinition-Claim.json"))
        .await
        .unwrap_err();
    assert!(err.is_fetch());
}

#[tokio::test]
async fn test_http_payload_that_is_not_json_is_parse_error() {
    let (location, _request) =
        serve_once("200 OK", "<html>gone</html>".to_string(), Duration::ZERO).await;
    let source = HttpDefinitionSource::new(Duration::from_secs(5)).unwrap();

    let err = source.load(&location).await.unwrap_err();
    assert!(err.is_parse());
}

#[tokio::test]
async fn test_file_source_loads_local_definitions() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("claim.json"),
        serde_json::to_vec(&custom_claim_profile()).unwrap(),
    )
    .unwrap();

    let absolute = dir.path().join("claim.json").display().to_string();
    let definition = FileDefinitionSource::new().load(&absolute).await.unwrap();
    assert_eq!(definition.url, CUSTOM_CLAIM_URL);

    let rooted = FileDefinitionSource::with_root(dir.path());
    assert_eq!(rooted.load("claim.json").await.unwrap().url, CUSTOM_CLAIM_URL);

    let err = rooted.load("missing.json").await.unwrap_err();
    assert!(err.is_fetch());
}

#[tokio::test]
async fn test_malformed_local_payloads_are_parse_errors() {
    let dir = tempfile::tempdir().unwrap();
    let source = FileDefinitionSource::with_root(dir.path());

    std::fs::write(dir.path().join("broken.json"), b"{\"resourceType\": ").unwrap();
    assert!(source.load("broken.json").await.unwrap_err().is_parse());

    std::fs::write(
        dir.path().join("valueset.json"),
        serde_json::to_vec(&json!({"resourceType": "ValueSet", "url": "http://example.org/vs"})).unwrap(),
    )
    .unwrap();
    assert!(source.load("valueset.json").await.unwrap_err().is_parse());

    let mut no_url = custom_claim_profile();
    no_url.as_object_mut().unwrap().remove("url");
    std::fs::write(dir.path().join("no-url.json"), serde_json::to_vec(&no_url).unwrap()).unwrap();
    assert!(source.load("no-url.json").await.unwrap_err().is_parse());
}

#[tokio::test]
async fn test_location_source_routes_by_scheme() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("claim.json");
    std::fs::write(&path, serde_json::to_vec(&custom_claim_profile()).unwrap()).unwrap();
    let (remote, _request) =
        serve_once("200 OK", custom_claim_profile().to_string(), Duration::ZERO).await;

    let source = LocationDefinitionSource::new(Duration::from_secs(5)).unwrap();
    assert_eq!(source.load(&path.display().to_string()).await.unwrap().url, CUSTOM_CLAIM_URL);
    assert_eq!(source.load(&remote).await.unwrap().url, CUSTOM_CLAIM_URL);

    let err = source.load("ftp://example.org/claim.json").await.unwrap_err();
    assert!(err.is_fetch());
}
