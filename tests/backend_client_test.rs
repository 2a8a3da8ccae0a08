//! Backend client HTTP tests

use invoice_uploadr::backend::{BackendApi, BackendClient, PresignedUpload};
use invoice_uploadr::UploadError;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "test-jwt-token";

fn client_for(server: &MockServer) -> BackendClient {
    BackendClient::new(&format!("{}/api/users", server.uri()), TOKEN, None).unwrap()
}

#[tokio::test]
async fn test_notify_posts_json_with_bearer() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/users/update-invoice-file/"))
        .and(header("authorization", "Bearer test-jwt-token"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "invoice_id": 1,
            "object_key": "invoices/1/invoice.pdf"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Invoice file updated",
            "file_url": "https://cdn.example.com/invoices/1/invoice.pdf?sig=get"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let response = client_for(&mock_server)
        .notify_upload_complete(1, "invoices/1/invoice.pdf")
        .await
        .unwrap();

    assert_eq!(response.message_text(), "Invoice file updated");
    assert_eq!(
        response.file_url_text(),
        "https://cdn.example.com/invoices/1/invoice.pdf?sig=get"
    );
}

#[tokio::test]
async fn test_notify_keeps_extra_fields() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/users/update-invoice-file/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "ok",
            "file_url": "https://cdn/x",
            "invoice_id": 1
        })))
        .mount(&mock_server)
        .await;

    let response = client_for(&mock_server)
        .notify_upload_complete(1, "invoices/1/a.pdf")
        .await
        .unwrap();

    assert_eq!(response.extra.get("invoice_id"), Some(&json!(1)));
}

#[tokio::test]
async fn test_notify_accepts_structured_message() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/users/update-invoice-file/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": {"detail": "ok"},
            "file_url": "https://cdn/x"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let response = client_for(&mock_server)
        .notify_upload_complete(1, "invoices/1/a.pdf")
        .await
        .unwrap();

    assert_eq!(response.message, Some(json!({"detail": "ok"})));
    assert_eq!(response.file_url_text(), "https://cdn/x");
}

#[tokio::test]
async fn test_notify_error_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/users/update-invoice-file/"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Invoice not found"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let err = client_for(&mock_server)
        .notify_upload_complete(99, "invoices/99/a.pdf")
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::BackendNotify(_)));
    assert_eq!(err.to_string(), "Failed to update invoice: Not Found");
}

#[tokio::test]
async fn test_notify_malformed_json() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/users/update-invoice-file/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&mock_server)
        .await;

    let err = client_for(&mock_server)
        .notify_upload_complete(1, "invoices/1/a.pdf")
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::BackendNotify(_)));
    // serde's cause and position are kept
    assert!(err
        .to_string()
        .starts_with("Failed to update invoice: invalid response body: expected value at line 1"));
}

fn closed_port_url() -> String {
    // Bind then drop a listener so the port is closed
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/api/users", addr)
}

#[tokio::test]
async fn test_notify_connection_refused() {
    let client = BackendClient::new(&closed_port_url(), TOKEN, None).unwrap();

    let err = client
        .notify_upload_complete(1, "invoices/1/a.pdf")
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::BackendNotify(_)));
    assert!(err.to_string().starts_with("Failed to update invoice: "));
    assert!(!err.to_string().contains(TOKEN));
}

#[tokio::test]
async fn test_request_presigned_url_connection_refused() {
    let client = BackendClient::new(&closed_port_url(), TOKEN, None).unwrap();

    let err = client
        .request_presigned_url(1, "invoice.pdf")
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::Presign(_)));
    assert!(err.to_string().starts_with("Failed to obtain presigned URL: "));
}

#[tokio::test]
async fn test_request_presigned_url() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/users/get-presigned-url/"))
        .and(header("authorization", "Bearer test-jwt-token"))
        .and(body_json(json!({"invoice_id": 1, "filename": "invoice.pdf"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "presigned_url": "https://bucket.s3.amazonaws.com/invoices/1/invoice.pdf?X-Amz-Signature=s",
            "object_key": "invoices/1/invoice.pdf",
            "invoice_id": 1
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let slot = client_for(&mock_server)
        .request_presigned_url(1, "invoice.pdf")
        .await
        .unwrap();

    assert_eq!(
        slot,
        PresignedUpload {
            presigned_url:
                "https://bucket.s3.amazonaws.com/invoices/1/invoice.pdf?X-Amz-Signature=s".into(),
            object_key: "invoices/1/invoice.pdf".into(),
            invoice_id: 1,
        }
    );
}

#[tokio::test]
async fn test_request_presigned_url_unauthorized() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/users/get-presigned-url/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    let err = client_for(&mock_server)
        .request_presigned_url(1, "invoice.pdf")
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::Presign(_)));
    assert_eq!(
        err.to_string(),
        "Failed to obtain presigned URL: Unauthorized"
    );
}
