use std::sync::{Arc, Mutex};
use std::time::Duration;

use conversion_engine::{
    ApiConfig, EngineEvent, FailureKind, ProgressSink, ReqwestUploader, UploadJob, UploadSettings,
    Uploader, GENERIC_FAILURE_MESSAGE, NETWORK_ERROR_MESSAGE,
};
use pretty_assertions::assert_eq;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct TestSink {
    events: Mutex<Vec<EngineEvent>>,
}

impl TestSink {
    fn take(&self) -> Vec<EngineEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }
}

impl ProgressSink for TestSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn settings() -> UploadSettings {
    UploadSettings {
        chunk_size: 4,
        cache_bust: Arc::new(|| "1700000000000".to_string()),
        ..UploadSettings::default()
    }
}

fn job(endpoint: &str, bytes: &[u8]) -> UploadJob {
    UploadJob {
        request_id: 1,
        file_name: "report.docx".to_string(),
        mime_type: Some(
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document".to_string(),
        ),
        bytes: bytes.to_vec(),
        endpoint: endpoint.to_string(),
        fields: Vec::new(),
    }
}

#[tokio::test]
async fn upload_returns_body_and_reports_measured_progress() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/convert/docx"))
        .and(query_param("t", "1700000000000"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Disposition", "attachment; filename=\"report.pdf\"")
                .set_body_raw(b"%PDF-1.7 body".to_vec(), "application/pdf"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let uploader = ReqwestUploader::new(ApiConfig::with_base(server.uri()), settings());
    let sink = Arc::new(TestSink::default());
    let output = uploader
        .upload(job("/convert/docx", b"0123456789"), sink.clone())
        .await
        .expect("upload ok");

    assert_eq!(output.status, 200);
    assert_eq!(output.bytes, b"%PDF-1.7 body".to_vec());
    assert_eq!(output.content_type.as_deref(), Some("application/pdf"));
    assert_eq!(
        output.content_disposition.as_deref(),
        Some("attachment; filename=\"report.pdf\"")
    );

    let events = sink.take();
    let sent: Vec<u64> = events
        .iter()
        .filter_map(|event| match event {
            EngineEvent::UploadProgress { sent, total, .. } => {
                assert_eq!(*total, 10);
                Some(*sent)
            }
            _ => None,
        })
        .collect();
    assert_eq!(sent, vec![4, 8, 10]);
    assert_eq!(
        events.last(),
        Some(&EngineEvent::UploadFinished { request_id: 1 })
    );
}

#[tokio::test]
async fn auxiliary_fields_are_sent_as_form_parts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/edit/watermark-pdf"))
        .and(body_string_contains("name=\"text\""))
        .and(body_string_contains("CONFIDENTIAL"))
        .and(body_string_contains("filename=\"report.docx\""))
        .respond_with(ResponseTemplate::new(200).set_body_raw(b"pdf".to_vec(), "application/pdf"))
        .expect(1)
        .mount(&server)
        .await;

    let uploader = ReqwestUploader::new(ApiConfig::with_base(server.uri()), settings());
    let mut job = job("/edit/watermark-pdf", b"payload");
    job.fields = vec![("text".to_string(), "CONFIDENTIAL".to_string())];
    uploader
        .upload(job, Arc::new(TestSink::default()))
        .await
        .expect("upload ok");
}

#[tokio::test]
async fn rejection_uses_detail_from_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/convert/docx"))
        .respond_with(
            ResponseTemplate::new(422)
                .set_body_raw(r#"{"detail":"Unsupported file"}"#, "application/json"),
        )
        .mount(&server)
        .await;

    let uploader = ReqwestUploader::new(ApiConfig::with_base(server.uri()), settings());
    let err = uploader
        .upload(job("/convert/docx", b"abc"), Arc::new(TestSink::default()))
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Rejected { status: 422 });
    assert_eq!(err.message, "Unsupported file");
    assert!(!err.is_transport());
}

#[tokio::test]
async fn rejection_without_json_falls_back_to_generic_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad gateway</html>"))
        .mount(&server)
        .await;

    let uploader = ReqwestUploader::new(ApiConfig::with_base(server.uri()), settings());
    let err = uploader
        .upload(job("/convert/xlsx", b"abc"), Arc::new(TestSink::default()))
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Rejected { status: 502 });
    assert_eq!(err.message, GENERIC_FAILURE_MESSAGE);
}

#[tokio::test]
async fn empty_success_body_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let uploader = ReqwestUploader::new(ApiConfig::with_base(server.uri()), settings());
    let err = uploader
        .upload(job("/convert/image", b"img"), Arc::new(TestSink::default()))
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Malformed);
}

#[tokio::test]
async fn unreachable_server_is_a_transport_failure() {
    let server = MockServer::start().await;
    let base = server.uri();
    drop(server);

    let uploader = ReqwestUploader::new(ApiConfig::with_base(base), settings());
    let err = uploader
        .upload(job("/convert/docx", b"abc"), Arc::new(TestSink::default()))
        .await
        .unwrap_err();
    assert!(err.is_transport());
    assert_eq!(err.message, NETWORK_ERROR_MESSAGE);
}

#[tokio::test]
async fn request_timeout_is_classified_as_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(500))
                .set_body_string("late"),
        )
        .mount(&server)
        .await;

    let settings = UploadSettings {
        request_timeout: Some(Duration::from_millis(50)),
        ..settings()
    };
    let uploader = ReqwestUploader::new(ApiConfig::with_base(server.uri()), settings);
    let err = uploader
        .upload(job("/convert/docx", b"abc"), Arc::new(TestSink::default()))
        .await
        .unwrap_err();
    assert_eq!(err.kind, FailureKind::Timeout);
    assert!(err.is_transport());
}

#[tokio::test]
async fn oversized_response_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![b'x'; 64], "application/pdf"))
        .mount(&server)
        .await;

    let settings = UploadSettings {
        max_bytes: 16,
        ..settings()
    };
    let uploader = ReqwestUploader::new(ApiConfig::with_base(server.uri()), settings);
    let err = uploader
        .upload(job("/convert/docx", b"abc"), Arc::new(TestSink::default()))
        .await
        .unwrap_err();
    assert!(matches!(err.kind, FailureKind::TooLarge { max_bytes: 16, .. }));
}
