//! The default reqwest transport against a wiremock server.

use std::sync::Arc;
use std::time::Duration;

use benji_core::{
    Client, ClientError, Headers, HttpMethod, Observers, ProgressObserver, ProgressSample, TransferFinished,
};
use parking_lot::Mutex;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct Progress {
    samples: Mutex<Vec<ProgressSample>>,
    finished: Mutex<Vec<TransferFinished>>,
}

impl ProgressObserver for Progress {
    fn on_progress(&self, sample: &ProgressSample) {
        self.samples.lock().push(*sample);
    }

    fn on_finished(&self, finished: &TransferFinished) {
        self.finished.lock().push(finished.clone());
    }
}

fn client(server: &MockServer) -> Client {
    Client::builder()
        .base_url(server.uri())
        .user_agent("benji-test")
        .build()
        .unwrap()
}

#[tokio::test]
async fn get_decodes_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/1"))
        .and(header("x-client", "benji"))
        .and(header("user-agent", "benji-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1, "name": "Ada"})))
        .expect(1)
        .mount(&server)
        .await;

    let headers = Headers::from([("X-Client", "benji")]);
    let response = client(&server).get("/users/1", Some(&headers)).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.body, json!({"id": 1, "name": "Ada"}));
    assert_eq!(response.headers.get("Content-Type"), Some("application/json"));
}

#[tokio::test]
async fn post_sends_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users"))
        .and(header("content-type", "application/json"))
        .and(header("accept", "application/json"))
        .and(body_json(json!({"name": "Ada"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 7})))
        .expect(1)
        .mount(&server)
        .await;

    let response = client(&server)
        .post("/users", None, &json!({"name": "Ada"}))
        .await
        .unwrap();

    assert_eq!(response.status, 201);
    assert_eq!(response.body, json!({"id": 7}));
}

#[tokio::test]
async fn server_error_with_html_body_is_network_error() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/users/1"))
        .respond_with(ResponseTemplate::new(500).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client(&server).delete("/users/1", None).await.unwrap_err();

    assert_eq!(err.domain(), "Network");
    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn connection_refused_is_no_server_response() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = Client::with_base_url(format!("http://{addr}")).unwrap();
    let err = client.get("/users", None).await.unwrap_err();

    assert!(matches!(err, ClientError::NoServerResponse { .. }));
    assert_eq!(err.status(), Some(504));
}

#[tokio::test]
async fn timeout_before_response_is_no_server_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let client = Client::builder()
        .base_url(server.uri())
        .timeout(Duration::from_millis(100))
        .build()
        .unwrap();
    let err = client.get("/slow", None).await.unwrap_err();

    match err {
        ClientError::NoServerResponse { reason, .. } => {
            assert!(reason.unwrap().starts_with("timed out"));
        }
        other => panic!("expected NoServerResponse, got {other:?}"),
    }
}

#[tokio::test]
async fn upload_streams_multipart_with_progress() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/photos/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"stored": true})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("photo.png");
    std::fs::write(&file, vec![0xABu8; 200 * 1024]).unwrap();

    let progress = Arc::new(Progress::default());
    let client = client(&server);
    client.set_upload_observers(Observers::new().with_progress(progress.clone()));

    let response = client
        .upload(
            "/photos/1",
            HttpMethod::Put,
            None,
            Some(&json!({"caption": "sunset"})),
            "photo",
            &file,
        )
        .await
        .unwrap();
    assert_eq!(response.body, json!({"stored": true}));

    let received = server.received_requests().await.unwrap();
    let request = &received[0];
    let content_type = request.headers.get("content-type").unwrap().to_str().unwrap();
    assert!(content_type.starts_with("multipart/form-data; boundary=Boundary-"));
    let body = String::from_utf8_lossy(&request.body);
    assert!(body.contains("name=\"caption\"\r\n\r\nsunset\r\n"));
    assert!(body.contains("filename=\"photo.png\"\r\nContent-Type: image/png\r\n\r\n"));

    let samples = progress.samples.lock().clone();
    assert!(samples.len() >= 4, "expected one sample per chunk, got {}", samples.len());
    for pair in samples.windows(2) {
        assert!(pair[0].bytes_transferred <= pair[1].bytes_transferred);
    }
    let last = samples.last().unwrap();
    assert_eq!(last.bytes_transferred, request.body.len() as u64);
    assert!(last.is_complete());
    assert_eq!(*progress.finished.lock(), vec![TransferFinished::Upload]);
}

#[tokio::test]
async fn download_reports_progress() {
    let server = MockServer::start().await;
    let payload: Vec<u8> = (0..300_000u32).map(|i| (i % 251) as u8).collect();
    Mock::given(method("GET"))
        .and(path("/files/big.bin"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(payload.clone()))
        .mount(&server)
        .await;

    let progress = Arc::new(Progress::default());
    let client = client(&server);
    client.set_download_observers(Observers::new().with_progress(progress.clone()));

    let response = client.download("/files/big.bin", None).await.unwrap();

    assert_eq!(response.body.len(), payload.len());
    assert_eq!(&response.body[..], &payload[..]);
    let samples = progress.samples.lock().clone();
    assert!(!samples.is_empty());
    assert!(samples.iter().all(|s| s.bytes_expected == payload.len() as u64));
    assert_eq!(samples.last().unwrap().percentage(), Some(100));
    assert_eq!(
        *progress.finished.lock(),
        vec![TransferFinished::Download(response.body.clone())]
    );
}

#[tokio::test]
async fn fetch_raw_ignores_base_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/avatar.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("raw bytes"))
        .mount(&server)
        .await;

    let client = Client::with_base_url("https://unused.invalid").unwrap();
    let body = client
        .fetch_raw(&format!("{}/avatar.txt", server.uri()))
        .await
        .unwrap();

    assert_eq!(&body[..], b"raw bytes");
}
