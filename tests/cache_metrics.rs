use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use httpmock::MockServer;
use metrics_util::debugging::{DebugValue, DebuggingRecorder};
use url::Url;

use backoffice::application::content::{EditorSession, UploadOutcome};
use backoffice::application::fetcher::ListFetcher;
use backoffice::application::params::ParamSet;
use backoffice::application::session::Session;
use backoffice::config::Settings;
use backoffice::domain::resources::Orders;
use backoffice::infra::http::ApiClient;

fn tiny_png() -> Bytes {
    let mut data = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR".to_vec();
    data.extend_from_slice(&2u32.to_be_bytes());
    data.extend_from_slice(&2u32.to_be_bytes());
    data.extend_from_slice(&[8, 6, 0, 0, 0]);
    Bytes::from(data)
}

#[tokio::test]
async fn list_and_upload_paths_emit_expected_metrics() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let server = MockServer::start();
    let list = server.mock(|when, then| {
        when.method("GET").path("/api/orders");
        then.status(200)
            .delay(Duration::from_millis(150))
            .header("content-type", "application/json")
            .body(r#"{"content":[],"totalElements":0,"pageable":{"pageNumber":0}}"#);
    });
    server.mock(|when, then| {
        when.method("POST").path("/api/uploads");
        then.status(200)
            .delay(Duration::from_millis(300))
            .header("content-type", "application/json")
            .body(r#"{"url":"https://cdn.example.com/late.png"}"#);
    });

    let mut settings = Settings::default();
    settings.api.base_url = Url::parse(&server.url("/api/")).expect("mock url");
    let session = Arc::new(Session::in_memory("/login", Some("token".to_string())));
    let client = Arc::new(ApiClient::new(&settings.api, session).expect("client"));
    let fetcher = ListFetcher::new(Arc::clone(&client), &settings.cache);

    // miss + joined in-flight request, then a fresh-cache hit
    let params = ParamSet::parse("status=PENDING");
    let (first, second) = tokio::join!(
        fetcher.fetch::<Orders>(&params),
        fetcher.fetch::<Orders>(&params)
    );
    first.expect("first fetch");
    second.expect("second fetch");
    fetcher.fetch::<Orders>(&params).await.expect("cached fetch");
    list.assert_calls(1);

    // upload that finishes after its editor closed
    let editor = EditorSession::open(Arc::clone(&client));
    let (outcome, ()) = tokio::join!(editor.upload_image("late.png", tiny_png()), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        editor.close();
    });
    assert_eq!(outcome.expect("upload completes"), UploadOutcome::Discarded);

    let snapshot = snapshotter.snapshot().into_vec();
    let counters: HashMap<String, u64> = snapshot
        .iter()
        .filter_map(|(key, _, _, value)| match value {
            DebugValue::Counter(count) => Some((key.key().name().to_string(), *count)),
            _ => None,
        })
        .collect();

    assert_eq!(counters.get("backoffice_list_cache_miss_total"), Some(&1));
    assert_eq!(counters.get("backoffice_list_dedup_total"), Some(&1));
    assert_eq!(counters.get("backoffice_list_cache_hit_total"), Some(&1));
    assert_eq!(counters.get("backoffice_upload_discarded_total"), Some(&1));

    let endpoint_labels: Vec<String> = snapshot
        .iter()
        .filter(|(key, _, _, _)| key.key().name() == "backoffice_list_cache_miss_total")
        .flat_map(|(key, _, _, _)| {
            key.key()
                .labels()
                .map(|label| format!("{}={}", label.key(), label.value()))
                .collect::<Vec<_>>()
        })
        .collect();
    assert_eq!(endpoint_labels, vec!["endpoint=orders"]);

    assert!(
        snapshot
            .iter()
            .any(|(key, _, _, _)| key.key().name() == "backoffice_list_fetch_ms"),
        "missing fetch latency histogram"
    );
}
