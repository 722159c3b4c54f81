//! Contract tests for `IpfsHttpStore` against a mocked kubo HTTP API.
//!
//! | Method | Path | Test |
//! |--------|------|------|
//! | POST   | `/api/v0/object/stat` | `stat_*` |
//! | POST   | `/api/v0/refs` | `refs_*` |
//! | POST   | `/api/v0/dag/put` | `dag_put_*` |
//! | POST   | `/api/v0/dag/get` | `dag_get_*` |
//! | POST   | `/api/v0/pin/add` | `pin_*` |

use tally_core::{CanonicalBytes, ContentHash};
use tally_store::{ContentStore, DagCodec, IpfsConfig, IpfsHttpStore, StoreError};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ROOT: &str = "QmRYBsa1UiDXfdozyDhbzXhj7PivyjCsBJybYNQ5bBbTBg";
const CHILD_A: &str = "QmS4ustL54uo8FzR9455qaxZwuMiUhyvMcX9Ba8nUH4uVv";
const CHILD_B: &str = "QmUNLLsPACCz1vLxQVkXqqLX5R1X345qqfHbsf67hvA3Nn";

fn store_for(server: &MockServer) -> IpfsHttpStore {
    let config = IpfsConfig::local(&server.uri()).unwrap();
    IpfsHttpStore::new(&config).unwrap()
}

fn hash(s: &str) -> ContentHash {
    ContentHash::new(s).unwrap()
}

#[tokio::test]
async fn stat_parses_data_and_cumulative_size() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v0/object/stat"))
        .and(query_param("arg", CHILD_A))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "Hash": CHILD_A,
            "NumLinks": 0,
            "BlockSize": 6182,
            "LinksSize": 2,
            "DataSize": 6171,
            "CumulativeSize": 6182
        })))
        .expect(1)
        .mount(&server)
        .await;

    let stat = store_for(&server).stat(&hash(CHILD_A)).await.unwrap();
    assert_eq!(stat.data_size, 6171);
    assert_eq!(stat.cumulative_size, 6182);
}

#[tokio::test]
async fn stat_maps_missing_block_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v0/object/stat"))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
            "Message": "block was not found locally (offline): ipld: could not find node",
            "Code": 0,
            "Type": "error"
        })))
        .mount(&server)
        .await;

    let err = store_for(&server).stat(&hash(CHILD_A)).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }), "got {err:?}");
}

#[tokio::test]
async fn refs_reads_ndjson_lines() {
    let server = MockServer::start().await;
    let body = format!(
        "{{\"Ref\":\"{CHILD_A}\",\"Err\":\"\"}}\n{{\"Ref\":\"{CHILD_B}\",\"Err\":\"\"}}\n"
    );
    Mock::given(method("POST"))
        .and(path("/api/v0/refs"))
        .and(query_param("arg", ROOT))
        .and(query_param("recursive", "true"))
        .and(query_param("unique", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(1)
        .mount(&server)
        .await;

    let refs = store_for(&server)
        .refs(&hash(ROOT), true, true)
        .await
        .unwrap();
    assert_eq!(refs, vec![hash(CHILD_A), hash(CHILD_B)]);
}

#[tokio::test]
async fn refs_empty_body_means_leaf() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v0/refs"))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .mount(&server)
        .await;

    let refs = store_for(&server)
        .refs(&hash(CHILD_A), true, true)
        .await
        .unwrap();
    assert!(refs.is_empty());
}

#[tokio::test]
async fn refs_surfaces_inline_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v0/refs"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("{\"Ref\":\"\",\"Err\":\"merkledag: not found\"}\n"),
        )
        .mount(&server)
        .await;

    let err = store_for(&server)
        .refs(&hash(ROOT), true, true)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Backend { .. }), "got {err:?}");
}

#[tokio::test]
async fn dag_put_sends_codec_and_returns_cid() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v0/dag/put"))
        .and(query_param("store-codec", "dag-cbor"))
        .and(query_param("input-codec", "dag-json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "Cid": {"/": "bafyreihledgerexample"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let obj = CanonicalBytes::new(&serde_json::json!({"billed_refs": [], "root_hashes": []}))
        .unwrap();
    let cid = store_for(&server)
        .dag_put(&obj, DagCodec::DagCbor)
        .await
        .unwrap();
    assert_eq!(cid.as_str(), "bafyreihledgerexample");
}

#[tokio::test]
async fn dag_get_returns_body_bytes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v0/dag/get"))
        .and(query_param("arg", "bafyreihledgerexample"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"billed_refs":[],"root_hashes":["QmRoot"]}"#),
        )
        .mount(&server)
        .await;

    let bytes = store_for(&server)
        .dag_get(&hash("bafyreihledgerexample"))
        .await
        .unwrap();
    assert_eq!(bytes, br#"{"billed_refs":[],"root_hashes":["QmRoot"]}"#);
}

#[tokio::test]
async fn pin_reports_backend_failures() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v0/pin/add"))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
            "Message": "pinning is disabled",
            "Code": 0,
            "Type": "error"
        })))
        .mount(&server)
        .await;

    let err = store_for(&server).pin(&hash(ROOT)).await.unwrap_err();
    match err {
        StoreError::Backend {
            status, message, ..
        } => {
            assert_eq!(status, 500);
            assert_eq!(message, "pinning is disabled");
        }
        other => panic!("expected Backend, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_daemon_is_a_transport_error() {
    let config = IpfsConfig::local("http://127.0.0.1:9").unwrap();
    let store = IpfsHttpStore::new(&config).unwrap();
    let err = store.stat(&hash(ROOT)).await.unwrap_err();
    assert!(matches!(err, StoreError::Transport { .. }), "got {err:?}");
}
