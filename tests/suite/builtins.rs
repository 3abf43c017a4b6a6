//! Built-in `fs` and `http` modules called synchronously

use serde_json::json;
use tosync_bridge::{FS_MODULE, HTTP_MODULE, synchronize};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[test]
fn fs_write_read_and_exists() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("notes.txt").to_string_lossy().to_string();

    let exists = synchronize(FS_MODULE, "exists");
    assert_eq!(exists.call(vec![json!(file)]).unwrap(), json!(false));

    let written = synchronize(FS_MODULE, "writeFile")
        .call(vec![json!(file), json!("line one\n")])
        .unwrap();
    assert_eq!(written, json!(null));
    assert_eq!(exists.call(vec![json!(file)]).unwrap(), json!(true));

    let text = synchronize(FS_MODULE, "readFile")
        .call(vec![json!(file), json!("utf8")])
        .unwrap();
    assert_eq!(text, json!("line one\n"));
}

#[test]
fn fs_read_missing_file_merges_error_kind() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("missing.txt").to_string_lossy().to_string();

    let result = synchronize(FS_MODULE, "readFile")
        .call(vec![json!(file)])
        .unwrap();
    assert!(result["error"].is_string());
    assert_eq!(result["errorData"]["kind"], json!("NotFound"));
}

#[tokio::test(flavor = "multi_thread")]
async fn http_load_spreads_json_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"posts": [1, 2]})))
        .mount(&server)
        .await;
    let url = format!("{}/posts", server.uri());

    // The call parks this thread; keep it off the runtime driving the mock server.
    let result = tokio::task::spawn_blocking(move || {
        synchronize(HTTP_MODULE, "load").call(vec![json!(url)])
    })
    .await
    .unwrap()
    .unwrap();

    assert_eq!(result["error"], json!(false));
    assert_eq!(result["status"], json!(200));
    assert_eq!(result["posts"], json!([1, 2]));
}

#[tokio::test(flavor = "multi_thread")]
async fn http_load_reports_status_reason() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404).set_body_string("nope"))
        .mount(&server)
        .await;
    let url = format!("{}/gone", server.uri());

    let result = tokio::task::spawn_blocking(move || {
        synchronize(HTTP_MODULE, "load").call(vec![json!(url)])
    })
    .await
    .unwrap()
    .unwrap();

    assert_eq!(result["error"], json!("Not Found"));
    assert_eq!(result["status"], json!(404));
    assert_eq!(result["text"], json!("nope"));
}
