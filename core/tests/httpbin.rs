//! Live-network checks against httpbin.org. Run with `--ignored`.

use networking::Networking;

#[tokio::test]
#[ignore = "requires internet access"]
async fn httpbin_get_returns_json() {
    let body = Networking::new().unwrap().get("https://httpbin.org/get").await.unwrap();
    assert!(!body.is_empty());
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["url"], "https://httpbin.org/get");
}

#[tokio::test]
#[ignore = "requires internet access"]
async fn httpbin_post_echoes_body() {
    let body = Networking::new()
        .unwrap()
        .post("https://httpbin.org/post", r#"{"demo":"test"}"#)
        .await
        .unwrap();
    assert!(body.contains(r#""demo":"test""#) || body.contains(r#""demo": "test""#));
}

#[tokio::test]
#[ignore = "requires internet access"]
async fn httpbin_404_is_status_error() {
    let err = Networking::new()
        .unwrap()
        .get("https://httpbin.org/status/404")
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(404));
}
