//! Routing and response shaping over HTTP.

use query_frontend::lifecycle::Frontend;
use serde_json::Value;

mod common;

/// Storage node that echoes the request line, or fails for selected paths.
async fn echo_storage() -> std::net::SocketAddr {
    common::start_storage_node(|line| async move {
        if line.contains("/label/broken/") {
            (400, "unknown label".to_string())
        } else if line.contains("/label/huge/") {
            (422, "x".repeat(100 * 1024))
        } else if line.contains("/export") {
            (500, "export failed".to_string())
        } else {
            (200, line)
        }
    })
    .await
}

async fn start() -> (Frontend, String) {
    let storage = echo_storage().await;
    let frontend = Frontend::start(common::frontend_config(storage, 4, 1_000))
        .await
        .unwrap();
    let base = format!("http://{}", frontend.local_addr());
    (frontend, base)
}

#[tokio::test]
async fn query_is_forwarded_with_path_and_query() {
    let (frontend, base) = start().await;
    let res = common::client()
        .get(format!("{base}/select/7:3/loki/api/v1/query_range?query=up&step=5s"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["access-control-allow-origin"], "*");
    let body = res.text().await.unwrap();
    assert_eq!(
        body,
        "GET /select/7:3/loki/api/v1/query_range?query=up&step=5s HTTP/1.1"
    );
    frontend.shutdown().await.unwrap();
}

#[tokio::test]
async fn label_values_route_takes_the_label_name() {
    let (frontend, base) = start().await;
    let client = common::client();

    let res = client
        .get(format!("{base}/select/0/loki/api/v1/label/job/values"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let res = client
        .get(format!("{base}/select/0/loki/api/v1/label/broken/values"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);
    assert_eq!(res.headers()["access-control-allow-origin"], "*");
    let doc: Value = res.json().await.unwrap();
    assert_eq!(doc["status"], "error");
    assert_eq!(doc["errorType"], "400");
    assert_eq!(doc["error"], "unknown label");
    frontend.shutdown().await.unwrap();
}

#[tokio::test]
async fn plain_and_no_content_endpoints() {
    let (frontend, base) = start().await;
    let client = common::client();

    let res = client
        .post(format!(
            "{base}/delete/0/prometheus/api/v1/admin/tsdb/delete_series?match[]=up"
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 204);

    let res = client
        .get(format!("{base}/select/0/loki/api/v1/export"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 500);
    let body = res.text().await.unwrap();
    assert!(body.starts_with("error in \"/select/0/loki/api/v1/export\""), "{body}");
    frontend.shutdown().await.unwrap();
}

#[tokio::test]
async fn misses_and_malformed_paths() {
    let (frontend, base) = start().await;
    let client = common::client();

    let status = |path: &'static str| {
        let client = client.clone();
        let base = base.clone();
        async move {
            client
                .get(format!("{base}{path}"))
                .send()
                .await
                .unwrap()
                .status()
                .as_u16()
        }
    };

    assert_eq!(status("/select/0/loki/api/v1/unknown").await, 404);
    assert_eq!(status("/insert/0/loki/api/v1/push").await, 404);
    assert_eq!(status("/select/abc/loki/api/v1/query").await, 400);
    assert_eq!(status("/select/0:-1/loki/api/v1/query").await, 400);
    assert_eq!(status("/select/0").await, 400);
    frontend.shutdown().await.unwrap();
}

#[tokio::test]
async fn built_in_paths_answer_locally() {
    let (frontend, base) = start().await;
    let client = common::client();

    let banner = client.get(&base).send().await.unwrap().text().await.unwrap();
    assert!(banner.starts_with("query-frontend"));

    let health = client.get(format!("{base}/health")).send().await.unwrap();
    assert_eq!(health.text().await.unwrap(), "OK");

    let metrics = client.get(format!("{base}/metrics")).send().await.unwrap();
    assert_eq!(metrics.status(), 404);

    let active: Value = client
        .get(format!("{base}/select/0/loki/api/v1/status/active_queries"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(active["status"], "ok");
    assert!(active["data"].as_array().unwrap().is_empty());
    frontend.shutdown().await.unwrap();
}

#[tokio::test]
async fn oversized_upstream_error_is_truncated() {
    let (frontend, base) = start().await;
    let res = common::client()
        .get(format!("{base}/select/0/loki/api/v1/label/huge/values"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 422);

    let doc: Value = res.json().await.unwrap();
    let message = doc["error"].as_str().unwrap();
    assert!(message.starts_with("xxxx"));
    assert!(message.ends_with("(truncated)"));
    assert!(message.len() < 100 * 1024);
    frontend.shutdown().await.unwrap();
}
