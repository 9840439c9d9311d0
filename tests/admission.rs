//! End-to-end admission control through a running front end.

use std::time::{Duration, Instant};

use query_frontend::lifecycle::Frontend;

mod common;

const QUERY: &str = "/select/0/loki/api/v1/query?query=%7Bjob%3D%22app%22%7D";

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn third_request_times_out_while_two_hold_the_gate() {
    let storage = common::start_slow_storage_node(200, r#"{"status":"success"}"#).await;
    let frontend = Frontend::start(common::frontend_config(storage, 2, 100))
        .await
        .unwrap();
    let url = format!("http://{}{}", frontend.local_addr(), QUERY);
    let client = common::client();

    let mut tasks = Vec::new();
    for _ in 0..3 {
        let client = client.clone();
        let url = url.clone();
        tasks.push(tokio::spawn(async move {
            let started = Instant::now();
            let res = client.get(&url).send().await.expect("front end unreachable");
            let status = res.status().as_u16();
            let body = res.text().await.unwrap();
            (status, body, started.elapsed())
        }));
    }

    let mut ok = Vec::new();
    let mut rejected = Vec::new();
    for task in tasks {
        let (status, body, elapsed) = task.await.unwrap();
        match status {
            200 => ok.push(elapsed),
            503 => rejected.push((body, elapsed)),
            other => panic!("unexpected status {other}: {body}"),
        }
    }

    assert_eq!(ok.len(), 2, "two requests fit in the gate");
    assert_eq!(rejected.len(), 1, "the third request must be rejected");
    for elapsed in ok {
        assert!(elapsed >= Duration::from_millis(200), "finished in {elapsed:?}");
    }

    let (body, waited) = &rejected[0];
    assert!(*waited >= Duration::from_millis(100), "rejected after {waited:?}");
    assert!(*waited < Duration::from_millis(400), "rejected after {waited:?}");
    assert!(body.contains("cannot handle more than 2 concurrent search requests"));
    assert!(body.contains("max_queue_duration"));

    assert_eq!(frontend.gate().limit_timeout_count(), 1);
    assert!(frontend.gate().limit_reached_count() >= 1);
    frontend.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn timeout_hint_shortens_the_queue_wait() {
    let storage = common::start_slow_storage_node(500, "{}").await;
    let frontend = Frontend::start(common::frontend_config(storage, 1, 5_000))
        .await
        .unwrap();
    let base = format!("http://{}", frontend.local_addr());
    let client = common::client();

    let holder = {
        let client = client.clone();
        let url = format!("{base}{QUERY}");
        tokio::spawn(async move { client.get(&url).send().await.unwrap().status().as_u16() })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    let started = Instant::now();
    let res = client
        .get(format!("{base}/select/0/loki/api/v1/labels?timeout=50ms"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 503);
    assert!(started.elapsed() < Duration::from_millis(400));

    assert_eq!(holder.await.unwrap(), 200);
    frontend.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn freed_slot_admits_a_queued_request() {
    let storage = common::start_slow_storage_node(100, "{}").await;
    let frontend = Frontend::start(common::frontend_config(storage, 1, 2_000))
        .await
        .unwrap();
    let url = format!("http://{}{}", frontend.local_addr(), QUERY);
    let client = common::client();

    let first = tokio::spawn({
        let (client, url) = (client.clone(), url.clone());
        async move { client.get(&url).send().await.unwrap().status().as_u16() }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    let second = client.get(&url).send().await.unwrap().status().as_u16();

    assert_eq!(first.await.unwrap(), 200);
    assert_eq!(second, 200);
    assert_eq!(frontend.gate().limit_timeout_count(), 0);
    // The slot is released once the server has finished sending the body.
    let deadline = Instant::now() + Duration::from_secs(1);
    while frontend.gate().occupied() != 0 && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert_eq!(frontend.gate().occupied(), 0);
    frontend.shutdown().await.unwrap();
}
