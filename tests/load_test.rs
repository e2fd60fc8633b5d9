//! Load testing for the gateway over a real socket.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use blog_gateway::config::GatewayConfig;
use blog_gateway::http::HttpServer;
use blog_gateway::lifecycle::Shutdown;
use blog_gateway::resilience::CircuitState;
use blog_gateway::upstream::ServiceName;
use tokio::task::JoinHandle;

mod common;

const ARTICLES: &str = r#"{"success":true,"data":[{"id":1,"title":"Hello"}]}"#;

struct RunningGateway {
    addr: SocketAddr,
    shutdown: Shutdown,
    handle: JoinHandle<Result<(), std::io::Error>>,
}

async fn start_gateway(server: HttpServer) -> RunningGateway {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    let handle = tokio::spawn(async move { server.run(listener, server_shutdown).await });

    RunningGateway {
        addr,
        shutdown,
        handle,
    }
}

fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

#[tokio::test]
async fn test_load_performance() {
    let article = common::start_mock_backend(200, ARTICLES).await;
    let comment = common::start_mock_backend(200, "[]").await;
    let config: GatewayConfig = common::gateway_config(&article.url(), &comment.url());
    let gateway = start_gateway(HttpServer::new(config).unwrap()).await;

    let concurrency = 20;
    let requests_per_task = 25;
    let total_requests = concurrency * requests_per_task;

    let client = client();
    let start = Instant::now();

    let mut tasks = Vec::new();
    for _ in 0..concurrency {
        let client = client.clone();
        let url = format!("http://{}/api/articles", gateway.addr);
        tasks.push(tokio::spawn(async move {
            let mut ok = 0usize;
            for _ in 0..requests_per_task {
                if let Ok(res) = client.get(&url).send().await {
                    if res.status().is_success() {
                        ok += 1;
                    }
                }
            }
            ok
        }));
    }

    let mut succeeded = 0;
    for task in tasks {
        succeeded += task.await.unwrap();
    }
    let elapsed = start.elapsed();

    println!(
        "{} requests in {:?} ({:.0} req/s)",
        total_requests,
        elapsed,
        total_requests as f64 / elapsed.as_secs_f64()
    );
    assert_eq!(succeeded, total_requests);
    assert_eq!(article.hits(), total_requests);

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn test_request_id_and_graceful_shutdown() {
    let article = common::start_mock_backend(200, ARTICLES).await;
    let comment = common::start_mock_backend(200, "[]").await;
    let gateway = start_gateway(
        HttpServer::new(common::gateway_config(&article.url(), &comment.url())).unwrap(),
    )
    .await;

    let res = client()
        .get(format!("http://{}/api/articles", gateway.addr))
        .send()
        .await
        .expect("gateway unreachable");
    assert_eq!(res.status(), 200);
    assert!(res.headers().contains_key("x-request-id"));

    gateway.shutdown.trigger();
    let result = tokio::time::timeout(Duration::from_secs(5), gateway.handle)
        .await
        .expect("server did not stop after shutdown")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_concurrent_failures_open_circuit_and_shed_load() {
    let article = common::start_mock_backend(500, r#"{"success":false,"error":"down"}"#).await;
    let comment = common::start_mock_backend(200, "[]").await;
    let mut config = common::gateway_config(&article.url(), &comment.url());
    config.circuit_breaker.reset_timeout_ms = 30_000;
    let server = HttpServer::new(config).unwrap();
    let breaker = server.registry().get(ServiceName::Article).clone();
    let gateway = start_gateway(server).await;
    let client = client();
    let url = format!("http://{}/api/articles", gateway.addr);

    let burst: Vec<_> = (0..30)
        .map(|_| {
            let client = client.clone();
            let url = url.clone();
            tokio::spawn(async move { client.get(&url).send().await.map(|r| r.status().as_u16()) })
        })
        .collect();
    for task in burst {
        let status = task.await.unwrap().unwrap();
        assert!(status == 500 || status == 503, "unexpected status {}", status);
    }
    assert_eq!(breaker.state(), CircuitState::Open);

    let hits_when_open = article.hits();
    assert!(hits_when_open >= 10);

    for _ in 0..20 {
        let res = client.get(&url).send().await.unwrap();
        assert_eq!(res.status(), 503);
    }
    assert_eq!(article.hits(), hits_when_open);

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn test_concurrent_probe_admission() {
    let healthy = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    let flag = healthy.clone();
    let article = common::start_programmable_backend(move |_| {
        let ok = flag.load(std::sync::atomic::Ordering::SeqCst);
        async move {
            if ok {
                tokio::time::sleep(Duration::from_millis(500)).await;
                (200, ARTICLES.to_string())
            } else {
                (500, r#"{"success":false,"error":"down"}"#.to_string())
            }
        }
    })
    .await;
    let comment = common::start_mock_backend(200, "[]").await;

    let mut config = common::gateway_config(&article.url(), &comment.url());
    config.backends.article.timeout_ms = 2000;
    let server = HttpServer::new(config).unwrap();
    let breaker = server.registry().get(ServiceName::Article).clone();
    let gateway = start_gateway(server).await;
    let client = client();
    let url = format!("http://{}/api/articles", gateway.addr);

    for _ in 0..10 {
        client.get(&url).send().await.unwrap();
    }
    assert_eq!(breaker.state(), CircuitState::Open);

    healthy.store(true, std::sync::atomic::Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(300)).await;

    let concurrent: Vec<_> = (0..20)
        .map(|_| {
            let client = client.clone();
            let url = url.clone();
            tokio::spawn(async move { client.get(&url).send().await.unwrap().status().as_u16() })
        })
        .collect();

    let mut ok = 0;
    let mut rejected = 0;
    for task in concurrent {
        match task.await.unwrap() {
            200 => ok += 1,
            503 => rejected += 1,
            other => panic!("unexpected status {}", other),
        }
    }

    assert_eq!(ok, 1, "exactly one probe should reach the backend");
    assert_eq!(rejected, 19);
    assert_eq!(article.hits(), 11);
    assert_eq!(breaker.state(), CircuitState::Closed);

    gateway.shutdown.trigger();
}
