//! Load testing for guarded calls under concurrency.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use callguard::clients::VerificationClient;
use callguard::resilience::{
    BackoffPolicy, BreakerSettings, CallPolicy, CircuitState, ResilienceError, ResilientCall,
};

mod common;

/// Breaker settings that never trip, so every outcome lands in the window.
fn counting_policy() -> CallPolicy {
    CallPolicy {
        timeout: Duration::from_millis(500),
        max_retries: 1,
        backoff: BackoffPolicy::Fixed(Duration::from_millis(1)),
        breaker: BreakerSettings {
            error_threshold_percentage: 100.0,
            volume_threshold: u64::MAX,
            rolling_window: Duration::from_secs(60),
            ..Default::default()
        },
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_invokes_lose_no_updates() {
    let concurrency = 200u32;

    let call = Arc::new(ResilientCall::new(
        "load",
        |n: u32| async move {
            tokio::time::sleep(Duration::from_millis(u64::from(n % 5))).await;
            if n % 3 == 0 {
                Err(format!("request {} rejected upstream", n))
            } else {
                Ok(n)
            }
        },
        counting_policy(),
    ));

    let mut tasks = Vec::new();
    for n in 0..concurrency {
        let call = call.clone();
        tasks.push(tokio::spawn(async move { call.invoke(n).await }));
    }

    let mut ok = 0u64;
    let mut failed = 0u64;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => ok += 1,
            Err(ResilienceError::RemoteCallFailed { attempts: 1, .. }) => failed += 1,
            Err(other) => panic!("unexpected error: {:?}", other),
        }
    }

    let stats = call.stats();
    assert_eq!(ok + failed, u64::from(concurrency));
    assert_eq!(stats.successes, ok);
    assert_eq!(stats.failures, failed);
    assert_eq!(stats.total(), u64::from(concurrency));
    assert_eq!(call.state(), CircuitState::Closed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_half_open_admits_single_probe_under_load() {
    let hits = Arc::new(AtomicU32::new(0));
    let counter = hits.clone();
    let policy = CallPolicy {
        max_retries: 1,
        breaker: BreakerSettings {
            volume_threshold: 1,
            reset_timeout: Duration::from_millis(50),
            ..Default::default()
        },
        ..counting_policy()
    };
    let call = Arc::new(ResilientCall::new(
        "probe",
        move |fail: bool| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(200)).await;
                if fail {
                    Err("down")
                } else {
                    Ok(())
                }
            }
        },
        policy,
    ));

    assert!(call.invoke(true).await.is_err());
    assert!(call.state().is_open());
    tokio::time::sleep(Duration::from_millis(80)).await;

    let mut tasks = Vec::new();
    for _ in 0..20 {
        let call = call.clone();
        tasks.push(tokio::spawn(async move { call.invoke(false).await }));
    }

    let mut succeeded = 0;
    let mut rejected = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(()) => succeeded += 1,
            Err(ResilienceError::CircuitOpen { .. }) => rejected += 1,
            Err(other) => panic!("unexpected error: {:?}", other),
        }
    }

    assert_eq!(succeeded, 1);
    assert_eq!(rejected, 19);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
    assert_eq!(call.state(), CircuitState::Closed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_client_load_performance() {
    let addr = common::start_mock_backend(200, r#"{"verified":true}"#).await;

    let concurrency = 20;
    let requests_per_task = 25;
    let total_requests = concurrency * requests_per_task;

    let client = Arc::new(
        VerificationClient::with_policy(&common::base_url(addr), CallPolicy::default()).unwrap(),
    );
    let start = Instant::now();

    let mut tasks = Vec::new();
    for task_id in 0..concurrency {
        let client = client.clone();
        tasks.push(tokio::spawn(async move {
            let mut latencies = Vec::new();
            for i in 0..requests_per_task {
                let req_start = Instant::now();
                let user_id = format!("user-{}-{}", task_id, i);
                if let Ok(true) = client.is_user_verified(&user_id).await {
                    latencies.push(req_start.elapsed());
                }
            }
            latencies
        }));
    }

    let mut all_latencies = Vec::new();
    for task in tasks {
        all_latencies.extend(task.await.unwrap());
    }

    let duration = start.elapsed();
    let rps = total_requests as f64 / duration.as_secs_f64();

    assert_eq!(all_latencies.len(), total_requests, "every request should succeed");
    assert_eq!(client.call().stats().successes, total_requests as u64);

    all_latencies.sort();
    let p50 = all_latencies[all_latencies.len() / 2];
    let p95 = all_latencies[(all_latencies.len() as f64 * 0.95) as usize];
    let p99 = all_latencies[(all_latencies.len() as f64 * 0.99) as usize];

    println!("\n--- Load Test Results ---");
    println!("Total Requests: {}", total_requests);
    println!("Concurrency:    {}", concurrency);
    println!("Total Duration: {:?}", duration);
    println!("Requests/sec:   {:.2}", rps);
    println!("P50 Latency:    {:?}", p50);
    println!("P95 Latency:    {:?}", p95);
    println!("P99 Latency:    {:?}", p99);
    println!("-------------------------\n");
}
