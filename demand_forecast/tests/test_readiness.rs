use demand_forecast::forecast::dates_after;
use demand_forecast::{
    FileCache, ForecastError, ForecastResult, ReadinessCoordinator, ReadinessState,
    ReadinessStatus,
};
use pretty_assertions::assert_eq;
use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Barrier};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

fn thirty_day_forecast() -> ForecastResult {
    let dates = dates_after("2016-04-24".parse().unwrap(), 30).unwrap();
    let values: Vec<f64> = (0..30).map(|d| 30_000.0 + 250.5 * d as f64).collect();
    ForecastResult::from_values(&dates, &values).unwrap()
}

#[tokio::test]
async fn test_cache_hit_skips_computation() {
    let dir = TempDir::new().unwrap();
    let cache = FileCache::new(dir.path().join("forecast_cache.json"));
    cache.save(&thirty_day_forecast()).unwrap();

    let called = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&called);
    let coordinator = ReadinessCoordinator::start(cache, move || {
        flag.store(true, Ordering::SeqCst);
        Ok(thirty_day_forecast())
    });

    assert_eq!(coordinator.status(), ReadinessStatus::Ready);
    let state = coordinator.state();
    assert_eq!(state.forecast().unwrap().summary.horizon_days, 30);

    // Give a stray worker the chance to show up
    thread::sleep(Duration::from_millis(50));
    assert!(!called.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_cache_miss_computes_and_writes_through() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("forecast_cache.json");

    let coordinator =
        ReadinessCoordinator::start(FileCache::new(&path), || Ok(thirty_day_forecast()));

    let state = coordinator.settled().await;
    assert_eq!(*state, ReadinessState::Ready(thirty_day_forecast()));
    assert_eq!(coordinator.status(), ReadinessStatus::Ready);

    // The write-through follows publication; wait for the file to appear
    let cache = FileCache::new(&path);
    let mut cached = cache.load();
    for _ in 0..100 {
        if cached.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
        cached = cache.load();
    }
    assert_eq!(cached, Some(thirty_day_forecast()));
}

#[tokio::test]
async fn test_restart_serves_written_cache() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("forecast_cache.json");

    let first = ReadinessCoordinator::start(FileCache::new(&path), || Ok(thirty_day_forecast()));
    first.settled().await;
    for _ in 0..100 {
        if path.exists() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let second = ReadinessCoordinator::start(FileCache::new(&path), || {
        Err(ForecastError::ForecastFailure("must not run".to_string()))
    });
    assert_eq!(second.status(), ReadinessStatus::Ready);
}

#[tokio::test]
async fn test_failure_becomes_error_state() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("forecast_cache.json");

    let coordinator = ReadinessCoordinator::start(FileCache::new(&path), || {
        Err(ForecastError::FitFailure {
            attempts: 3,
            message: "optimizer did not converge (attempt 3)".to_string(),
        })
    });

    let state = coordinator.settled().await;
    assert_eq!(coordinator.status(), ReadinessStatus::Error);
    let message = state.error().unwrap();
    assert!(message.contains("attempt 3"), "message: {}", message);

    // Failures are never cached
    assert!(!path.exists());
}

#[tokio::test]
async fn test_panicking_computation_becomes_error_state() {
    let dir = TempDir::new().unwrap();
    let coordinator = ReadinessCoordinator::start(
        FileCache::new(dir.path().join("forecast_cache.json")),
        || panic!("numeric blow-up"),
    );

    let state = coordinator.settled().await;
    assert_eq!(state.status(), ReadinessStatus::Error);
}

#[tokio::test]
async fn test_unwritable_cache_still_ready() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, b"file, not directory").unwrap();

    let coordinator = ReadinessCoordinator::start(
        FileCache::new(blocker.join("forecast_cache.json")),
        || Ok(thirty_day_forecast()),
    );

    let state = coordinator.settled().await;
    assert_eq!(state.forecast(), Some(&thirty_day_forecast()));
}

#[test]
fn test_readers_see_computing_until_published() {
    let dir = TempDir::new().unwrap();
    let (release, gate) = mpsc::channel::<()>();

    let coordinator = ReadinessCoordinator::start(
        FileCache::new(dir.path().join("forecast_cache.json")),
        move || {
            gate.recv().unwrap();
            Ok(thirty_day_forecast())
        },
    );

    let readers = 8;
    let barrier = Arc::new(Barrier::new(readers + 1));
    let handles: Vec<_> = (0..readers)
        .map(|_| {
            let coordinator = Arc::clone(&coordinator);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                for _ in 0..1_000 {
                    assert_eq!(*coordinator.state(), ReadinessState::Computing);
                    assert_eq!(coordinator.status(), ReadinessStatus::Computing);
                }
                barrier.wait();
                // After release every observation is either Computing or the complete result
                for _ in 0..1_000 {
                    match &*coordinator.state() {
                        ReadinessState::Computing => {}
                        ReadinessState::Ready(result) => {
                            assert_eq!(result.len(), 30);
                            assert_eq!(result.summary.horizon_days, 30);
                        }
                        ReadinessState::Error(e) => panic!("unexpected error {}", e),
                    }
                }
            })
        })
        .collect();

    barrier.wait();
    release.send(()).unwrap();
    for handle in handles {
        handle.join().unwrap();
    }

    let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
    let state = runtime.block_on(coordinator.settled());
    assert_eq!(state.forecast(), Some(&thirty_day_forecast()));
}

#[test]
fn test_fixed_state_coordinators() {
    let coordinator = ReadinessCoordinator::with_state(ReadinessState::Computing);
    let receiver = coordinator.subscribe();
    assert_eq!(**receiver.borrow(), ReadinessState::Computing);

    let fixed = ReadinessCoordinator::with_state(ReadinessState::Error("boom".to_string()));
    assert_eq!(fixed.status(), ReadinessStatus::Error);
    assert_eq!(fixed.state().error(), Some("boom"));
}
