//! Loop lifecycle integration tests
//!
//! Exercises init / run / stop through the public API, including shutdown
//! under load and concurrent stop requests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;

use meshloop::dump::{dump_path, dump_to_file};
use meshloop::events::{EventTopic, RouterEvent, RouterStatus};
use meshloop::logging::{LogLevel, LogRecord, LogSink};
use meshloop::{LoopRunner, LoopRunnerConfig, LoopState, MeshloopError};
use tempfile::TempDir;

const DEADLINE: Duration = Duration::from_secs(10);

/// Run `f` on another thread and fail the test if it does not finish in time.
fn within<T, F>(deadline: Duration, f: F) -> T
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(f());
    });
    rx.recv_timeout(deadline).expect("operation did not finish in time")
}

fn recording_runner() -> (Arc<LoopRunner>, Arc<Mutex<Vec<String>>>) {
    let messages = Arc::new(Mutex::new(Vec::new()));
    let sink_messages = Arc::clone(&messages);
    let sink: Arc<dyn LogSink> = Arc::new(move |record: &LogRecord| {
        sink_messages.lock().unwrap().push(record.message.clone());
    });
    let runner = LoopRunner::new(LoopRunnerConfig::default(), sink);
    (Arc::new(runner), messages)
}

#[test]
fn test_init_then_stop_without_run_does_not_hang() {
    let result = within(DEADLINE, || {
        let runner = LoopRunner::default();
        runner.init().unwrap();
        let stopped = runner.stop();
        (stopped.map_err(|e| e.to_string()), runner.state())
    });

    let (stopped, state) = result;
    assert!(stopped.is_err());
    assert_eq!(state, LoopState::Initialized);
}

#[test]
fn test_stop_returns_after_worker_exit() {
    let (runner, messages) = recording_runner();
    runner.init().unwrap();
    runner.run().unwrap();
    runner.stop().unwrap();

    let messages = messages.lock().unwrap();
    assert_eq!(messages.last().map(String::as_str), Some("event loop stopped"));
    assert_eq!(runner.state(), LoopState::Stopped);
}

#[test]
fn test_second_stop_is_deterministic() {
    let runner = LoopRunner::default();
    runner.init().unwrap();
    runner.run().unwrap();
    runner.stop().unwrap();

    for _ in 0..3 {
        let err = runner.stop().unwrap_err();
        assert!(matches!(err, MeshloopError::InvalidState(ref msg) if msg == "loop already stopped"));
        assert_eq!(runner.state(), LoopState::Stopped);
    }
}

#[test]
fn test_immediate_stop_is_bounded() {
    within(DEADLINE, || {
        for _ in 0..25 {
            let runner = LoopRunner::default();
            runner.init().unwrap();
            runner.run().unwrap();
            runner.stop().unwrap();
        }
    });
}

struct Abandoned {
    counter: Arc<AtomicUsize>,
    armed: bool,
}

impl Drop for Abandoned {
    fn drop(&mut self) {
        if self.armed {
            self.counter.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[test]
fn test_pending_work_completes_or_is_abandoned() {
    const N: usize = 200;

    let runner = LoopRunner::default();
    runner.init().unwrap();
    runner.run().unwrap();

    let finished = Arc::new(AtomicUsize::new(0));
    let abandoned = Arc::new(AtomicUsize::new(0));

    for i in 0..N {
        let finished = Arc::clone(&finished);
        let mut guard = Abandoned {
            counter: Arc::clone(&abandoned),
            armed: true,
        };
        runner
            .spawn(async move {
                let _ = &guard;
                tokio::time::sleep(Duration::from_millis((i % 20) as u64)).await;
                finished.fetch_add(1, Ordering::SeqCst);
                guard.armed = false;
            })
            .unwrap();
    }

    thread::sleep(Duration::from_millis(5));
    runner.stop().unwrap();

    let done = finished.load(Ordering::SeqCst);
    let dropped = abandoned.load(Ordering::SeqCst);
    assert_eq!(done + dropped, N);

    thread::sleep(Duration::from_millis(50));
    assert_eq!(finished.load(Ordering::SeqCst), done);
    assert_eq!(abandoned.load(Ordering::SeqCst), dropped);
}

#[test]
fn test_concurrent_stop_joins_once() {
    let runner = Arc::new(LoopRunner::default());
    runner.init().unwrap();
    runner.run().unwrap();

    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let runner = Arc::clone(&runner);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                runner.stop().map_err(|e| e.to_string())
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);

    let failure = results.into_iter().find_map(|r| r.err()).unwrap();
    assert_eq!(failure, "Invalid state: loop already stopped");
    assert_eq!(runner.state(), LoopState::Stopped);
}

#[test]
fn test_callbacks_never_overlap() {
    let runner = LoopRunner::default();
    runner.init().unwrap();
    runner.run().unwrap();

    let active = Arc::new(AtomicUsize::new(0));
    let overlaps = Arc::new(AtomicUsize::new(0));
    let (tx, rx) = mpsc::channel();

    for _ in 0..50 {
        let active = Arc::clone(&active);
        let overlaps = Arc::clone(&overlaps);
        let tx = tx.clone();
        runner
            .post(move || {
                if active.fetch_add(1, Ordering::SeqCst) != 0 {
                    overlaps.fetch_add(1, Ordering::SeqCst);
                }
                thread::sleep(Duration::from_micros(200));
                active.fetch_sub(1, Ordering::SeqCst);
                tx.send(()).unwrap();
            })
            .unwrap();
    }

    for _ in 0..50 {
        rx.recv_timeout(DEADLINE).unwrap();
    }
    runner.stop().unwrap();
    assert_eq!(overlaps.load(Ordering::SeqCst), 0);
}

#[test]
fn test_event_topic_on_loop() {
    let runner = LoopRunner::default();
    runner.init().unwrap();

    let (topic, pump) = EventTopic::new(4);
    let stats = runner.spawn(pump.run()).unwrap();
    let mut subscriber = topic.register("host").unwrap();
    runner.run().unwrap();

    topic
        .publish(RouterEvent {
            name: "edge-7".to_string(),
            address: "tls:edge-7:3022".to_string(),
            version: None,
            status: RouterStatus::Connected,
        })
        .unwrap();

    let event = subscriber.blocking_recv().unwrap();
    assert_eq!(event.as_router().unwrap().name, "edge-7");

    topic.shutdown().unwrap();
    let (tx, rx) = mpsc::channel();
    runner
        .spawn(async move {
            let _ = tx.send(stats.await.map(|s| s.delivered));
        })
        .unwrap();
    assert_eq!(rx.recv_timeout(DEADLINE).unwrap().unwrap(), 1);

    runner.stop().unwrap();
}

#[test]
fn test_dump_running_loop_to_file() {
    let temp_dir = TempDir::new().unwrap();
    let runner = LoopRunner::with_config(LoopRunnerConfig::new("dump-test").with_log_level(LogLevel::Warn));
    runner.init().unwrap();
    runner.run().unwrap();

    let path = dump_path(temp_dir.path(), "office");
    let written = dump_to_file(&runner, &path).unwrap();
    runner.stop().unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content.lines().count(), written);
    assert!(content.contains("loop state: running"));
    assert!(content.contains("loop thread: dump-test"));
    assert!(content.contains("log level: warn (3)"));
}
