use std::fs;
use std::sync::mpsc;
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use filelog::{FileSink, Level, LogRecord};
use tempfile::tempdir;

#[test]
fn full_queue_blocks_producer_until_writer_catches_up() {
    let dir = tempdir().expect("tempdir");
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let release_rx = Mutex::new(release_rx);
    let (started_tx, started_rx) = mpsc::channel::<()>();
    let started_tx = Mutex::new(started_tx);

    let formatter = move |_template: &str, record: &LogRecord| {
        if record.message == "block" {
            let _ = started_tx.lock().expect("lock").send(());
            let _ = release_rx.lock().expect("lock").recv();
        }
        format!("{}\n", record.message)
    };
    let sink = FileSink::builder(dir.path().join("app"))
        .formatter(formatter)
        .queue_capacity(1)
        .build()
        .expect("sink");

    sink.log(Level::Info, "test", "block").expect("first");
    started_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("writer picked up first record");
    sink.log(Level::Info, "test", "queued").expect("second");

    let handle = sink.handle();
    let (done_tx, done_rx) = mpsc::channel();
    let producer = thread::spawn(move || {
        handle.log(Level::Info, "test", "blocked").expect("third");
        done_tx.send(()).expect("done");
    });

    assert!(done_rx.recv_timeout(Duration::from_millis(200)).is_err());

    release_tx.send(()).expect("release");
    done_rx
        .recv_timeout(Duration::from_secs(5))
        .expect("producer unblocked");
    producer.join().expect("producer");
    sink.close().expect("close");

    assert_eq!(
        fs::read_to_string(dir.path().join("app.log")).expect("read"),
        "block\nqueued\nblocked\n"
    );
}
