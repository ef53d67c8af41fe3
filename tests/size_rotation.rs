use std::fs;

use filelog::{FileSink, Level};
use tempfile::tempdir;

#[test]
fn triggering_record_lands_in_new_file() {
    let dir = tempdir().expect("tempdir");
    let sink = FileSink::builder(dir.path().join("app"))
        .format("%M")
        .rotate_size(10)
        .keep_old_files(true)
        .build()
        .expect("sink");

    // 6 bytes each with the newline
    for message in ["aaaaa", "bbbbb", "ccccc"] {
        sink.log(Level::Info, "test", message).expect("log");
    }
    sink.close().expect("close");

    assert_eq!(
        fs::read_to_string(dir.path().join("app_001.log")).expect("read first"),
        "aaaaa\nbbbbb\n"
    );
    assert_eq!(
        fs::read_to_string(dir.path().join("app_002.log")).expect("read second"),
        "ccccc\n"
    );
}

#[test]
fn header_bytes_do_not_count_toward_limit() {
    let dir = tempdir().expect("tempdir");
    let sink = FileSink::builder(dir.path().join("app"))
        .format("%M")
        .head_foot("a long header line", "")
        .rotate_size(4)
        .keep_old_files(true)
        .build()
        .expect("sink");

    sink.log(Level::Info, "test", "one").expect("log");
    sink.close().expect("close");

    assert_eq!(
        fs::read_to_string(dir.path().join("app_001.log")).expect("read"),
        "a long header line\none\n"
    );
    assert!(!dir.path().join("app_002.log").exists());
}
