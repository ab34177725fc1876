/// Unit tests for log.rs
///
/// The logger slot is process-global, so tests that replace it run
/// serialized.

use serial_test::serial;
use std::sync::{Arc, Mutex};

use crate::log::{set_logger, DefaultLogger, LogEntry, Logger, LogSeverity};

/// Captures entries into a shared vector
struct CaptureLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl Logger for CaptureLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

#[test]
#[serial]
fn test_macros_route_through_installed_logger() {
    let entries = Arc::new(Mutex::new(Vec::new()));
    set_logger(Box::new(CaptureLogger {
        entries: Arc::clone(&entries),
    }));

    crate::engine_info!("aurora::LogTest", "hello {}", 42);
    crate::engine_warn!("aurora::LogTest", "careful");
    crate::engine_error!("aurora::LogTest", "broken");

    let captured = entries.lock().unwrap();
    assert_eq!(captured.len(), 3);
    assert_eq!(captured[0].severity, LogSeverity::Info);
    assert_eq!(captured[0].source, "aurora::LogTest");
    assert_eq!(captured[0].message, "hello 42");
    assert_eq!(captured[1].severity, LogSeverity::Warn);

    // ERROR entries carry file:line
    assert_eq!(captured[2].severity, LogSeverity::Error);
    assert!(captured[2].file.is_some());
    assert!(captured[2].line.is_some());

    set_logger(Box::new(DefaultLogger));
}

#[test]
#[serial]
fn test_severity_ordering() {
    assert!(LogSeverity::Trace < LogSeverity::Debug);
    assert!(LogSeverity::Debug < LogSeverity::Info);
    assert!(LogSeverity::Info < LogSeverity::Warn);
    assert!(LogSeverity::Warn < LogSeverity::Error);
}
