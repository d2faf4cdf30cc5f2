//! Log capture for asserting on what the crate reports internally
//!
//! A process-wide `log` backend records messages into a buffer owned by the
//! calling thread, so parallel tests never see each other's output.

use std::cell::RefCell;
use std::sync::Once;

use log::{Level, LevelFilter, Log, Metadata, Record};

/// One captured log line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedLog {
    pub level: Level,
    pub message: String,
}

thread_local! {
    static CAPTURED: RefCell<Option<Vec<CapturedLog>>> = const { RefCell::new(None) };
}

struct ThreadCapture;

static LOGGER: ThreadCapture = ThreadCapture;
static INSTALL: Once = Once::new();

impl Log for ThreadCapture {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        CAPTURED.with(|captured| {
            if let Some(logs) = captured.borrow_mut().as_mut() {
                logs.push(CapturedLog {
                    level: record.level(),
                    message: record.args().to_string(),
                });
            }
        });
    }

    fn flush(&self) {}
}

/// Run `f` and return its result with every log line it emitted on this thread
///
/// # Panics
///
/// Panics if another logger was installed first, since nothing would be captured.
pub fn capture_logs<R>(f: impl FnOnce() -> R) -> (R, Vec<CapturedLog>) {
    INSTALL.call_once(|| {
        log::set_logger(&LOGGER).expect("capture logger must be the first logger installed");
        log::set_max_level(LevelFilter::Trace);
    });

    CAPTURED.with(|captured| *captured.borrow_mut() = Some(Vec::new()));
    let result = f();
    let logs = CAPTURED.with(|captured| captured.borrow_mut().take().unwrap_or_default());
    (result, logs)
}
