//! Test-only `log` backend that records warnings per test thread.

use std::sync::{Mutex, Once};
use std::thread::{self, ThreadId};

use log::{Level, LevelFilter, Log, Metadata, Record};

static RECORDS: Mutex<Vec<(ThreadId, Level, String)>> = Mutex::new(Vec::new());
static INSTALL: Once = Once::new();
static LOGGER: Capture = Capture;

struct Capture;

impl Log for Capture {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if let Ok(mut records) = RECORDS.lock() {
            records.push((thread::current().id(), record.level(), record.args().to_string()));
        }
    }

    fn flush(&self) {}
}

/// Run `f` and return its result plus the warnings it logged on this thread.
pub(crate) fn warnings_during<T>(f: impl FnOnce() -> T) -> (T, Vec<String>) {
    INSTALL.call_once(|| {
        let _ = log::set_logger(&LOGGER);
        log::set_max_level(LevelFilter::Trace);
    });

    let me = thread::current().id();
    RECORDS.lock().unwrap().retain(|(t, _, _)| *t != me);

    let out = f();

    let warnings = RECORDS
        .lock()
        .unwrap()
        .iter()
        .filter(|(t, level, _)| *t == me && *level == Level::Warn)
        .map(|(_, _, msg)| msg.clone())
        .collect();
    (out, warnings)
}
