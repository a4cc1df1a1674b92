// Logging bridge: forwards `log` records to the engine's log sink.

use jsbridge_ffi::JsLoggingApi;
use log::{Level, LevelFilter, Log, Metadata, Record};

use crate::error::{BridgeError, BridgeResult};

/// Level codes understood by `JsLoggingApi::log`.
pub const LOG_TRACE: u8 = 0;
pub const LOG_DEBUG: u8 = 1;
pub const LOG_INFO: u8 = 2;
pub const LOG_WARN: u8 = 3;
pub const LOG_ERROR: u8 = 4;

pub fn level_code(level: Level) -> u8 {
    match level {
        Level::Trace => LOG_TRACE,
        Level::Debug => LOG_DEBUG,
        Level::Info => LOG_INFO,
        Level::Warn => LOG_WARN,
        Level::Error => LOG_ERROR,
    }
}

/// `log::Log` implementation writing to the engine's logging sub-table.
pub struct EngineLogger {
    api: *const JsLoggingApi,
    level: LevelFilter,
}

// SAFETY: the logging sub-table is immutable and lives as long as the engine
// library; its `log` entry point is documented as callable from any thread.
unsafe impl Send for EngineLogger {}
unsafe impl Sync for EngineLogger {}

impl EngineLogger {
    /// # Safety
    /// `api` must be null or point to a logging table that outlives the
    /// process-wide logger.
    pub unsafe fn new(api: *const JsLoggingApi, level: LevelFilter) -> Self {
        EngineLogger { api, level }
    }
}

impl Log for EngineLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        !self.api.is_null() && metadata.level() <= self.level
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let msg = format!("[{}] {}", record.target(), record.args());
        let bytes = msg.as_bytes();
        // SAFETY: non-null checked in `enabled`; table validity is the
        // constructor's contract.
        unsafe {
            ((*self.api).log)(level_code(record.level()), bytes.as_ptr(), bytes.len() as u32);
        }
    }

    fn flush(&self) {}
}

/// Install an `EngineLogger` as the process-wide `log` backend.
///
/// Fails if another logger is already installed.
///
/// # Safety
/// Same contract as [`EngineLogger::new`].
pub unsafe fn install_engine_logger(
    api: *const JsLoggingApi,
    level: LevelFilter,
) -> BridgeResult<()> {
    if api.is_null() {
        return Err(BridgeError::Config("engine has no logging table".into()));
    }
    // SAFETY: forwarded caller contract.
    let logger = unsafe { EngineLogger::new(api, level) };
    log::set_boxed_logger(Box::new(logger))
        .map_err(|e| BridgeError::Config(format!("logger already installed: {e}")))?;
    log::set_max_level(level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static SEEN: Mutex<Vec<(u8, String)>> = Mutex::new(Vec::new());

    unsafe extern "C" fn capture(level: u8, msg: *const u8, len: u32) {
        let text = unsafe { std::slice::from_raw_parts(msg, len as usize) };
        SEEN.lock()
            .unwrap()
            .push((level, String::from_utf8_lossy(text).into_owned()));
    }

    static TABLE: JsLoggingApi = JsLoggingApi { log: capture };

    #[test]
    fn records_reach_the_engine_with_level_codes() {
        let logger = unsafe { EngineLogger::new(&TABLE, LevelFilter::Info) };
        logger.log(
            &Record::builder()
                .level(Level::Warn)
                .target("jsbridge")
                .args(format_args!("careful"))
                .build(),
        );
        logger.log(
            &Record::builder()
                .level(Level::Debug)
                .target("jsbridge")
                .args(format_args!("filtered"))
                .build(),
        );
        let seen = SEEN.lock().unwrap();
        assert_eq!(seen.as_slice(), &[(LOG_WARN, "[jsbridge] careful".to_owned())]);
    }

    #[test]
    fn null_table_is_disabled() {
        let logger = unsafe { EngineLogger::new(std::ptr::null(), LevelFilter::Trace) };
        assert!(!logger.enabled(&Metadata::builder().level(Level::Error).build()));
    }
}
