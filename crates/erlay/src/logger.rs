//! Logging collaborator handed to every layout stage.
//!
//! Layout stages never reach for a process-wide logger on their own. Instead
//! they receive a [`LayoutLogger`], a cheap copyable handle wrapping any
//! [`log::Log`] implementation plus the target the stage logs under. By
//! default the handle forwards to whatever logger the application installed
//! through the `log` facade; tests and embedders can inject their own sink.

use std::fmt;

use log::{Level, Log, Metadata, Record};

/// Target used by the layout facade itself.
pub const TARGET_ROOT: &str = "erlay";

/// A handle to a log sink with a fixed target.
#[derive(Clone, Copy)]
pub struct LayoutLogger<'l> {
    sink: &'l dyn Log,
    target: &'static str,
}

impl LayoutLogger<'static> {
    /// Returns a handle forwarding to the logger installed in the `log` facade.
    ///
    /// If no logger has been installed every record is discarded.
    pub fn global() -> Self {
        Self {
            sink: log::logger(),
            target: TARGET_ROOT,
        }
    }
}

impl<'l> LayoutLogger<'l> {
    /// Create a handle forwarding to `sink`.
    pub fn new(sink: &'l dyn Log) -> Self {
        Self {
            sink,
            target: TARGET_ROOT,
        }
    }

    /// Returns a copy of this handle logging under `target`.
    pub fn for_stage(self, target: &'static str) -> Self {
        Self { target, ..self }
    }

    /// Returns the target records are emitted under.
    pub fn target(&self) -> &'static str {
        self.target
    }

    /// Returns `true` if the sink accepts records at `level` for this target.
    pub fn enabled(&self, level: Level) -> bool {
        let metadata = Metadata::builder()
            .level(level)
            .target(self.target)
            .build();
        self.sink.enabled(&metadata)
    }

    pub fn info(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Info, args);
    }

    pub fn debug(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Debug, args);
    }

    pub fn trace(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Trace, args);
    }

    fn emit(&self, level: Level, args: fmt::Arguments<'_>) {
        if !self.enabled(level) {
            return;
        }

        self.sink.log(
            &Record::builder()
                .args(args)
                .level(level)
                .target(self.target)
                .module_path_static(Some(module_path!()))
                .build(),
        );
    }
}

impl Default for LayoutLogger<'static> {
    fn default() -> Self {
        Self::global()
    }
}

impl fmt::Debug for LayoutLogger<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutLogger")
            .field("target", &self.target)
            .finish()
    }
}


#[cfg(test)]
mod tests {
    use super::{capture::CaptureLog, *};

    #[test]
    fn test_records_carry_stage_target() {
        let sink = CaptureLog::default();
        let logger = LayoutLogger::new(&sink).for_stage("erlay::layering");

        logger.debug(format_args!("placed {} at layer {}", "users", 2));

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].0, Level::Debug);
        assert_eq!(records[0].1, "erlay::layering");
        assert_eq!(records[0].2, "placed users at layer 2");
    }

    #[test]
    fn test_global_logger_without_installed_logger_is_silent() {
        // No logger is installed in unit tests, so nothing is enabled.
        let logger = LayoutLogger::global();
        assert_eq!(logger.target(), TARGET_ROOT);
        logger.trace(format_args!("discarded"));
    }
}
