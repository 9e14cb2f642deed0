// Licensed under the Apache-2.0 license

//! Logging seam shared by the bench components.
//!
//! Components that report progress take a `Logger` type parameter that
//! defaults to [`NoOpLogger`], so a silent bench costs nothing. A host runner
//! plugs in [`WriterLogger`] over any `embedded_io::Write` sink.

use core::fmt;

/// Severity of a log record.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Error,
}

impl LogLevel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Error => "ERROR",
        }
    }
}

/// Sink for bench log records.
pub trait Logger {
    /// Emit one record at `level`.
    fn log(&mut self, level: LogLevel, args: fmt::Arguments<'_>);

    fn debug(&mut self, args: fmt::Arguments<'_>) {
        self.log(LogLevel::Debug, args);
    }

    fn info(&mut self, args: fmt::Arguments<'_>) {
        self.log(LogLevel::Info, args);
    }

    fn error(&mut self, args: fmt::Arguments<'_>) {
        self.log(LogLevel::Error, args);
    }
}

impl<L: Logger + ?Sized> Logger for &mut L {
    fn log(&mut self, level: LogLevel, args: fmt::Arguments<'_>) {
        (**self).log(level, args);
    }
}

/// Logger that discards every record.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoOpLogger;

impl Logger for NoOpLogger {
    fn log(&mut self, _level: LogLevel, _args: fmt::Arguments<'_>) {}
}

/// Logger writing `[LEVEL] message` lines to an embedded-io sink.
///
/// Records below `min_level` are dropped. Write failures are swallowed: a
/// broken log sink must never change the outcome of a scenario.
pub struct WriterLogger<W: embedded_io::Write> {
    writer: W,
    min_level: LogLevel,
}

impl<W: embedded_io::Write> WriterLogger<W> {
    pub fn new(writer: W, min_level: LogLevel) -> Self {
        Self { writer, min_level }
    }

    /// Give back the underlying sink.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: embedded_io::Write> Logger for WriterLogger<W> {
    fn log(&mut self, level: LogLevel, args: fmt::Arguments<'_>) {
        if level < self.min_level {
            return;
        }
        let _ = write!(self.writer, "[{}] ", level.as_str());
        let _ = self.writer.write_fmt(args);
        let _ = self.writer.write_all(b"\r\n");
    }
}
