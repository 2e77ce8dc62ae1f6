use std::fmt;

/// Priority of a log line emitted by the library.
///
/// The derived order runs from most to least severe, so a context
/// configured with a floor of [`LogPriority::Info`] emits `Err`, `Warning`
/// and `Info` lines and suppresses `Debug`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogPriority {
    /// Unexpected failures the library recovered from.
    Err,
    /// Dropped or ignored input, such as malformed datagrams.
    Warning,
    /// Coarse lifecycle events.
    Info,
    /// Per-datagram noise.
    Debug,
}

/// The injected logging callback of a context.
///
/// The library never logs through a process-global facility; everything
/// funnels through the sink installed with
/// [`Ndp::set_log_sink`](crate::Ndp::set_log_sink). Without one, log
/// output is discarded.
pub type LogSink = Box<dyn Fn(LogPriority, fmt::Arguments<'_>)>;

/// A ready-made sink that forwards to the `tracing` macros.
#[must_use]
pub fn tracing_sink() -> LogSink {
    Box::new(|priority, args| match priority {
        LogPriority::Err => tracing::error!("{}", args),
        LogPriority::Warning => tracing::warn!("{}", args),
        LogPriority::Info => tracing::info!("{}", args),
        LogPriority::Debug => tracing::debug!("{}", args),
    })
}
