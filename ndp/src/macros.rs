macro_rules! log_warn {
    ($ndp:expr, $($arg:tt)*) => {
        $ndp.log($crate::LogPriority::Warning, format_args!($($arg)*))
    };
}

macro_rules! log_dbg {
    ($ndp:expr, $($arg:tt)*) => {
        $ndp.log($crate::LogPriority::Debug, format_args!($($arg)*))
    };
}
