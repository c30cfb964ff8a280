// Conditional logging shim: forwards to `tracing` when the feature is enabled
// and expands to nothing otherwise. Arguments are still type-checked through
// `format_args!` so call sites do not rot when the feature is off.

#[cfg(feature = "tracing")]
macro_rules! log_trace {
  ($($arg:tt)*) => {{
    tracing::trace!($($arg)*);
  }};
}

#[cfg(feature = "tracing")]
macro_rules! log_debug {
  ($($arg:tt)*) => {{
    tracing::debug!($($arg)*);
  }};
}

#[cfg(feature = "tracing")]
macro_rules! log_warn {
  ($($arg:tt)*) => {{
    tracing::warn!($($arg)*);
  }};
}

#[cfg(not(feature = "tracing"))]
macro_rules! log_trace {
  ($($arg:tt)*) => {{
    let _ = format_args!($($arg)*);
  }};
}

#[cfg(not(feature = "tracing"))]
macro_rules! log_debug {
  ($($arg:tt)*) => {{
    let _ = format_args!($($arg)*);
  }};
}

#[cfg(not(feature = "tracing"))]
macro_rules! log_warn {
  ($($arg:tt)*) => {{
    let _ = format_args!($($arg)*);
  }};
}
