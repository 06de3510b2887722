/// Contains the backtrace information if available.
///
/// Capturing is only done in debug builds, where launch failures are most likely to be inspected.
#[derive(Clone)]
pub struct BackTrace {
    inner: String,
}

impl BackTrace {
    /// Creates a new backtrace from the current thread.
    pub fn capture() -> Self {
        Self {
            #[cfg(debug_assertions)]
            inner: format!("{}", std::backtrace::Backtrace::force_capture()),
            #[cfg(not(debug_assertions))]
            inner: String::from("No backtrace available in release builds"),
        }
    }
}

impl core::fmt::Debug for BackTrace {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_fmt(format_args!("{}", self.inner))
    }
}

impl core::fmt::Display for BackTrace {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_fmt(format_args!("{}", self.inner))
    }
}
