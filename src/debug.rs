use std::sync::atomic::{AtomicBool, Ordering};

static ENABLED: AtomicBool = AtomicBool::new(false);

/// Turn on `--debug` step tracing for the rest of the process.
pub fn enable() {
    ENABLED.store(true, Ordering::Relaxed);
}

/// Whether step tracing is enabled.
pub fn enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

/// Format a trace line: `pmount: <message>`.
pub fn format_trace(msg: &str) -> String {
    format!("pmount: {msg}")
}

/// Print a trace line to stderr when `--debug` is active.
pub fn trace(msg: &str) {
    if enabled() {
        eprintln!("{}", format_trace(msg));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_trace_prefixes_program_name() {
        assert_eq!(format_trace("resolving device"), "pmount: resolving device");
    }
}
