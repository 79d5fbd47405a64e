//! Memory and timing profiling utilities
//!
//! - Memory: Reads RSS (Resident Set Size) from /proc/self/status
//! - Timing: Uses std::time::Instant for precise measurements
//!
//! Checkpoints are emitted at `debug` level under the `memprof` target, so
//! `RUST_LOG=memprof=debug` turns them on without the rest of the noise.

use std::fs;
use std::time::Instant;
use tracing::debug;

/// Get current RSS (Resident Set Size) in bytes from /proc/self/status
///
/// Returns 0 where the file does not exist (non-Linux).
pub fn get_rss_bytes() -> u64 {
    fs::read_to_string("/proc/self/status")
        .ok()
        .and_then(|status| parse_vm_rss(&status))
        .unwrap_or(0)
}

/// Extract VmRSS in bytes from the contents of /proc/self/status
fn parse_vm_rss(status: &str) -> Option<u64> {
    // Format: "VmRSS:    123456 kB"
    let line = status.lines().find(|line| line.starts_with("VmRSS:"))?;
    let kb = line.split_whitespace().nth(1)?.parse::<u64>().ok()?;
    Some(kb * 1024)
}

/// Get current RSS in megabytes
pub fn get_rss_mb() -> f64 {
    get_rss_bytes() as f64 / (1024.0 * 1024.0)
}

/// Memory checkpoint that returns the value for comparison
pub fn checkpoint(label: &str) -> f64 {
    let rss = get_rss_mb();
    debug!(target: "memprof", "[{:.2} MB]: {}", rss, label);
    rss
}

/// Log the RSS change since a previous checkpoint, returns the current value
pub fn delta(label: &str, previous: f64) -> f64 {
    let current = get_rss_mb();
    debug!(
        target: "memprof",
        "[{:.2} MB] (delta: {:+.2} MB): {}",
        current,
        current - previous,
        label
    );
    current
}

/// Log elapsed time from a previous checkpoint, returns new Instant for chaining
pub fn time_elapsed(label: &str, start: Instant) -> Instant {
    debug!(
        target: "memprof",
        "{} [{:.3}s]",
        label,
        start.elapsed().as_secs_f64()
    );
    Instant::now()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vm_rss() {
        let status = "Name:\tedsmap\nVmPeak:\t  20000 kB\nVmRSS:\t    1234 kB\nThreads:\t1\n";
        assert_eq!(parse_vm_rss(status), Some(1234 * 1024));
    }

    #[test]
    fn test_parse_vm_rss_missing() {
        assert_eq!(parse_vm_rss("Name:\tedsmap\n"), None);
        assert_eq!(parse_vm_rss("VmRSS:\tlots kB\n"), None);
    }

    #[test]
    fn test_delta_returns_current() {
        let before = checkpoint("test start");
        let after = delta("test end", before);
        assert!(after >= 0.0);
    }
}
