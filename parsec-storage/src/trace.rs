//! Test-only logging bootstrap, in the shape of `kv-cli/src/trace.rs`'s
//! `init_logging` but trimmed down to a stderr sink: this crate ships no
//! CLI binary (spec.md §1 Non-goals), so there is no daily-rotating log
//! file to own -- only `#[cfg(test)]`/integration-test code ever calls
//! `init_test_logging`, to surface `log::{debug,info,warn,error}!` call
//! sites made throughout the crate while a test runs.
use std::str::FromStr;
use std::sync::Once;

use log::LevelFilter;

static INIT: Once = Once::new();

/// Installs a `fern` dispatcher writing to stderr at `level` (e.g.
/// `"debug"`), once per process. Safe to call from every test that wants
/// logging -- later calls are no-ops.
pub fn init_test_logging(level: &str) {
    let level = LevelFilter::from_str(level).unwrap_or(LevelFilter::Info);
    INIT.call_once(|| {
        let dispatch = fern::Dispatch::new()
            .format(|out, message, record| {
                out.finish(format_args!(
                    "[{}] - {} - [{}] {}",
                    chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
                    record.level(),
                    record.target(),
                    message
                ))
            })
            .level(level)
            .chain(std::io::stderr());
        // Two test binaries can race to install the global logger; either
        // one winning is fine, so the error from the loser is ignored.
        let _ = dispatch.apply();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init_test_logging("debug");
        init_test_logging("debug");
        log::info!("logging initialized twice without panicking");
    }
}
