pub mod builders;
pub mod shell_backend;

use std::sync::Once;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, fmt};

use script_docker::message::Message;

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Run a future with a 10-second timeout.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(Duration::from_secs(10), f)
        .await
        .expect("Test timed out after 10 seconds")
}

/// Everything currently queued on `rx`, without waiting.
pub fn drain_outbound(rx: &mut mpsc::Receiver<Message>) -> Vec<Message> {
    let mut out = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        out.push(msg);
    }
    out
}

/// Lines inside the fenced block labelled `label` (`"STDOUT"` / `"STDERR"`)
/// of a report text. Empty if the block is absent.
pub fn block_lines(text: &str, label: &str) -> Vec<String> {
    let mut lines = text.lines();
    while let Some(line) = lines.next() {
        if line.starts_with(label) {
            // Header, blank line, opening fence.
            let _blank = lines.next();
            let _fence = lines.next();
            return lines
                .take_while(|l| *l != "```")
                .map(str::to_string)
                .collect();
        }
    }
    Vec::new()
}
