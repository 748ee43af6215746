//! Echo Worker
//!
//! The smallest useful bridge worker, kept around as a protocol reference
//! and an end-to-end test fixture:
//! - Reads lines from stdin until the host closes it
//! - Reports every line it saw as one `{"result": [...]}` envelope
//! - Logs to stderr, leaving stdout to the envelope

use line_bridge::LineBridge;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    line_bridge::init_tracing("echo_worker");

    let mut bridge = LineBridge::stdio();

    let mut lines: Vec<String> = Vec::new();
    bridge
        .listen(|line| {
            lines.push(line.trim_end_matches('\n').to_string());
            Ok(())
        })
        .await?;

    info!(received = lines.len(), "Input ended, reporting result");
    bridge.send(&lines).await?;

    Ok(())
}
