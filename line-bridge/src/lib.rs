//! Line Bridge - Line-Oriented Stdio Message Bridge
//!
//! This crate provides the plumbing for host processes and worker
//! subprocesses that talk over plain pipes: newline-delimited text in,
//! a single JSON result envelope out, free-form error text on stderr.
//!
//! # Architecture
//!
//! - `bridge` is the worker side: a `LineBridge` reads lines from its
//!   input stream and writes the result envelope to its output stream
//! - `envelope` is the wire format shared by both sides
//! - `host` is the supervisor side: spawning workers, feeding their
//!   stdin, and collecting what they leave on stdout and stderr
//!
//! # Example
//!
//! ```ignore
//! use line_bridge::LineBridge;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut bridge = LineBridge::stdio();
//!
//!     let mut lines: Vec<String> = Vec::new();
//!     bridge
//!         .listen(|line| {
//!             lines.push(line);
//!             Ok(())
//!         })
//!         .await?;
//!
//!     bridge.send(&lines).await?;
//!     Ok(())
//! }
//! ```

pub mod bridge;
pub mod envelope;
pub mod host;

// Re-export main types for convenience
pub use bridge::{BridgeError, HandlerFault, LineBridge};
pub use envelope::ResultEnvelope;
pub use host::{WorkerError, WorkerOutput, WorkerProcess, WorkerRegistry};

/// Initialize tracing with standard configuration
///
/// Log output goes to stderr: stdout is reserved for the result envelope
/// in worker binaries.
pub fn init_tracing(service_name: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{}=info", service_name)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exports() {
        let envelope = ResultEnvelope { result: 42 };
        assert_eq!(envelope.result, 42);
    }
}
