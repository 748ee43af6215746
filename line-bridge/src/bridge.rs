//! Worker-Side Line Bridge
//!
//! This module provides the `LineBridge` struct that a worker process uses
//! to receive newline-delimited input and report its result, over any
//! trio of byte streams (normally stdin, stdout, and stderr).
//!
//! # Protocol
//!
//! The stream protocol is line-oriented text:
//! - Input: UTF-8 text, one message per line, terminated by `\n`
//! - Output: a single JSON document `{"result": <value>}` per call to
//!   [`LineBridge::send`], no trailing newline
//! - Errors: free-form text on the error stream, written verbatim
//!
//! # Safety
//!
//! This implementation:
//! - Uses pure async I/O (the listen loop suspends until input is ready,
//!   it never polls with a zero timeout)
//! - Flushes after every write so output survives an abrupt worker exit
//! - Serializes before writing, so a failed encode leaves the output
//!   stream untouched

use serde::Serialize;
use thiserror::Error;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stderr, Stdin, Stdout,
};
use tracing::{debug, trace};

use crate::envelope;

/// Opaque failure returned by a line handler.
pub type HandlerFault = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur during bridge operations
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Failed to serialize result payload: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Stream I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Line handler failed: {0}")]
    HandlerError(#[source] HandlerFault),
}

/// Line-oriented message bridge over an injected trio of streams
pub struct LineBridge<R, W, E> {
    /// Source of newline-delimited input
    reader: R,

    /// Destination for the result envelope
    out: W,

    /// Destination for raw error text
    err: E,
}

impl LineBridge<BufReader<Stdin>, Stdout, Stderr> {
    /// Create a bridge over the process standard streams.
    pub fn stdio() -> Self {
        Self::new(
            BufReader::new(tokio::io::stdin()),
            tokio::io::stdout(),
            tokio::io::stderr(),
        )
    }
}

impl<R, W, E> LineBridge<R, W, E>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    E: AsyncWrite + Unpin,
{
    /// Create a bridge over an arbitrary trio of streams.
    ///
    /// Tests inject in-memory buffers here; production workers normally
    /// use [`LineBridge::stdio`] instead.
    pub fn new(reader: R, out: W, err: E) -> Self {
        Self { reader, out, err }
    }

    /// Read lines from the input stream and invoke `handler` for each one.
    ///
    /// This method:
    /// 1. Suspends until the input stream has data or reaches end of stream
    /// 2. Delivers each line to `handler` exactly once, in arrival order,
    ///    with the trailing `\n` still attached (a final unterminated line
    ///    is delivered without one)
    /// 3. Returns `Ok(())` when the input stream ends
    ///
    /// # Arguments
    ///
    /// * `handler` - Callback invoked once per line; its first failure
    ///   aborts the loop
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::HandlerError` wrapping the handler's failure,
    /// or `BridgeError::IoError` if the stream fails (including input that
    /// is not valid UTF-8). Lines already delivered stay delivered.
    pub async fn listen<F>(&mut self, mut handler: F) -> Result<(), BridgeError>
    where
        F: FnMut(String) -> Result<(), HandlerFault>,
    {
        loop {
            let mut line = String::new();
            let read = self.reader.read_line(&mut line).await?;
            if read == 0 {
                debug!("Input stream ended, leaving listen loop");
                return Ok(());
            }

            trace!(bytes = read, "Line received");
            handler(line).map_err(BridgeError::HandlerError)?;
        }
    }

    /// Serialize `value` and write it as one result envelope.
    ///
    /// This method:
    /// 1. Encodes the full `{"result": <value>}` document in memory
    /// 2. Writes the document to the output stream, no trailing newline
    /// 3. Flushes the output stream
    ///
    /// Consecutive calls concatenate their documents on the stream; hosts
    /// that expect a single result should call this exactly once.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::SerializationError` if `value` cannot be
    /// encoded (non-finite floats included), in which case nothing is
    /// written, or `BridgeError::IoError` if the write or flush fails.
    pub async fn send<T: Serialize>(&mut self, value: &T) -> Result<(), BridgeError> {
        let doc = envelope::encode(value)?;

        self.out.write_all(doc.as_bytes()).await?;
        self.out.flush().await?;

        debug!(payload_len = doc.len(), "Result envelope written");
        Ok(())
    }

    /// Write `message` verbatim to the error stream and flush.
    ///
    /// No framing or encoding is applied; the bytes of `message` appear on
    /// the stream exactly as given.
    pub async fn emit_error(&mut self, message: &str) -> Result<(), BridgeError> {
        self.err.write_all(message.as_bytes()).await?;
        self.err.flush().await?;
        Ok(())
    }
}
