//! Upstream ingest loop.
//!
//! One TCP connection to the producer, newline-delimited JSON arrays, each
//! line one [`Sample`]. The loop is fail-stop: a connect error, a read error
//! or a line that does not decode ends it, and nothing reconnects. EOF ends
//! it cleanly. Either way the buffer, registry and subscribers are untouched
//! and keep serving.

use std::sync::Arc;

use futures_util::StreamExt;
use pulse_protocol::Sample;
use tokio::io::AsyncRead;
use tokio::net::TcpStream;
use tokio_util::codec::{FramedRead, LinesCodec};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::error::IngestError;
use crate::relay::Relay;
use crate::task::TaskHandle;

/// Why a loop that did not fail came to a stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestExit {
    /// Producer closed the connection.
    Eof,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    pub exit: IngestExit,
    pub samples: u64,
}

/// Feed `relay` from `reader` until EOF, cancellation or the first error.
///
/// `reader` is consumed and dropped on return, which closes the connection.
pub async fn run<R>(
    relay: &Relay,
    reader: R,
    cancel: &CancellationToken,
) -> Result<IngestReport, IngestError>
where
    R: AsyncRead + Unpin,
{
    let mut lines = FramedRead::new(reader, LinesCodec::new());
    let mut samples = 0u64;

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Ok(IngestReport { exit: IngestExit::Cancelled, samples });
            }
            next = lines.next() => next,
        };

        let Some(line) = next else {
            return Ok(IngestReport { exit: IngestExit::Eof, samples });
        };
        let line = line?;
        let sample = Sample::from_line(&line).map_err(|source| IngestError::Decode {
            line: samples + 1,
            source,
        })?;
        relay.ingest(sample);
        samples += 1;
    }
}

/// Connect to `addr`, honouring cancellation while the connect is pending.
async fn connect(addr: &str, cancel: &CancellationToken) -> Option<Result<TcpStream, IngestError>> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        res = TcpStream::connect(addr) => Some(res.map_err(|source| IngestError::Connect {
            addr: addr.to_string(),
            source,
        })),
    }
}

/// Spawn the ingest loop against the producer at `addr` (`host:port`).
pub fn spawn(relay: Arc<Relay>, addr: String) -> TaskHandle {
    TaskHandle::spawn("ingest", move |cancel| async move {
        info!(%addr, "connecting to upstream producer");
        let stream = match connect(&addr, &cancel).await {
            None => {
                info!(%addr, "ingest cancelled before connecting");
                return;
            }
            Some(Err(e)) => {
                error!(error = %e, "ingest loop stopped; upstream will not be retried");
                return;
            }
            Some(Ok(stream)) => stream,
        };
        info!(%addr, "upstream connected");

        match run(&relay, stream, &cancel).await {
            Ok(IngestReport { exit: IngestExit::Cancelled, samples }) => {
                info!(%addr, samples, "ingest loop cancelled; upstream connection closed");
            }
            Ok(IngestReport { exit: IngestExit::Eof, samples }) => {
                warn!(%addr, samples, "upstream closed the connection; feed is now stalled");
            }
            Err(e) => {
                error!(%addr, error = %e, "ingest loop stopped; upstream will not be retried");
            }
        }
    })
}
