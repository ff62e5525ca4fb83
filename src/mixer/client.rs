//! TCP client for the mixer API
//!
//! Connection establishment retries while the mixer is not reachable,
//! writes are serialized behind one async mutex, and a receiver task turns
//! the read half into a stream of lines.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::io::ErrorKind;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use super::{CommandSink, MixerCommand, MixerError, Result};

/// Capacity of the incoming line queue
pub const LINE_QUEUE_CAPACITY: usize = 64;

/// How connection attempts are repeated
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Wait between attempts after a refused or timed out dial
    pub interval: Duration,
    /// Upper bound for a single dial
    pub dial_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            dial_timeout: Duration::from_secs(20),
        }
    }
}

fn is_transient(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::ConnectionRefused | ErrorKind::TimedOut | ErrorKind::WouldBlock
    )
}

/// Open a TCP connection, retrying forever while the mixer is unreachable
///
/// Any error other than refused/timed out is returned as [`MixerError::Fatal`].
pub async fn dial(addr: &str, policy: RetryPolicy) -> Result<TcpStream> {
    loop {
        match timeout(policy.dial_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => {
                if let Err(e) = stream.set_nodelay(true) {
                    debug!("Could not disable Nagle on mixer socket: {}", e);
                }
                return Ok(stream);
            }
            Ok(Err(e)) if is_transient(&e) => {
                warn!(
                    "Mixer at {} is not reachable ({}), retrying in {:?}",
                    addr, e, policy.interval
                );
            }
            Ok(Err(e)) => {
                return Err(MixerError::Fatal {
                    addr: addr.to_string(),
                    source: e,
                });
            }
            Err(_) => {
                warn!(
                    "Connection to mixer at {} timed out, retrying in {:?}",
                    addr, policy.interval
                );
            }
        }
        sleep(policy.interval).await;
    }
}

/// Connected mixer API client
pub struct MixerClient {
    addr: String,
    policy: RetryPolicy,
    writer: tokio::sync::Mutex<Option<BufWriter<OwnedWriteHalf>>>,
    reader: Mutex<Option<BufReader<OwnedReadHalf>>>,
}

impl MixerClient {
    /// Connect to the mixer, waiting until it accepts the connection
    pub async fn connect(addr: impl Into<String>, policy: RetryPolicy) -> Result<Self> {
        let addr = addr.into();
        let stream = dial(&addr, policy).await?;
        info!("🎛️  Connected to mixer at {}", addr);

        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            addr,
            policy,
            writer: tokio::sync::Mutex::new(Some(BufWriter::new(write_half))),
            reader: Mutex::new(Some(BufReader::new(read_half))),
        })
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Re-dial with the same policy and replace both halves of the link
    ///
    /// Sends issued while the link is down fail with `NotConnected`.
    pub async fn reconnect(&self) -> Result<()> {
        *self.writer.lock().await = None;
        *self.reader.lock() = None;

        let stream = dial(&self.addr, self.policy).await?;
        let (read_half, write_half) = stream.into_split();
        *self.reader.lock() = Some(BufReader::new(read_half));
        *self.writer.lock().await = Some(BufWriter::new(write_half));

        info!("🎛️  Reconnected to mixer at {}", self.addr);
        Ok(())
    }

    /// Send one command line
    ///
    /// The writer lock is held for the whole write and flush so concurrent
    /// senders never interleave. Failures are reported, not retried.
    pub async fn send(&self, command: &MixerCommand) -> Result<()> {
        let line = format!("{}\r\n", command);

        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(MixerError::NotConnected)?;
        writer
            .write_all(line.as_bytes())
            .await
            .map_err(MixerError::Write)?;
        writer.flush().await.map_err(MixerError::Write)?;
        drop(guard);

        debug!("→ mixer: {}", command);
        Ok(())
    }

    /// Subscribe to activator notifications
    pub async fn subscribe(&self) -> Result<()> {
        self.send(&MixerCommand::subscribe_acts()).await
    }

    /// Spawn the task reading lines from the current connection
    ///
    /// Each line is published without its CR/LF. The task ends on EOF, on a
    /// read error or when the queue is closed; its handle is the completion
    /// token for this link.
    pub fn spawn_receiver(&self, tx: mpsc::Sender<String>) -> Result<JoinHandle<()>> {
        let mut reader = self.reader.lock().take().ok_or(MixerError::NotConnected)?;
        let addr = self.addr.clone();

        Ok(tokio::spawn(async move {
            let mut buf = Vec::new();
            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf).await {
                    Ok(0) => {
                        warn!("Mixer at {} closed the connection", addr);
                        break;
                    }
                    Ok(_) => {
                        let text = String::from_utf8_lossy(&buf);
                        let line = text.trim_end_matches(['\r', '\n']);
                        if line.is_empty() {
                            continue;
                        }
                        debug!("← mixer: {}", line);
                        if tx.send(line.to_string()).await.is_err() {
                            debug!("Mixer line queue closed, receiver exiting");
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("{}", MixerError::Read(e));
                        break;
                    }
                }
            }
        }))
    }
}

#[async_trait]
impl CommandSink for MixerClient {
    async fn send(&self, command: &MixerCommand) -> Result<()> {
        MixerClient::send(self, command).await
    }
}
