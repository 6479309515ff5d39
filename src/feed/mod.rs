//! Feed reader module.
//!
//! One long-lived task per configured sensor owns that sensor's TCP
//! connection, parses incoming records and forwards normalized readings into
//! the monitor's fan-in channel. A dead or slow feed degrades to a stream of
//! FAULTY readings; it never stalls the other readers or the API.

mod wire;

pub use wire::{parse_record, Reading, TIMESTAMP_FORMAT};

use crate::config::SensorConfig;

use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};

/// Feed errors. All of them are recovered locally into FAULTY readings; they
/// never cross the channel to the monitor.
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("connect to {address} failed: {source}")]
    Connect {
        address: String,
        source: std::io::Error,
    },
    #[error("feed closed the connection")]
    Closed,
    #[error("receive failed: {0}")]
    Receive(#[from] std::io::Error),
}

/// A running feed reader task.
pub struct FeedReader {
    sensor: String,
    stop_tx: broadcast::Sender<()>,
    handle: tokio::task::JoinHandle<()>,
}

impl FeedReader {
    /// Spawn the read loop for one sensor. Readings (normal and faulty) are
    /// sent to `tx`; the task runs until [`FeedReader::stop`] is called.
    pub fn spawn(
        sensor: SensorConfig,
        read_timeout: Duration,
        tx: mpsc::Sender<Reading>,
    ) -> Self {
        let (stop_tx, stop_rx) = broadcast::channel(1);
        let name = sensor.name.clone();

        let handle = tokio::spawn(run_read_loop(sensor, read_timeout, tx, stop_rx));

        Self {
            sensor: name,
            stop_tx,
            handle,
        }
    }

    pub fn sensor(&self) -> &str {
        &self.sensor
    }

    /// Cooperative stop: signal the loop and wait for it to notice, bounded
    /// by the receive timeout it is currently blocked on.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(());
        if let Err(e) = self.handle.await {
            tracing::warn!("Feed reader for {} ended abnormally: {}", self.sensor, e);
        }
    }
}

/// Connect-read-reconnect loop for a single sensor feed.
///
/// Connect failures and dropped connections emit one FAULTY reading and retry
/// after `read_timeout`, so a permanently dead feed keeps reporting at the
/// same cadence a healthy one would under receive timeouts.
async fn run_read_loop(
    sensor: SensorConfig,
    read_timeout: Duration,
    tx: mpsc::Sender<Reading>,
    mut stop_rx: broadcast::Receiver<()>,
) {
    loop {
        let stream = tokio::select! {
            _ = stop_rx.recv() => break,
            result = connect(&sensor.address, read_timeout) => match result {
                Ok(stream) => stream,
                Err(e) => {
                    tracing::warn!("Feed {}: {}", sensor.name, e);
                    if tx.send(Reading::synthesized_fault(&sensor.name)).await.is_err() {
                        break;
                    }
                    tokio::select! {
                        _ = stop_rx.recv() => break,
                        _ = tokio::time::sleep(read_timeout) => continue,
                    }
                }
            },
        };

        tracing::info!("Feed {}: connected to {}", sensor.name, sensor.address);
        let mut lines = BufReader::new(stream).lines();

        loop {
            let reading = tokio::select! {
                _ = stop_rx.recv() => return,
                result = next_reading(&sensor.name, &mut lines, read_timeout) => result,
            };

            match reading {
                Ok(reading) => {
                    if tx.send(reading).await.is_err() {
                        return; // monitor is gone, nothing left to feed
                    }
                }
                Err(e) => {
                    tracing::warn!("Feed {}: {}, reconnecting", sensor.name, e);
                    if tx.send(Reading::synthesized_fault(&sensor.name)).await.is_err() {
                        return;
                    }
                    // Pace the reconnect like the connect-failure path, so a
                    // feed that closes on accept cannot spin the loop
                    tokio::select! {
                        _ = stop_rx.recv() => return,
                        _ = tokio::time::sleep(read_timeout) => break,
                    }
                }
            }
        }
    }
}

async fn connect(address: &str, timeout: Duration) -> Result<TcpStream, FeedError> {
    match tokio::time::timeout(timeout, TcpStream::connect(address)).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(source)) => Err(FeedError::Connect {
            address: address.to_string(),
            source,
        }),
        Err(_) => Err(FeedError::Connect {
            address: address.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::TimedOut, "connect timed out"),
        }),
    }
}

/// Read the next record, bounded by the receive timeout.
///
/// A timeout or a malformed line is a per-reading fault (`Ok` with a FAULTY
/// reading, connection kept); EOF and IO errors tear the connection down.
async fn next_reading(
    sensor: &str,
    lines: &mut tokio::io::Lines<BufReader<TcpStream>>,
    read_timeout: Duration,
) -> Result<Reading, FeedError> {
    match tokio::time::timeout(read_timeout, lines.next_line()).await {
        Ok(Ok(Some(line))) => Ok(parse_record(sensor, &line)),
        Ok(Ok(None)) => Err(FeedError::Closed),
        Ok(Err(e)) => Err(FeedError::Receive(e)),
        Err(_) => {
            tracing::warn!("Feed {}: no data within {:?}", sensor, read_timeout);
            Ok(Reading::synthesized_fault(sensor))
        }
    }
}
