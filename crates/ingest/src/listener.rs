//! TCP listener feeding capture-process samples into the gesture engine.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use headput_common::clock::{RateController, SessionClock};
use headput_common::config::ListenerConfig;
use headput_common::error::{HeadputError, HeadputResult};
use headput_face_model::{Channel, MeasurementSample};
use headput_gesture_engine::GestureHandle;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use crate::codec::{decode_line, Frame, MAX_LINE_LEN};

/// How often blocked accepts and reads wake up to check the stop flag.
const STOP_POLL: Duration = Duration::from_millis(100);

const DIAGNOSTIC_CHANNELS: [Channel; 7] = [
    Channel::MouthHeight,
    Channel::MouthWidth,
    Channel::RightEyebrowHeight,
    Channel::LeftEyebrowHeight,
    Channel::Roll,
    Channel::HeadRotation,
    Channel::HeadPitch,
];

/// Counters reported when the listener stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerStats {
    pub clients: u64,
    pub samples: u64,
    pub images: u64,
    pub skipped: u64,
}

/// Serves one capture client at a time until the stop flag is set.
pub struct SampleListener {
    listener: TcpListener,
    handle: GestureHandle,
    stop_flag: Arc<AtomicBool>,
    reconnect_delay: Duration,
    diagnostics: RateController,
    clock: SessionClock,
    stats: ListenerStats,
}

impl SampleListener {
    /// Bind the configured address.
    pub async fn bind(
        config: &ListenerConfig,
        handle: GestureHandle,
        stop_flag: Arc<AtomicBool>,
    ) -> HeadputResult<Self> {
        let listener = TcpListener::bind(&config.bind_addr).await.map_err(|e| {
            HeadputError::ingest(format!("Failed to bind {}: {e}", config.bind_addr))
        })?;

        Ok(Self {
            listener,
            handle,
            stop_flag,
            reconnect_delay: Duration::from_secs(1),
            diagnostics: RateController::new(config.diagnostics_hz),
            clock: SessionClock::start(),
            stats: ListenerStats::default(),
        })
    }

    /// Pause between a client disconnecting and accepting the next one.
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn local_addr(&self) -> HeadputResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept and serve clients until the stop flag is set.
    pub async fn run(mut self) -> HeadputResult<ListenerStats> {
        tracing::info!(addr = %self.local_addr()?, "Sample listener started");

        while !self.stop_flag.load(Ordering::Relaxed) {
            let accepted = match tokio::time::timeout(STOP_POLL, self.listener.accept()).await {
                Ok(accepted) => accepted,
                Err(_) => continue,
            };

            match accepted {
                Ok((stream, peer)) => {
                    self.stats.clients += 1;
                    tracing::info!(peer = %peer, "Client connected");
                    if let Err(e) = self.serve_client(stream).await {
                        tracing::warn!(error = %e, peer = %peer, "Client connection failed");
                    }
                    tracing::info!(peer = %peer, "Client disconnected");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Connection error");
                }
            }

            tokio::time::sleep(self.reconnect_delay).await;
        }

        tracing::info!(
            clients = self.stats.clients,
            samples = self.stats.samples,
            skipped = self.stats.skipped,
            "Sample listener stopped"
        );
        Ok(self.stats)
    }

    async fn serve_client(&mut self, stream: TcpStream) -> HeadputResult<()> {
        let mut reader = BufReader::new(stream);
        let mut line = Vec::new();

        while !self.stop_flag.load(Ordering::Relaxed) {
            // Partial reads accumulate in `line` across timeouts, so the
            // budget shrinks with what is already buffered.
            let budget = (MAX_LINE_LEN + 1).saturating_sub(line.len()) as u64;
            let mut bounded = (&mut reader).take(budget);
            let read =
                match tokio::time::timeout(STOP_POLL, bounded.read_until(b'\n', &mut line)).await {
                    Ok(read) => Some(read?),
                    Err(_) => None,
                };
            if line.len() > MAX_LINE_LEN {
                return Err(HeadputError::ingest(format!(
                    "Header line exceeds {MAX_LINE_LEN} bytes"
                )));
            }
            let Some(read) = read else {
                continue;
            };
            if read == 0 {
                return Ok(());
            }
            if !line.ends_with(b"\n") {
                // EOF in the middle of a line; the next read reports it.
                continue;
            }

            let frame = decode_line(&String::from_utf8_lossy(&line));
            line.clear();

            match frame {
                Frame::Sample(sample) => {
                    self.stats.samples += 1;
                    self.emit_diagnostics(&sample);
                    self.handle.process_sample(&sample);
                }
                Frame::Image { len } => {
                    let discarded = tokio::io::copy(
                        &mut (&mut reader).take(len as u64),
                        &mut tokio::io::sink(),
                    )
                    .await?;
                    if discarded < len as u64 {
                        return Ok(());
                    }
                    self.stats.images += 1;
                }
                Frame::Skip => self.stats.skipped += 1,
            }
        }

        Ok(())
    }

    fn emit_diagnostics(&mut self, sample: &MeasurementSample) {
        if !tracing::enabled!(tracing::Level::DEBUG)
            || !self.diagnostics.should_tick(self.clock.elapsed_ns())
        {
            return;
        }
        let values = self.handle.with_engine(|engine| {
            DIAGNOSTIC_CHANNELS.map(|channel| engine.resolve(sample, channel))
        });
        tracing::debug!(
            mouth_height = values[0],
            mouth_width = values[1],
            right_eyebrow = values[2],
            left_eyebrow = values[3],
            roll = values[4],
            head_rotation = values[5],
            head_pitch = values[6],
            "Channels"
        );
    }
}
