// src/monitor/ingestor.rs
//
// Feed connection lifecycle and the per-frame pipeline:
// decode -> session-start check -> enrich -> evaluate -> publish.
// One frame is fully processed before the next one is read.

use chrono::Utc;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{MonitorError, MonitorResult};
use crate::models::FilterSettings;
use crate::monitor::feed::{decode_frame, subscribe_new_token_payload, FeedFrame};
use crate::monitor::filter::{until_cancelled, FilterEngine};
use crate::monitor::opener::LinkOpener;
use crate::monitor::sink::{AcceptedToken, MonitorEvent, StatusLevel, TokenSink};
use crate::monitor::sol_price::SolPrice;
use crate::provider::TokenDataProvider;

// ============================================================================
// STATE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestorState {
    Idle,
    Connecting,
    Subscribed,
    Streaming,
    Stopped,
    /// Transport failure; needs a manual `start` to retry
    Faulted,
}

impl IngestorState {
    pub fn can_start(&self) -> bool {
        matches!(self, IngestorState::Idle | IngestorState::Stopped | IngestorState::Faulted)
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, IngestorState::Stopped | IngestorState::Faulted)
    }
}

/// Configuration for the stream ingestor
#[derive(Debug, Clone)]
pub struct IngestorConfig {
    /// Feed WebSocket URL
    pub feed_ws_url: String,
    /// Prefix of the resource link opened for accepted tokens
    pub resource_base_url: String,
}

impl From<&Config> for IngestorConfig {
    fn from(config: &Config) -> Self {
        Self {
            feed_ws_url: config.feed_ws_url.clone(),
            resource_base_url: config.resource_base_url.clone(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionCounters {
    pub total_observed: u64,
    pub total_accepted: u64,
}

/// What happened to a single frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Control,
    BeforeSession,
    Rejected,
    Accepted,
}

// ============================================================================
// SESSION PIPELINE
// ============================================================================

/// Everything one session needs to turn a frame into sink events.
pub struct SessionPipeline {
    session_id: Uuid,
    engine: FilterEngine,
    provider: Arc<dyn TokenDataProvider>,
    settings: FilterSettings,
    sink: Arc<dyn TokenSink>,
    opener: Arc<dyn LinkOpener>,
    sol_price: SolPrice,
    resource_base_url: String,
    started_at: i64,
    counters: SessionCounters,
}

impl SessionPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session_id: Uuid,
        provider: Arc<dyn TokenDataProvider>,
        settings: FilterSettings,
        sink: Arc<dyn TokenSink>,
        opener: Arc<dyn LinkOpener>,
        sol_price: SolPrice,
        resource_base_url: String,
        started_at: i64,
    ) -> Self {
        Self {
            session_id,
            engine: FilterEngine::new(provider.clone()),
            provider,
            settings,
            sink,
            opener,
            sol_price,
            resource_base_url,
            started_at,
            counters: SessionCounters::default(),
        }
    }

    pub fn counters(&self) -> SessionCounters {
        self.counters
    }

    /// Process one text frame. Decode failures come back as `MonitorError::Decode`
    /// with counters untouched; cancellation as `MonitorError::Cancelled`.
    pub async fn process_frame(&mut self, text: &str, cancel: &CancellationToken) -> MonitorResult<FrameOutcome> {
        let sol_price = self.sol_price.get().await;
        let frame = decode_frame(text, sol_price, Utc::now().timestamp())?;

        let (token, reported_created_at) = match frame {
            FeedFrame::Control(message) => {
                debug!("[{}] Feed control message: {}", self.session_id, message);
                return Ok(FrameOutcome::Control);
            }
            FeedFrame::Token { token, reported_created_at } => (token, reported_created_at),
        };

        if matches!(reported_created_at, Some(created) if created < self.started_at) {
            debug!("[{}] Skipping {} created before session start", self.session_id, token.address);
            return Ok(FrameOutcome::BeforeSession);
        }

        self.counters.total_observed += 1;

        let token = until_cancelled(cancel, self.provider.enrich_token(token)).await?;
        let result = self.engine.evaluate(&token, &self.settings, cancel).await?;

        let outcome = if result.passes {
            self.counters.total_accepted += 1;

            let record = AcceptedToken::from_token(&token, Utc::now().timestamp(), &self.resource_base_url);
            info!("[{}] 🚀 Accepted {} ({}) - {:?}", self.session_id, token.ticker, token.address, result.reasons);

            let resource_url = record.resource_url.clone();
            self.sink.publish(MonitorEvent::TokenAccepted {
                token: record,
                timestamp: Utc::now(),
            });

            if result.should_auto_open() {
                if let Err(e) = self.opener.open(&resource_url) {
                    warn!("[{}] Failed to open {}: {:?}", self.session_id, resource_url, e);
                }
            }
            FrameOutcome::Accepted
        } else {
            debug!("[{}] Rejected {} - {:?}", self.session_id, token.address, result.reasons);
            FrameOutcome::Rejected
        };

        self.sink.publish(MonitorEvent::Counters {
            total_observed: self.counters.total_observed,
            total_accepted: self.counters.total_accepted,
        });

        Ok(outcome)
    }
}

// ============================================================================
// STREAM INGESTOR
// ============================================================================

struct ActiveSession {
    id: Uuid,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

/// The current session, if any. Every state change made on behalf of a
/// session happens while that session still owns this slot.
type SessionSlot = Arc<Mutex<Option<ActiveSession>>>;

/// What a session needs to report its own end.
#[derive(Clone)]
pub(crate) struct SessionControl {
    id: Uuid,
    cancel: CancellationToken,
    slot: SessionSlot,
    state_tx: Arc<watch::Sender<IngestorState>>,
}

impl SessionControl {
    /// Mark the session faulted if it is still the current one.
    /// Returns false when `stop()` (or a newer session) already owns the state.
    async fn fault(&self) -> bool {
        let mut slot = self.slot.lock().await;
        if !matches!(slot.as_ref(), Some(session) if session.id == self.id) {
            return false;
        }
        slot.take();
        self.state_tx.send_replace(IngestorState::Faulted);
        true
    }
}

/// Owns the feed connection. One session at a time.
pub struct StreamIngestor {
    config: IngestorConfig,
    provider: Arc<dyn TokenDataProvider>,
    sink: Arc<dyn TokenSink>,
    opener: Arc<dyn LinkOpener>,
    sol_price: SolPrice,
    state_tx: Arc<watch::Sender<IngestorState>>,
    session: SessionSlot,
}

impl StreamIngestor {
    pub fn new(
        config: IngestorConfig,
        provider: Arc<dyn TokenDataProvider>,
        sink: Arc<dyn TokenSink>,
        opener: Arc<dyn LinkOpener>,
        sol_price: SolPrice,
    ) -> Self {
        let (state_tx, _) = watch::channel(IngestorState::Idle);

        Self {
            config,
            provider,
            sink,
            opener,
            sol_price,
            state_tx: Arc::new(state_tx),
            session: Arc::new(Mutex::new(None)),
        }
    }

    pub fn state(&self) -> IngestorState {
        *self.state_tx.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<IngestorState> {
        self.state_tx.subscribe()
    }

    /// Wait until the current session ends (stopped or faulted).
    pub async fn wait_finished(&self) -> IngestorState {
        let mut rx = self.state_tx.subscribe();
        let result = match rx.wait_for(|state| state.is_finished()).await {
            Ok(state) => *state,
            Err(_) => self.state(),
        };
        result
    }

    /// Connect, subscribe and spawn the read loop.
    ///
    /// Rejected unless the ingestor is idle, stopped or faulted. Transport
    /// failures leave it `Faulted` and are reported to the sink. A `stop()`
    /// that lands before the read loop is running makes this return
    /// `MonitorError::Cancelled`.
    pub async fn start(&self, settings: FilterSettings) -> MonitorResult<()> {
        let control = SessionControl {
            id: Uuid::new_v4(),
            cancel: CancellationToken::new(),
            slot: self.session.clone(),
            state_tx: self.state_tx.clone(),
        };

        // Claim the state and register the session under one lock, so a
        // concurrent stop() always finds the session it has to cancel.
        {
            let mut slot = self.session.lock().await;
            let claimed = self.state_tx.send_if_modified(|state| {
                if state.can_start() {
                    *state = IngestorState::Connecting;
                    true
                } else {
                    false
                }
            });
            if !claimed {
                return Err(MonitorError::InvalidState(format!(
                    "cannot start while {:?}",
                    self.state()
                )));
            }
            *slot = Some(ActiveSession {
                id: control.id,
                cancel: control.cancel.clone(),
                handle: None,
            });
        }

        let started_at = Utc::now().timestamp();
        info!(
            "[{}] Connecting to feed at {} (provider: {})",
            control.id,
            self.config.feed_ws_url,
            self.provider.name()
        );

        let ws_stream = match until_cancelled(&control.cancel, connect_async(self.config.feed_ws_url.as_str())).await? {
            Ok((ws_stream, _)) => ws_stream,
            Err(e) => return Err(self.report_fault(&control, "Failed to connect to feed", e).await),
        };

        let (mut write, read) = ws_stream.split();

        if let Err(e) = write.send(Message::Text(subscribe_new_token_payload())).await {
            return Err(self.report_fault(&control, "Failed to send subscription", e).await);
        }

        // Hold the slot until the read loop's handle is stored, so stop()
        // either sees no session yet or waits for the loop.
        let mut slot = self.session.lock().await;
        let session = match slot.as_mut() {
            Some(session) if session.id == control.id && !control.cancel.is_cancelled() => session,
            _ => {
                debug!("[{}] Stopped before the subscription completed", control.id);
                return Err(MonitorError::Cancelled);
            }
        };

        self.state_tx.send_if_modified(|state| {
            if *state == IngestorState::Connecting {
                *state = IngestorState::Subscribed;
                true
            } else {
                false
            }
        });
        info!("[{}] ✅ Subscribed to new token events", control.id);
        self.sink.publish(MonitorEvent::status(
            StatusLevel::Info,
            "Connected, waiting for new tokens...",
        ));

        let pipeline = SessionPipeline::new(
            control.id,
            self.provider.clone(),
            settings,
            self.sink.clone(),
            self.opener.clone(),
            self.sol_price.clone(),
            self.config.resource_base_url.clone(),
            started_at,
        );

        let span = info_span!("feed_session", id = %control.id);
        session.handle = Some(tokio::spawn(
            run_session(read, write, pipeline, control, self.sink.clone()).instrument(span),
        ));

        Ok(())
    }

    /// Cancel in-flight work, close the connection and wait for the loop to exit.
    /// No-op when nothing is running.
    pub async fn stop(&self) -> MonitorResult<()> {
        let session = self.session.lock().await.take();
        let session = match session {
            Some(session) => session,
            None => {
                debug!("Stop requested but no session is running");
                return Ok(());
            }
        };

        info!("[{}] Stopping feed session...", session.id);
        session.cancel.cancel();

        if let Some(handle) = session.handle {
            if let Err(e) = handle.await {
                warn!("[{}] Session task ended abnormally: {:?}", session.id, e);
            }
        }

        // The session no longer owns the slot, so nothing else moved the
        // state since it was claimed.
        self.state_tx.send_replace(IngestorState::Stopped);
        self.sink.publish(MonitorEvent::status(StatusLevel::Info, "Parsing stopped"));

        Ok(())
    }

    async fn report_fault(&self, control: &SessionControl, context: &str, e: WsError) -> MonitorError {
        let message = format!("{}: {}", context, e);
        if control.fault().await {
            error!("[{}] {}", control.id, message);
            self.sink.publish(MonitorEvent::status(StatusLevel::Error, message));
        } else {
            debug!("[{}] {} after stop", control.id, message);
        }
        MonitorError::from(e)
    }
}

enum SessionExit {
    Cancelled,
    Faulted(String),
}

/// Read loop: one frame at a time until cancelled or the transport fails.
///
/// A cancelled loop leaves the state to `stop()`; a faulted one records
/// `Faulted` only while it is still the current session.
pub(crate) async fn run_session<R, W>(
    mut read: R,
    mut write: W,
    mut pipeline: SessionPipeline,
    control: SessionControl,
    sink: Arc<dyn TokenSink>,
) where
    R: Stream<Item = Result<Message, WsError>> + Unpin,
    W: Sink<Message, Error = WsError> + Unpin,
{
    let cancel = control.cancel.clone();

    let exit = loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => break SessionExit::Cancelled,
            next = read.next() => next,
        };

        match next {
            Some(Ok(Message::Text(text))) => {
                control.state_tx.send_if_modified(|state| {
                    if *state == IngestorState::Subscribed {
                        *state = IngestorState::Streaming;
                        true
                    } else {
                        false
                    }
                });

                match pipeline.process_frame(&text, &cancel).await {
                    Ok(_) => {}
                    Err(e) if e.is_cancelled() => break SessionExit::Cancelled,
                    Err(e) => {
                        warn!("Frame processing error: {}", e);
                        sink.publish(MonitorEvent::status(
                            StatusLevel::Warning,
                            format!("Processing error: {}", e),
                        ));
                    }
                }
            }
            Some(Ok(Message::Ping(data))) => {
                if let Err(e) = write.send(Message::Pong(data)).await {
                    break SessionExit::Faulted(format!("Failed to send pong: {}", e));
                }
            }
            Some(Ok(Message::Close(_))) => {
                break SessionExit::Faulted("Feed closed the connection".to_string());
            }
            Some(Ok(_)) => {
                // Binary, Pong and raw frames carry nothing for us
            }
            Some(Err(e)) => {
                break SessionExit::Faulted(format!("Feed error: {}", e));
            }
            None => {
                break SessionExit::Faulted("Feed stream ended".to_string());
            }
        }
    };

    if let Err(e) = write.close().await {
        debug!("Failed to close feed connection: {}", e);
    }

    let counters = pipeline.counters();
    match exit {
        SessionExit::Cancelled => {
            info!(
                "Feed session cancelled (checked: {}, accepted: {})",
                counters.total_observed, counters.total_accepted
            );
        }
        SessionExit::Faulted(message) => {
            if control.fault().await {
                error!("{}", message);
                sink.publish(MonitorEvent::status(StatusLevel::Error, message));
            } else {
                debug!("{} after stop", message);
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
