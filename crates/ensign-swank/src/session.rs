//! The live connection to a server.
//!
//! One TCP socket, one writer task draining an outbound queue, one
//! reader task feeding frames into the dispatcher. All request traffic
//! funnels through [`SwankSession::call_sync`] and
//! [`SwankSession::call_async`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use ensign_sexp::{parse, Sexp};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::dispatch::Dispatcher;
use crate::error::SwankError;
use crate::framing;
use crate::registry::{AsyncCallback, Completion, Executor, Registry};
use crate::wire;

/// Tuning knobs for a session.
#[derive(Clone)]
pub struct SessionConfig {
    pub connect_timeout: Duration,
    pub default_request_timeout: Duration,
    /// Per-method overrides, keyed by wire symbol
    /// (e.g. `swank:debug-backtrace`).
    pub request_timeouts: HashMap<String, Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            connect_timeout: Duration::from_secs(3),
            default_request_timeout: Duration::from_secs(3),
            request_timeouts: HashMap::new(),
        }
    }
}

impl SessionConfig {
    fn timeout_for(&self, method: &str) -> Duration {
        self.request_timeouts
            .get(method)
            .copied()
            .unwrap_or(self.default_request_timeout)
    }
}

/// How a synchronous call ended.
///
/// `NoResponse` is an expected outcome, not an error: the server kept
/// the socket but never answered within the method's deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Ok(Sexp),
    Failed(Sexp),
    NoResponse,
}

/// An established swank connection.
pub struct SwankSession {
    registry: Arc<Registry>,
    dispatcher: Arc<Dispatcher>,
    writer_tx: mpsc::Sender<Vec<u8>>,
    connected: Arc<AtomicBool>,
    torn_down: Arc<AtomicBool>,
    shutdown_tx: watch::Sender<bool>,
    config: SessionConfig,
}

impl SwankSession {
    /// Connect to `addr` and start the reader and writer tasks.
    pub async fn connect(
        addr: &str,
        config: SessionConfig,
        dispatcher: Arc<Dispatcher>,
    ) -> Result<Arc<Self>, SwankError> {
        let stream = timeout(config.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| SwankError::ConnectTimeout)??;
        let (mut read_half, mut write_half) = stream.into_split();

        let connected = Arc::new(AtomicBool::new(true));

        let (writer_tx, mut writer_rx) = mpsc::channel::<Vec<u8>>(64);
        let writer_connected = connected.clone();
        tokio::spawn(async move {
            while let Some(frame) = writer_rx.recv().await {
                let sent = write_half.write_all(&frame).await.is_ok()
                    && write_half.flush().await.is_ok();
                if !sent {
                    // A failed send means the socket is gone. Only
                    // mark it; the reader runs the teardown when its
                    // end of the stream fails.
                    writer_connected.store(false, Ordering::SeqCst);
                    break;
                }
            }
        });

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let torn_down = Arc::new(AtomicBool::new(false));
        let session = Arc::new(SwankSession {
            registry: dispatcher.registry().clone(),
            dispatcher: dispatcher.clone(),
            writer_tx,
            connected: connected.clone(),
            torn_down: torn_down.clone(),
            shutdown_tx,
            config,
        });

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    frame = framing::read_frame(&mut read_half) => match frame {
                        Ok(text) => {
                            debug!(len = text.len(), "frame received");
                            // One bad message does not doom the stream.
                            let inbound = match parse(&text).map_err(SwankError::from)
                                .and_then(wire::classify)
                            {
                                Ok(inbound) => inbound,
                                Err(e) => {
                                    warn!(error = %e, "dropping unreadable message");
                                    continue;
                                }
                            };
                            dispatcher.handle(inbound);
                        }
                        Err(e) => {
                            connected.store(false, Ordering::SeqCst);
                            if !torn_down.swap(true, Ordering::SeqCst) {
                                dispatcher.connection_lost(&e.to_string());
                            }
                            break;
                        }
                    }
                }
            }
        });

        Ok(session)
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Tear the session down. Safe to call more than once.
    pub fn close(&self) {
        self.connected.store(false, Ordering::SeqCst);
        if !self.torn_down.swap(true, Ordering::SeqCst) {
            let _ = self.shutdown_tx.send(true);
            self.dispatcher.connection_lost("session closed");
        }
    }

    async fn send_request(&self, method: &str, call: Sexp, completion: Completion) -> Result<i64, SwankError> {
        if !self.is_connected() {
            return Err(SwankError::NotConnected);
        }
        let id = self.registry.register(method, completion);
        let framed = framing::encode(&wire::request(call, id).to_string())?;
        if self.writer_tx.send(framed).await.is_err() {
            self.registry.take(id);
            return Err(SwankError::NotConnected);
        }
        Ok(id)
    }

    /// Issue a request and wait for its reply.
    ///
    /// `call` is the full call form, `(<symbol> <args>...)`; `method`
    /// is the wire symbol, used for timeout selection and logging.
    pub async fn call_sync(&self, method: &str, call: Sexp) -> Result<Outcome, SwankError> {
        let (tx, rx) = oneshot::channel();
        let id = self.send_request(method, call, Completion::Sync(tx)).await?;
        match timeout(self.config.timeout_for(method), rx).await {
            Err(_) => {
                // Nobody is waiting any more; forget the id so a late
                // reply is ignored rather than misdelivered.
                self.registry.take(id);
                warn!(method, id, "no response within deadline");
                Ok(Outcome::NoResponse)
            }
            Ok(Err(_)) => Ok(Outcome::Failed(Sexp::Nil)),
            Ok(Ok(completed)) => {
                if completed.success {
                    Ok(Outcome::Ok(completed.payload))
                } else {
                    Ok(Outcome::Failed(completed.payload))
                }
            }
        }
    }

    /// Issue a request whose reply is delivered to `callback`, via
    /// `executor` when one is given.
    pub async fn call_async(
        &self,
        method: &str,
        call: Sexp,
        callback: AsyncCallback,
        executor: Option<Arc<dyn Executor>>,
    ) -> Result<i64, SwankError> {
        self.send_request(method, call, Completion::Async { callback, executor })
            .await
    }
}
