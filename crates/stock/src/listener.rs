//! Supervised stock push-channel listener.
//!
//! [`StockListener`] keeps one persistent WebSocket subscription to the
//! backend's stock feed. A connection task runs the
//! connect -> process -> reconnect loop and feeds parsed updates into a
//! bounded queue; an applier task drains the queue into the shared
//! [`AvailabilityStore`]. Connection state is published through a
//! [`tokio::sync::watch`] channel so callers can show whether the advisory
//! figures are live.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::client::{StockConnection, StockFeedClient};
use crate::events::{ListenerState, UpdateSource};
use crate::messages::StockChangedData;
use crate::processor::{process_messages, SessionEnd};
use crate::reconnect::{reconnect_loop, ReconnectConfig};
use crate::store::AvailabilityStore;

/// Default capacity of the queue between frame processing and the store.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// How long [`StockListener::stop`] waits for each task to exit.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct ListenerConfig {
    pub reconnect: ReconnectConfig,
    /// Pending updates held between the socket and the store.
    pub queue_capacity: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            reconnect: ReconnectConfig::default(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Handle to the running listener tasks.
///
/// Created via [`StockListener::start`]; shut down with
/// [`StockListener::stop`].
pub struct StockListener {
    state_rx: watch::Receiver<ListenerState>,
    cancel: CancellationToken,
    connection_task: JoinHandle<()>,
    applier_task: JoinHandle<()>,
}

impl StockListener {
    /// Spawn the connection and applier tasks.
    ///
    /// Returns immediately; the first connection attempt happens in the
    /// background.
    pub fn start(
        client: StockFeedClient,
        store: Arc<AvailabilityStore>,
        config: ListenerConfig,
    ) -> Self {
        let (state_tx, state_rx) = watch::channel(ListenerState::Disconnected);
        let (update_tx, update_rx) = mpsc::channel(config.queue_capacity.max(1));
        let cancel = CancellationToken::new();

        let applier_task = tokio::spawn(apply_updates(update_rx, store));

        let cancel_clone = cancel.clone();
        let connection_task = tokio::spawn(async move {
            tracing::info!(ws_url = %client.ws_url(), "Starting stock listener");
            run_connection_loop(
                &client,
                &config.reconnect,
                &state_tx,
                &update_tx,
                &cancel_clone,
            )
            .await;
            state_tx.send_replace(ListenerState::Disconnected);
            tracing::info!("Stock listener connection task exited");
        });

        Self {
            state_rx,
            cancel,
            connection_task,
            applier_task,
        }
    }

    /// Subscribe to connection state changes.
    pub fn state(&self) -> watch::Receiver<ListenerState> {
        self.state_rx.clone()
    }

    pub fn current_state(&self) -> ListenerState {
        *self.state_rx.borrow()
    }

    /// Stop listening and wait for both tasks to exit.
    ///
    /// Updates already queued are applied before the applier exits.
    pub async fn stop(self) {
        tracing::info!("Stopping stock listener");
        self.cancel.cancel();

        if tokio::time::timeout(SHUTDOWN_TIMEOUT, self.connection_task)
            .await
            .is_err()
        {
            tracing::warn!("Stock listener connection task did not exit in time");
        }
        if tokio::time::timeout(SHUTDOWN_TIMEOUT, self.applier_task)
            .await
            .is_err()
        {
            tracing::warn!("Stock listener applier task did not exit in time");
        }

        tracing::info!("Stock listener stopped");
    }
}

impl std::fmt::Debug for StockListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StockListener")
            .field("state", &*self.state_rx.borrow())
            .finish_non_exhaustive()
    }
}

/// Core connection loop: connect -> process messages -> reconnect.
///
/// Runs until the cancellation token is triggered or the update queue is
/// closed. Every successful connection resets the backoff delay.
async fn run_connection_loop(
    client: &StockFeedClient,
    reconnect: &ReconnectConfig,
    state: &watch::Sender<ListenerState>,
    updates: &mpsc::Sender<StockChangedData>,
    cancel: &CancellationToken,
) {
    state.send_replace(ListenerState::Connecting);
    let first = tokio::select! {
        _ = cancel.cancelled() => return,
        result = client.connect() => result,
    };

    let mut conn = match first {
        Ok(conn) => conn,
        Err(e) => {
            state.send_replace(ListenerState::Disconnected);
            tracing::warn!(error = %e, "Connection failed, entering reconnect loop");
            match reconnect_loop(client, reconnect, state, cancel).await {
                Some(conn) => conn,
                None => return,
            }
        }
    };

    loop {
        let StockConnection {
            client_id,
            mut ws_stream,
        } = conn;
        state.send_replace(ListenerState::Connected);

        let result = tokio::select! {
            _ = cancel.cancelled() => return,
            result = process_messages(&mut ws_stream, updates) => result,
        };
        state.send_replace(ListenerState::Disconnected);

        match result {
            Ok(SessionEnd::QueueClosed) => return,
            Ok(end) => {
                tracing::info!(client_id = %client_id, ?end, "Stock feed connection lost");
            }
            Err(e) => {
                tracing::warn!(client_id = %client_id, error = %e, "Stock feed connection failed");
            }
        }

        if cancel.is_cancelled() {
            return;
        }

        conn = match reconnect_loop(client, reconnect, state, cancel).await {
            Some(conn) => conn,
            None => return,
        };
    }
}

/// Drain queued updates into the store until every sender is dropped.
async fn apply_updates(
    mut updates: mpsc::Receiver<StockChangedData>,
    store: Arc<AvailabilityStore>,
) {
    while let Some(data) = updates.recv().await {
        store
            .put(data.key(), data.quantity, data.timestamp, UpdateSource::Push)
            .await;
    }
    tracing::debug!("Stock update applier exited");
}
