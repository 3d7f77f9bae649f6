//! The Wirechat client: connection state machine and background tasks.
//!
//! Each live connection is served by two tasks:
//!
//! ```text
//!   join/leave/send ──→ mpsc queue ──→ write task ──→ FramedSink
//!                                                          │
//!   callbacks / events ←── Dispatcher ←── read task ←── FramedStream
//!                                             │
//!                                             └──→ reconnect loop (on failure)
//! ```
//!
//! The read task is the session task. When its connection fails it runs
//! the reconnect loop itself and carries on with the inbound half it gets
//! back, so there is never more than one reader. A fresh write task is
//! spawned for every connection.
//!
//! All mutable state lives in one `Core` behind a `parking_lot::Mutex`.
//! The lock is never held across an `.await` or while a callback runs.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use wirechat_protocol::{
    FramedSink, FramedStream, HistoryEvent, Inbound, JsonCodec, MessageEvent, Outbound,
    ProtocolError, UserEvent,
};
use wirechat_session::{Backoff, JoinedRooms, OutboundBuffer};
use wirechat_transport::{Connector, WebSocketConnector};

use crate::dispatcher::Dispatcher;
use crate::{ClientConfig, ConnectionState, ErrorKind, Event, StateEvent, WirechatError};

type Sink<C> = FramedSink<<C as Connector>::Sink, JsonCodec>;
type Stream<C> = FramedStream<<C as Connector>::Stream, JsonCodec>;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Everything that changes while the client runs.
struct Core {
    state: ConnectionState,
    token: Option<String>,
    rooms: JoinedRooms,
    backoff: Backoff,
    buffer: OutboundBuffer<Outbound>,
    /// Present only while Connected.
    write_tx: Option<mpsc::Sender<Outbound>>,
    /// Root token for the current `connect()`; cancelled by `close()`.
    cancel: Option<CancellationToken>,
    read_task: Option<JoinHandle<()>>,
    write_task: Option<JoinHandle<()>>,
    /// Set by `connect()`, cleared together with the final transition of
    /// the session it started.
    session_active: bool,
}

impl Core {
    fn transition(
        &mut self,
        new: ConnectionState,
        error: Option<WirechatError>,
    ) -> Option<StateEvent> {
        let old = self.state;
        if old == new {
            return None;
        }
        self.state = new;
        Some(StateEvent { old, new, error })
    }

    /// Like [`transition`](Self::transition), but never leaves Closed.
    fn transition_auto(
        &mut self,
        new: ConnectionState,
        error: Option<WirechatError>,
    ) -> Option<StateEvent> {
        if self.state == ConnectionState::Closed {
            return None;
        }
        self.transition(new, error)
    }

    /// Final transition of a session: the client may be connected again
    /// as soon as the lock is released.
    fn end_session(
        &mut self,
        new: ConnectionState,
        error: Option<WirechatError>,
    ) -> Option<StateEvent> {
        self.session_active = false;
        self.transition_auto(new, error)
    }
}

struct Shared<C: Connector> {
    config: ClientConfig,
    connector: C,
    dispatcher: Dispatcher,
    core: Mutex<Core>,
}

/// One established connection, as seen by the read task.
struct Link<C: Connector> {
    stream: Stream<C>,
    /// Child of the root token; cancelling it stops this write task.
    token: CancellationToken,
    /// Set by the write task when a write fails.
    write_failed: oneshot::Receiver<WirechatError>,
}

/// Why a read loop stopped.
enum LinkDown {
    /// `close()` was called.
    Cancelled,
    /// The server closed the connection normally.
    Clean,
    /// The connection broke.
    Failed(WirechatError),
}

/// Where an envelope went when it was accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    Queued,
    Buffered,
}

/// Rolls back a `connect()` whose future is dropped before it settles.
struct ConnectGuard<'a, C: Connector> {
    shared: &'a Shared<C>,
    root: CancellationToken,
    armed: bool,
}

impl<'a, C: Connector> ConnectGuard<'a, C> {
    fn new(shared: &'a Shared<C>, root: CancellationToken) -> Self {
        Self {
            shared,
            root,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl<C: Connector> Drop for ConnectGuard<'_, C> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.root.cancel();
        let event = {
            let mut core = self.shared.core.lock();
            if core.state == ConnectionState::Connecting {
                core.cancel = None;
            }
            core.end_session(ConnectionState::Disconnected, None)
        };
        tracing::debug!(url = %self.shared.config.url, "connect abandoned");
        self.shared.emit(event);
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// A connection to a Wirechat server.
///
/// Cloning is cheap; clones share the same connection.
///
/// # Example
///
/// ```rust,no_run
/// use wirechat::{Client, ClientConfig};
///
/// # async fn run() -> Result<(), wirechat::WirechatError> {
/// let client = Client::new(ClientConfig::new("ws://localhost:8080/ws").with_user("alice"));
/// client.on_message(|msg| println!("[{}] {}: {}", msg.room, msg.user, msg.text));
///
/// client.connect().await?;
/// client.join("general").await?;
/// client.send("general", "hello").await?;
/// client.close().await
/// # }
/// ```
pub struct Client<C: Connector = WebSocketConnector> {
    shared: Arc<Shared<C>>,
}

impl<C: Connector> Clone for Client<C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Client<WebSocketConnector> {
    /// Creates a client that dials over WebSocket. Nothing happens on the
    /// network until [`connect`](Self::connect).
    pub fn new(config: ClientConfig) -> Self {
        Self::with_connector(config, WebSocketConnector)
    }
}

impl<C: Connector> Client<C> {
    /// Creates a client that dials through `connector`.
    pub fn with_connector(config: ClientConfig, connector: C) -> Self {
        let core = Core {
            state: ConnectionState::Disconnected,
            token: config.token.clone(),
            rooms: JoinedRooms::new(),
            backoff: Backoff::new(config.backoff.clone()),
            buffer: OutboundBuffer::new(config.max_buffer_size),
            write_tx: None,
            cancel: None,
            read_task: None,
            write_task: None,
            session_active: false,
        };
        let dispatcher = Dispatcher::new(config.event_capacity);
        Self {
            shared: Arc::new(Shared {
                config,
                connector,
                dispatcher,
                core: Mutex::new(core),
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.shared.config
    }

    // -- lifecycle ----------------------------------------------------------

    /// Opens the connection and sends the hello.
    ///
    /// Allowed from Disconnected, Error and Closed. Any envelopes buffered
    /// while offline are sent before this returns.
    ///
    /// # Errors
    /// - `InvalidConfig` for a bad endpoint, or if the client is already
    ///   connecting or connected. The state is left unchanged.
    /// - `Connection`/`Timeout` if dialing or the hello fails. The client
    ///   moves to Error.
    /// - `Disconnected` if [`close`](Self::close) is called before the
    ///   connection is up.
    ///
    /// Dropping the returned future before it completes abandons the
    /// attempt and moves the client back to Disconnected.
    pub async fn connect(&self) -> Result<(), WirechatError> {
        let shared = &self.shared;
        shared.config.validate()?;

        let (root, event) = {
            let mut core = shared.core.lock();
            if core.state.is_active() || core.session_active {
                return Err(WirechatError::invalid_config(format!(
                    "connect called while {}",
                    core.state
                )));
            }
            core.session_active = true;
            let root = CancellationToken::new();
            if let Some(previous) = core.cancel.replace(root.clone()) {
                previous.cancel();
            }
            core.backoff.reset();
            (root, core.transition(ConnectionState::Connecting, None))
        };
        let mut guard = ConnectGuard::new(shared, root.clone());
        shared.emit(event);
        tracing::info!(url = %shared.config.url, "connecting");

        let established = tokio::select! {
            biased;
            _ = root.cancelled() => Err(closed_while_connecting()),
            link = shared.establish(&root, false) => link,
        };
        guard.disarm();

        match established {
            Ok(link) => {
                let mut core = shared.core.lock();
                // close() may have run after the flip to Connected.
                if root.is_cancelled() {
                    core.session_active = false;
                    return Err(closed_while_connecting());
                }
                core.read_task = Some(tokio::spawn(Arc::clone(shared).run_session(link, root)));
                Ok(())
            }
            Err(err) => {
                tracing::error!(url = %shared.config.url, error = %err, "connect failed");
                let event = shared
                    .core
                    .lock()
                    .end_session(ConnectionState::Error, Some(err.clone()));
                shared.emit(event);
                Err(err)
            }
        }
    }

    /// Closes the connection and stops all background work.
    ///
    /// Sends a normal close frame if a connection is up. Calling it again
    /// is a no-op. Envelopes still buffered and the joined rooms are kept
    /// for the next [`connect`](Self::connect).
    pub async fn close(&self) -> Result<(), WirechatError> {
        let shared = &self.shared;
        let (event, root, writer, reader) = {
            let mut core = shared.core.lock();
            if core.state == ConnectionState::Closed {
                return Ok(());
            }
            core.write_tx = None;
            (
                core.transition(ConnectionState::Closed, None),
                core.cancel.take(),
                core.write_task.take(),
                core.read_task.take(),
            )
        };
        if let Some(root) = root {
            root.cancel();
        }
        shared.emit(event);
        tracing::info!("client closed");

        if let Some(writer) = writer {
            if let Err(e) = writer.await {
                tracing::warn!(error = %e, "write task ended abnormally");
            }
        }
        if let Some(reader) = reader {
            if let Err(e) = reader.await {
                tracing::warn!(error = %e, "read task ended abnormally");
            }
        }
        Ok(())
    }

    // -- room operations ----------------------------------------------------

    /// Subscribes to `room`.
    ///
    /// The room is remembered and rejoined after every reconnect.
    pub async fn join(&self, room: &str) -> Result<(), WirechatError> {
        let delivery = self.shared.enqueue(Outbound::join(room)).await?;
        if delivery == Delivery::Queued {
            self.shared.core.lock().rooms.insert(room);
        }
        tracing::debug!(room, ?delivery, "join requested");
        Ok(())
    }

    /// Unsubscribes from `room`.
    pub async fn leave(&self, room: &str) -> Result<(), WirechatError> {
        let delivery = self.shared.enqueue(Outbound::leave(room)).await?;
        if delivery == Delivery::Queued {
            self.shared.core.lock().rooms.remove(room);
        }
        tracing::debug!(room, ?delivery, "leave requested");
        Ok(())
    }

    /// Publishes `text` to `room`.
    ///
    /// # Errors
    /// `NotConnected` when offline with buffering disabled, `BufferFull`
    /// when offline and the buffer is at capacity.
    pub async fn send(&self, room: &str, text: &str) -> Result<(), WirechatError> {
        self.shared.enqueue(Outbound::msg(room, text)).await?;
        Ok(())
    }

    // -- credentials & introspection ----------------------------------------

    /// Replaces the bearer token used by the next hello.
    pub fn set_token(&self, token: impl Into<String>) {
        self.shared.core.lock().token = Some(token.into());
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.core.lock().state
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Rooms that will be rejoined after a reconnect, in name order.
    pub fn joined_rooms(&self) -> Vec<String> {
        self.shared.core.lock().rooms.snapshot()
    }

    /// Envelopes waiting for the next connection.
    pub fn buffered_len(&self) -> usize {
        self.shared.core.lock().buffer.len()
    }

    // -- callbacks ----------------------------------------------------------

    /// Subscribes to every event the client produces.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.shared.dispatcher.subscribe()
    }

    pub fn on_message<F>(&self, handler: F)
    where
        F: Fn(MessageEvent) + Send + Sync + 'static,
    {
        self.shared.dispatcher.set_message(Arc::new(handler));
    }

    pub fn on_user_joined<F>(&self, handler: F)
    where
        F: Fn(UserEvent) + Send + Sync + 'static,
    {
        self.shared.dispatcher.set_user_joined(Arc::new(handler));
    }

    pub fn on_user_left<F>(&self, handler: F)
    where
        F: Fn(UserEvent) + Send + Sync + 'static,
    {
        self.shared.dispatcher.set_user_left(Arc::new(handler));
    }

    pub fn on_history<F>(&self, handler: F)
    where
        F: Fn(HistoryEvent) + Send + Sync + 'static,
    {
        self.shared.dispatcher.set_history(Arc::new(handler));
    }

    /// Called for server error envelopes and for failures on the
    /// background tasks. Errors returned from a call are not repeated here.
    pub fn on_error<F>(&self, handler: F)
    where
        F: Fn(WirechatError) + Send + Sync + 'static,
    {
        self.shared.dispatcher.set_error(Arc::new(handler));
    }

    pub fn on_state_change<F>(&self, handler: F)
    where
        F: Fn(StateEvent) + Send + Sync + 'static,
    {
        self.shared.dispatcher.set_state(Arc::new(handler));
    }
}

// ---------------------------------------------------------------------------
// Connection plumbing
// ---------------------------------------------------------------------------

fn closed_while_connecting() -> WirechatError {
    WirechatError::new(ErrorKind::Disconnected, "client closed while connecting")
}

impl<C: Connector> Shared<C> {
    fn emit(&self, event: Option<StateEvent>) {
        if let Some(event) = event {
            tracing::info!(state = %event.new, from = %event.old, "state changed");
            self.dispatcher.emit_state(event);
        }
    }

    /// Hands `frame` to the write task, or buffers it while offline.
    async fn enqueue(&self, frame: Outbound) -> Result<Delivery, WirechatError> {
        let (tx, root) = {
            let mut core = self.core.lock();
            match (core.write_tx.clone(), core.cancel.clone()) {
                (Some(tx), Some(root)) => (tx, root),
                _ => return self.buffer_or_reject(&mut core, frame),
            }
        };

        let sent = tokio::select! {
            biased;
            _ = root.cancelled() => return Err(WirechatError::not_connected()),
            sent = tx.send(frame) => sent,
        };
        match sent {
            Ok(()) => Ok(Delivery::Queued),
            // The write task went away between the lock and the send.
            Err(mpsc::error::SendError(frame)) => {
                let mut core = self.core.lock();
                self.buffer_or_reject(&mut core, frame)
            }
        }
    }

    fn buffer_or_reject(
        &self,
        core: &mut Core,
        frame: Outbound,
    ) -> Result<Delivery, WirechatError> {
        if !self.config.enable_buffering {
            return Err(WirechatError::not_connected());
        }
        core.buffer.push(frame)?;
        tracing::debug!(
            buffered = core.buffer.len(),
            capacity = core.buffer.capacity(),
            "envelope buffered"
        );
        Ok(Delivery::Buffered)
    }

    /// Dials and sends the hello.
    async fn open(&self) -> Result<(Sink<C>, Stream<C>), WirechatError> {
        let config = &self.config;
        let (sink, stream) = self
            .connector
            .connect(&config.url, config.handshake_timeout)
            .await?;
        let mut sink = FramedSink::new(sink, JsonCodec, config.write_timeout);
        let stream = FramedStream::new(stream, JsonCodec, config.read_timeout);

        let token = self.core.lock().token.clone();
        let hello = Outbound::hello(config.protocol, token, config.user.clone());
        sink.write_frame(&hello).await?;
        tracing::debug!(id = %sink.id(), "hello sent");
        Ok((sink, stream))
    }

    /// Opens a connection, replays rooms if asked, drains the buffer, then
    /// flips to Connected and starts the write task.
    async fn establish(
        self: &Arc<Self>,
        root: &CancellationToken,
        replay: bool,
    ) -> Result<Link<C>, WirechatError> {
        let (mut sink, stream) = self.open().await?;

        let mut rejoined = JoinedRooms::new();
        if replay {
            let rooms = self.core.lock().rooms.snapshot();
            for room in rooms {
                match sink.write_frame(&Outbound::join(room.as_str())).await {
                    Ok(()) => {
                        rejoined.insert(room);
                    }
                    Err(e) => {
                        tracing::warn!(room = %room, error = %e, "failed to rejoin room");
                        self.dispatcher.report_error(WirechatError::from(e));
                    }
                }
            }
            if !rejoined.is_empty() {
                tracing::debug!(rooms = rejoined.len(), "rooms rejoined");
            }
        }

        let (tx, rx) = mpsc::channel(self.config.write_queue_size);

        // Drain until the buffer is empty, then flip to Connected in the
        // same critical section so no newer envelope can overtake.
        let event = loop {
            let batch = {
                let mut core = self.core.lock();
                if core.buffer.is_empty() {
                    if root.is_cancelled() || core.state == ConnectionState::Closed {
                        return Err(closed_while_connecting());
                    }
                    core.write_tx = Some(tx.clone());
                    core.backoff.reset();
                    break core.transition_auto(ConnectionState::Connected, None);
                }
                core.buffer.take_all()
            };
            self.flush(&mut sink, batch, &mut rejoined).await?;
        };

        let token = root.child_token();
        let (failed_tx, failed_rx) = oneshot::channel();
        let writer = tokio::spawn(Arc::clone(self).run_writer(
            sink,
            rx,
            tx,
            token.clone(),
            failed_tx,
        ));
        self.core.lock().write_task = Some(writer);
        self.emit(event);

        Ok(Link {
            stream,
            token,
            write_failed: failed_rx,
        })
    }

    /// Writes buffered envelopes in order. On failure the unsent remainder
    /// goes back to the front of the buffer.
    ///
    /// A buffered join for a room in `rejoined` is dropped: the replay
    /// already sent it. A buffered leave takes its room out of `rejoined`
    /// so a later join for it is written.
    async fn flush(
        &self,
        sink: &mut Sink<C>,
        batch: Vec<Outbound>,
        rejoined: &mut JoinedRooms,
    ) -> Result<(), WirechatError> {
        tracing::debug!(count = batch.len(), "flushing buffered envelopes");
        let mut pending = batch.into_iter();
        while let Some(frame) = pending.next() {
            match &frame {
                Outbound::Join(p) if rejoined.contains(&p.room) => {
                    tracing::debug!(room = %p.room, "skipping buffered join, room already rejoined");
                    continue;
                }
                Outbound::Leave(p) => {
                    rejoined.remove(&p.room);
                }
                _ => {}
            }
            if let Err(e) = sink.write_frame(&frame).await {
                tracing::warn!(error = %e, "flush interrupted");
                let mut core = self.core.lock();
                for unsent in pending.rev() {
                    core.buffer.push_front(unsent);
                }
                core.buffer.push_front(frame);
                return Err(e.into());
            }
            let mut core = self.core.lock();
            match &frame {
                Outbound::Join(p) => {
                    core.rooms.insert(p.room.as_str());
                }
                Outbound::Leave(p) => {
                    core.rooms.remove(&p.room);
                }
                _ => {}
            }
        }
        Ok(())
    }

    // -- write task ---------------------------------------------------------

    async fn run_writer(
        self: Arc<Self>,
        mut sink: Sink<C>,
        mut rx: mpsc::Receiver<Outbound>,
        tx: mpsc::Sender<Outbound>,
        token: CancellationToken,
        failed: oneshot::Sender<WirechatError>,
    ) {
        let id = sink.id();
        let mut unsent = None;
        let mut error: Option<ProtocolError> = None;

        loop {
            let frame = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                frame = rx.recv() => match frame {
                    Some(frame) => frame,
                    None => break,
                },
            };
            let written = tokio::select! {
                biased;
                _ = token.cancelled() => None,
                written = sink.write_frame(&frame) => Some(written),
            };
            match written {
                Some(Ok(())) => {
                    tracing::debug!(%id, kind = frame.kind(), room = ?frame.room(), "frame written");
                }
                Some(Err(e)) => {
                    tracing::warn!(%id, error = %e, "write failed");
                    unsent = Some(frame);
                    error = Some(e);
                    break;
                }
                None => {
                    unsent = Some(frame);
                    break;
                }
            }
        }

        // Whatever was accepted but not written is older than anything
        // buffered since, so it goes to the front.
        {
            let mut core = self.core.lock();
            if core.write_tx.as_ref().is_some_and(|cur| cur.same_channel(&tx)) {
                core.write_tx = None;
            }
            rx.close();
            let mut pending: Vec<Outbound> = unsent.into_iter().collect();
            while let Ok(frame) = rx.try_recv() {
                pending.push(frame);
            }
            if self.config.enable_buffering {
                for frame in pending.into_iter().rev() {
                    core.buffer.push_front(frame);
                }
            } else if !pending.is_empty() {
                tracing::warn!(%id, dropped = pending.len(), "dropping unsent envelopes");
            }
        }

        let closing = self.core.lock().state == ConnectionState::Closed;
        if closing {
            if let Err(e) = sink.close("client closed").await {
                tracing::debug!(%id, error = %e, "close frame not sent");
            }
        }

        if let Some(e) = error {
            let _ = failed.send(e.into());
            token.cancel();
        }
    }

    // -- read / session task ------------------------------------------------

    async fn run_session(self: Arc<Self>, mut link: Link<C>, root: CancellationToken) {
        loop {
            let down = self.read_until_down(&mut link, &root).await;

            link.token.cancel();
            let writer = self.core.lock().write_task.take();
            if let Some(writer) = writer {
                if let Err(e) = writer.await {
                    tracing::warn!(error = %e, "write task ended abnormally");
                }
            }

            let err = match down {
                LinkDown::Cancelled => {
                    self.core.lock().session_active = false;
                    return;
                }
                LinkDown::Clean => {
                    tracing::info!("server closed the connection");
                    let event = self
                        .core
                        .lock()
                        .end_session(ConnectionState::Disconnected, None);
                    self.emit(event);
                    return;
                }
                LinkDown::Failed(err) => err,
            };

            tracing::warn!(error = %err, "connection lost");
            if !self.config.auto_reconnect {
                let event = self
                    .core
                    .lock()
                    .end_session(ConnectionState::Error, Some(err.clone()));
                self.emit(event);
                self.dispatcher.report_error(err);
                return;
            }

            let event = self
                .core
                .lock()
                .transition_auto(ConnectionState::Disconnected, Some(err.clone()));
            self.emit(event);
            self.dispatcher.report_error(err);

            match self.reconnect(&root).await {
                Some(next) => link = next,
                None => {
                    self.core.lock().session_active = false;
                    return;
                }
            }
        }
    }

    async fn read_until_down(&self, link: &mut Link<C>, root: &CancellationToken) -> LinkDown {
        let id = link.stream.id();
        loop {
            tokio::select! {
                biased;
                _ = root.cancelled() => return LinkDown::Cancelled,
                _ = link.token.cancelled() => {
                    let err = link.write_failed.try_recv().unwrap_or_else(|_| {
                        WirechatError::new(ErrorKind::Disconnected, "write side closed")
                    });
                    return LinkDown::Failed(err);
                }
                frame = link.stream.read_frame::<Inbound>() => match frame {
                    Ok(Some(envelope)) => self.dispatcher.dispatch(envelope),
                    Ok(None) => return LinkDown::Clean,
                    Err(e) if e.is_frame_local() => {
                        tracing::debug!(%id, error = %e, "skipping malformed frame");
                        self.dispatcher.report_error(e.into());
                    }
                    Err(e) => return LinkDown::Failed(e.into()),
                },
            }
        }
    }

    /// Retries with backoff until a connection is up, attempts run out,
    /// or the client is closed.
    async fn reconnect(self: &Arc<Self>, root: &CancellationToken) -> Option<Link<C>> {
        loop {
            let (delay, attempt, event) = {
                let mut core = self.core.lock();
                if core.state == ConnectionState::Closed {
                    return None;
                }
                let next = core.backoff.next_delay();
                match next {
                    Ok(delay) => {
                        let attempt = core.backoff.attempt();
                        let event = core.transition_auto(ConnectionState::Reconnecting, None);
                        (delay, attempt, event)
                    }
                    Err(e) => {
                        let err = WirechatError::from(e);
                        tracing::error!(error = %err, "giving up on reconnect");
                        let event = core.end_session(ConnectionState::Error, Some(err.clone()));
                        drop(core);
                        self.emit(event);
                        self.dispatcher.report_error(err);
                        return None;
                    }
                }
            };
            self.emit(event);
            let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
            tracing::info!(attempt, delay_ms, "reconnecting");

            tokio::select! {
                biased;
                _ = root.cancelled() => return None,
                _ = tokio::time::sleep(delay) => {}
            }

            let established = tokio::select! {
                biased;
                _ = root.cancelled() => return None,
                link = self.establish(root, true) => link,
            };
            match established {
                Ok(link) => {
                    tracing::info!(attempt, "reconnected");
                    return Some(link);
                }
                Err(err) => {
                    tracing::warn!(attempt, error = %err, "reconnect attempt failed");
                }
            }
        }
    }
}
