// ── Flow controller ──
//
// Async owner of a `Session<Flow>`. Actions arrive on an unbounded
// channel and are reduced on a single task; fetch effects run on their
// own tasks and report back as actions. Each observable change is
// published as an immutable `SessionView` snapshot.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use flowdeck_api::transport::{TlsMode, TransportConfig};
use flowdeck_api::{FlowsClient, WsMessage};

use crate::command::{CommandEnvelope, CommandResult, FlowCommand};
use crate::config::{ControllerConfig, TlsVerification};
use crate::error::{CoreError, ErrorKind};
use crate::ingest::Delta;
use crate::model::{Flow, FlowColumn, FlowId};
use crate::session::{Action, Effect, Session, SessionView};
use crate::stream::ViewStream;

const COMMAND_CHANNEL_SIZE: usize = 64;

// ── ControllerState ──────────────────────────────────────────────

/// Lifecycle state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ControllerState {
    Idle,
    Running,
    Stopped,
}

// ── FlowController ───────────────────────────────────────────────

/// The main entry point for front ends.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. Owns the session
/// reducer task, the command processor, and the view publisher.
#[derive(Clone)]
pub struct FlowController {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    config: ControllerConfig,
    client: FlowsClient,
    state: watch::Sender<ControllerState>,
    view: watch::Sender<Arc<SessionView<Flow>>>,
    action_tx: mpsc::UnboundedSender<Action<Flow>>,
    action_rx: Mutex<Option<mpsc::UnboundedReceiver<Action<Flow>>>>,
    command_tx: mpsc::Sender<CommandEnvelope>,
    command_rx: Mutex<Option<mpsc::Receiver<CommandEnvelope>>>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl FlowController {
    /// Create a controller. Does NOT fetch anything; call
    /// [`start()`](Self::start) to spawn the background tasks.
    pub fn new(config: ControllerConfig) -> Result<Self, CoreError> {
        let client = FlowsClient::new(config.url.as_str(), &build_transport(&config))?;
        let (state, _) = watch::channel(ControllerState::Idle);
        let (view, _) = watch::channel(Arc::new(SessionView::default()));
        let (action_tx, action_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);

        Ok(Self {
            inner: Arc::new(ControllerInner {
                config,
                client,
                state,
                view,
                action_tx,
                action_rx: Mutex::new(Some(action_rx)),
                command_tx,
                command_rx: Mutex::new(Some(command_rx)),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        })
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    pub fn client(&self) -> &FlowsClient {
        &self.inner.client
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Apply the configured filter and sort, spawn the background tasks,
    /// and request the first full fetch.
    ///
    /// Fails with [`CoreError::Compile`] when the configured filter does
    /// not compile. Calling `start` twice is a no-op.
    pub async fn start(&self) -> Result<(), CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::ControllerStopped);
        }
        let session = initial_session(&self.inner.config)?;

        let Some(action_rx) = self.inner.action_rx.lock().await.take() else {
            debug!("controller already started");
            return Ok(());
        };
        self.inner.view.send_replace(Arc::new(session.view()));

        let mut handles = self.inner.task_handles.lock().await;
        handles.push(tokio::spawn(reducer_task(self.clone(), action_rx, session)));
        if let Some(rx) = self.inner.command_rx.lock().await.take() {
            handles.push(tokio::spawn(command_processor_task(self.clone(), rx)));
        }
        drop(handles);

        let _ = self.inner.state.send(ControllerState::Running);
        self.refresh()?;
        info!(url = %self.inner.config.url, "flow controller started");
        Ok(())
    }

    /// Cancel the background tasks and wait for them to finish.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }

        let _ = self.inner.state.send(ControllerState::Stopped);
        info!("flow controller stopped");
    }

    /// Subscribe to lifecycle state changes.
    pub fn state(&self) -> watch::Receiver<ControllerState> {
        self.inner.state.subscribe()
    }

    // ── Actions ──────────────────────────────────────────────────

    /// Queue an action for the reducer.
    pub fn dispatch(&self, action: Action<Flow>) -> Result<(), CoreError> {
        if self.inner.cancel.is_cancelled() {
            return Err(CoreError::ControllerStopped);
        }
        self.inner
            .action_tx
            .send(action)
            .map_err(|_| CoreError::ControllerStopped)
    }

    pub fn update_filter(&self, filter: Option<String>) -> Result<(), CoreError> {
        self.dispatch(Action::UpdateFilter(filter))
    }

    pub fn update_highlight(&self, highlight: Option<String>) -> Result<(), CoreError> {
        self.dispatch(Action::UpdateHighlight(highlight))
    }

    /// Sort by `column`, or return to arrival order with `None`.
    pub fn sort_by(&self, column: Option<FlowColumn>, descending: bool) -> Result<(), CoreError> {
        self.dispatch(Action::UpdateSorter(
            column.map(|c| c.sort_request(descending)),
        ))
    }

    pub fn select(&self, id: FlowId) -> Result<(), CoreError> {
        self.dispatch(Action::Select(id))
    }

    pub fn select_relative(&self, delta: isize) -> Result<(), CoreError> {
        self.dispatch(Action::SelectRelative(delta))
    }

    /// Request a new full fetch. Responses to older fetches are discarded.
    pub fn refresh(&self) -> Result<(), CoreError> {
        self.dispatch(Action::Refresh)
    }

    /// Feed one decoded push message into the session.
    pub fn handle_ws_message(&self, msg: WsMessage) -> Result<(), CoreError> {
        self.dispatch(Action::WsMessage(Delta::from(msg)))
    }

    /// Feed one raw push frame. Frames that fail to parse are dropped.
    pub fn handle_ws_text(&self, text: &str) -> Result<(), CoreError> {
        match WsMessage::parse(text) {
            Ok(msg) => self.handle_ws_message(msg),
            Err(e) => {
                debug!(error = %e, "dropping unparseable push frame");
                Ok(())
            }
        }
    }

    // ── Views ────────────────────────────────────────────────────

    /// The most recently published view.
    pub fn view(&self) -> Arc<SessionView<Flow>> {
        self.inner.view.borrow().clone()
    }

    pub fn subscribe(&self) -> ViewStream<Flow> {
        ViewStream::new(self.inner.view.subscribe())
    }

    /// Wait until no fetch is in flight and at least one has settled.
    ///
    /// Returns the settling error when the last fetch failed. Never
    /// resolves on a controller that was not started.
    pub async fn wait_synced(&self) -> Result<Arc<SessionView<Flow>>, CoreError> {
        let mut stream = self.subscribe();
        let view = stream
            .wait_for(SessionView::is_synced)
            .await
            .ok_or(CoreError::ControllerStopped)?;
        match &view.error {
            Some(e) if e.kind() == ErrorKind::Transport => Err(e.clone()),
            _ => Ok(view),
        }
    }

    // ── Commands ─────────────────────────────────────────────────

    /// Execute a write command against the server.
    pub async fn execute(&self, cmd: FlowCommand) -> Result<CommandResult, CoreError> {
        if *self.inner.state.borrow() != ControllerState::Running {
            return Err(CoreError::ControllerStopped);
        }

        let (tx, rx) = oneshot::channel();
        self.inner
            .command_tx
            .send(CommandEnvelope {
                command: cmd,
                response_tx: tx,
            })
            .await
            .map_err(|_| CoreError::ControllerStopped)?;
        self.dispatch(Action::RequestAcknowledged)?;

        rx.await.map_err(|_| CoreError::ControllerStopped)?
    }

    /// Execute a command on its own task.
    pub fn spawn_command(&self, cmd: FlowCommand) -> JoinHandle<Result<CommandResult, CoreError>> {
        let ctrl = self.clone();
        tokio::spawn(async move { ctrl.execute(cmd).await })
    }

    // ── One-shot convenience ─────────────────────────────────────

    /// One-shot: start, run closure, shut down.
    pub async fn oneshot<F, Fut, R>(config: ControllerConfig, f: F) -> Result<R, CoreError>
    where
        F: FnOnce(FlowController) -> Fut,
        Fut: std::future::Future<Output = Result<R, CoreError>>,
    {
        let controller = FlowController::new(config)?;
        controller.start().await?;
        let result = f(controller.clone()).await;
        controller.shutdown().await;
        result
    }

    fn run_effect(&self, effect: Effect) {
        match effect {
            Effect::FetchAll { generation } => {
                debug!(generation, "fetching flows");
                let client = self.inner.client.clone();
                let tx = self.inner.action_tx.clone();
                let cancel = self.inner.cancel.clone();
                tokio::spawn(async move {
                    let action = tokio::select! {
                        biased;
                        () = cancel.cancelled() => return,
                        result = client.list_flows() => match result {
                            Ok(records) => Action::Received {
                                generation,
                                items: records.into_iter().map(Flow::from).collect(),
                            },
                            Err(e) => {
                                warn!(generation, error = %e, "flow fetch failed");
                                Action::FetchFailed { generation, error: e.into() }
                            }
                        },
                    };
                    let _ = tx.send(action);
                });
            }
        }
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Reduce actions one at a time and publish a view after each change.
async fn reducer_task(
    controller: FlowController,
    mut rx: mpsc::UnboundedReceiver<Action<Flow>>,
    mut session: Session<Flow>,
) {
    let cancel = controller.inner.cancel.clone();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            action = rx.recv() => {
                let Some(action) = action else { break };
                let version = session.version();
                let (next, effects) = session.reduce(action);
                session = next;

                for effect in effects {
                    controller.run_effect(effect);
                }
                if session.version() != version {
                    controller.inner.view.send_replace(Arc::new(session.view()));
                }
            }
        }
    }
    debug!("reducer task stopped");
}

/// Process commands from the mpsc channel.
async fn command_processor_task(controller: FlowController, mut rx: mpsc::Receiver<CommandEnvelope>) {
    let cancel = controller.inner.cancel.clone();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            envelope = rx.recv() => {
                let Some(envelope) = envelope else { break };
                let result = route_command(&controller.inner.client, envelope.command).await;
                let _ = envelope.response_tx.send(result);
            }
        }
    }
}

// ── Command routing ──────────────────────────────────────────────

async fn route_command(client: &FlowsClient, cmd: FlowCommand) -> Result<CommandResult, CoreError> {
    debug!(command = cmd.name(), target = ?cmd.target(), "routing command");

    match cmd {
        FlowCommand::Accept { id } => client.accept(&id.to_path_segment()).await?,
        FlowCommand::Delete { id } => client.delete(&id.to_path_segment()).await?,
        FlowCommand::Duplicate { id } => client.duplicate(&id.to_path_segment()).await?,
        FlowCommand::Replay { id } => client.replay(&id.to_path_segment()).await?,
        FlowCommand::Revert { id } => client.revert(&id.to_path_segment()).await?,
        FlowCommand::Update { id, data } => client.update(&id.to_path_segment(), &data).await?,
        FlowCommand::AcceptAll => client.accept_all().await?,
        FlowCommand::Clear => client.clear().await?,
        FlowCommand::Download => return Ok(CommandResult::Dump(client.download().await?)),
        FlowCommand::Upload { dump } => client.upload(dump).await?,
    }
    Ok(CommandResult::Ok)
}

// ── Helpers ──────────────────────────────────────────────────────

/// Session seeded with the configured filter and sort.
fn initial_session(config: &ControllerConfig) -> Result<Session<Flow>, CoreError> {
    let mut session = Session::for_flows();
    if let Some(filter) = &config.filter {
        session = session.reduce(Action::UpdateFilter(Some(filter.clone()))).0;
        if let Some(e) = session.error() {
            return Err(e.clone());
        }
    }
    if let Some(column) = config.sort {
        session = session
            .reduce(Action::UpdateSorter(Some(column.sort_request(config.descending))))
            .0;
    }
    Ok(session)
}

fn build_transport(config: &ControllerConfig) -> TransportConfig {
    TransportConfig {
        tls: tls_to_transport(&config.tls),
        timeout: config.timeout,
        auth_token: config.auth_token.clone(),
    }
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}
