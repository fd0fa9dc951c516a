// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordinator actor: the single-writer task that owns the state machine,
//! chat batcher, and autonomy engine, plus the timers that drive them.
//! External callers never touch this state directly -- they submit an
//! [`Intent`] over an mpsc channel and, where a reply is meaningful, await a
//! `oneshot`.
//!
//! `run()`'s select loop follows a one-branch-per-input-source shape, with
//! optional deadlines driven by `match deadline { Some(d) =>
//! sleep_until(d).await, None => pending().await }` guarded with `if
//! deadline.is_some()`.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::autonomy::engine::{
    render_misalignment_correction, PlanNudgeOutcome, ReplyOutcome, VibeOutcome,
};
use crate::autonomy::{
    render_batch, AutonomyEngine, AutonomyMode, Batch, ChatBatcher, CoordinatorState, Plan,
    PlanError, SideEffect, StateChangeEvent, StateMachine,
};
use crate::chat::{ChatEvent, ChatMessage, ChatMultiplexer};
use crate::config::{CoordinatorConfig, PartialCoordinatorConfig};
use crate::dispatcher::{DispatchJob, Dispatcher};
use crate::gateway::mock::MockGateway;
use crate::gateway::{classify_all, classify_reply, ReplyKind, TriggerAgent};
use crate::overlay::{ChatRef, OverlayEvent, OverlayHub};
use crate::speech::{SpeechGate, SpokenResult};

/// Return current epoch millis. Used to seed the batcher's startup clock and
/// to render batch ages.
pub fn epoch_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Snapshot returned by `GET /coordinator/status`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub enabled: bool,
    pub state: &'static str,
    pub last_activity_at_ms: u64,
    pub uptime_secs: u64,
    pub mode: &'static str,
    pub config: ConfigSnapshot,
}

/// Wire-shaped mirror of [`CoordinatorConfig`] (camelCase).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSnapshot {
    pub batch_window_ms: u64,
    pub startup_grace_ms: u64,
    pub recent_messages_cap: usize,
    pub idle_after_ms: u64,
    pub sleep_after_idle_ms: u64,
    pub vibe_interval_ms: u64,
    pub plan_nudge_delay_ms: u64,
    pub ack_timeout_ms: u64,
    pub gateway_timeout_ms: u64,
}

impl From<&CoordinatorConfig> for ConfigSnapshot {
    fn from(c: &CoordinatorConfig) -> Self {
        Self {
            batch_window_ms: c.batch_window_ms,
            startup_grace_ms: c.startup_grace_ms,
            recent_messages_cap: c.recent_messages_cap,
            idle_after_ms: c.idle_after_ms,
            sleep_after_idle_ms: c.sleep_after_idle_ms,
            vibe_interval_ms: c.vibe_interval_ms,
            plan_nudge_delay_ms: c.plan_nudge_delay_ms,
            ack_timeout_ms: c.ack_timeout_ms,
            gateway_timeout_ms: c.gateway_timeout_ms,
        }
    }
}

/// Read-only snapshot of a [`Plan`] for `GET /plan`.
#[derive(Debug, Clone, Serialize)]
pub struct PlanSnapshot {
    pub id: String,
    pub goal: String,
    pub steps: Vec<StepSnapshot>,
    pub status: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepSnapshot {
    pub description: String,
    pub done: bool,
}

fn snapshot_plan(plan: &Plan) -> PlanSnapshot {
    use crate::autonomy::engine::{PlanStatus, StepStatus};
    PlanSnapshot {
        id: plan.id.clone(),
        goal: plan.goal.clone(),
        steps: plan
            .steps
            .iter()
            .map(|s| StepSnapshot {
                description: s.description.clone(),
                done: s.status == StepStatus::Done,
            })
            .collect(),
        status: match plan.status {
            PlanStatus::Active => "active",
            PlanStatus::Completed => "completed",
            PlanStatus::Abandoned => "abandoned",
        },
    }
}

/// Typed requests the coordinator task accepts over its intent channel.
/// Every variant that produces a caller-visible result carries its own
/// `oneshot::Sender`. `VibeReply` is actor-internal: the dispatcher
/// completion handler re-enqueues it rather than calling back into `self`
/// from a spawned task.
pub enum Intent {
    /// A chat message ingested via a real adapter or `/mock/chat`.
    IngestChat(ChatMessage),
    /// Refresh activity / wake, ahead of a speech tool call. A one-way port:
    /// the speech gate itself holds no reference back to the coordinator.
    NotifySpeech,
    SetPlan { goal: String, steps: Vec<String>, reply: oneshot::Sender<PlanSnapshot> },
    MarkStepDone { index: usize, reply: oneshot::Sender<Result<PlanSnapshot, PlanError>> },
    AbandonPlan,
    GetPlan { reply: oneshot::Sender<Option<PlanSnapshot>> },
    Status { reply: oneshot::Sender<StatusSnapshot> },
    UpdateConfig { partial: PartialCoordinatorConfig, reply: oneshot::Sender<ConfigSnapshot> },
    SetMode { mode: AutonomyMode },
    VibeReply { replies: Vec<String> },
    /// Reply to a chat-batch or plan-nudge turn, routed back for misalignment
    /// classification -- misalignment correction applies to every invocation
    /// kind, not just vibe.
    SilentTurnReply { replies: Vec<String>, hint: &'static str },
}

/// Cheap-to-clone handle to the running coordinator. Every transport layer
/// (HTTP, WS, agent tool surface) talks to the coordinator only through this.
#[derive(Clone)]
pub struct CoordinatorHandle {
    intents: mpsc::UnboundedSender<Intent>,
    pub overlay: Arc<OverlayHub>,
    pub speech: Arc<SpeechGate>,
    pub dispatcher: Dispatcher,
    pub multiplexer: Arc<ChatMultiplexer>,
    pub mock_gateway: Arc<MockGateway>,
    pub shutdown: CancellationToken,
}

impl CoordinatorHandle {
    fn send(&self, intent: Intent) {
        let _ = self.intents.send(intent);
    }

    /// `talk(text)` tool surface: refresh activity, then gate on the overlay
    /// ack.
    pub async fn talk(&self, text: &str) -> SpokenResult {
        self.send(Intent::NotifySpeech);
        self.speech.talk(text).await
    }

    /// `reply(text, chat)` tool surface.
    pub async fn reply(&self, text: &str, chat: ChatRef) -> SpokenResult {
        self.send(Intent::NotifySpeech);
        self.speech.reply(text, chat).await
    }

    /// `POST /mock/chat` and real chat adapters both funnel through here.
    pub fn ingest_chat(&self, message: ChatMessage) {
        self.send(Intent::IngestChat(message));
    }

    pub async fn set_plan(&self, goal: String, steps: Vec<String>) -> PlanSnapshot {
        let (reply, rx) = oneshot::channel();
        self.send(Intent::SetPlan { goal, steps, reply });
        rx.await.expect("coordinator task dropped reply channel")
    }

    pub async fn mark_step_done(&self, index: usize) -> Result<PlanSnapshot, PlanError> {
        let (reply, rx) = oneshot::channel();
        self.send(Intent::MarkStepDone { index, reply });
        rx.await.expect("coordinator task dropped reply channel")
    }

    pub fn abandon_plan(&self) {
        self.send(Intent::AbandonPlan);
    }

    pub async fn get_plan(&self) -> Option<PlanSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(Intent::GetPlan { reply });
        rx.await.expect("coordinator task dropped reply channel")
    }

    pub async fn status(&self) -> StatusSnapshot {
        let (reply, rx) = oneshot::channel();
        self.send(Intent::Status { reply });
        rx.await.expect("coordinator task dropped reply channel")
    }

    pub async fn update_config(&self, partial: PartialCoordinatorConfig) -> ConfigSnapshot {
        let (reply, rx) = oneshot::channel();
        self.send(Intent::UpdateConfig { partial, reply });
        rx.await.expect("coordinator task dropped reply channel")
    }

    pub fn set_mode(&self, mode: AutonomyMode) {
        self.send(Intent::SetMode { mode });
    }

    /// Connected adapter keys for `GET /chat/status`.
    pub fn connected_adapters(&self) -> Vec<String> {
        self.multiplexer.connected_keys()
    }

    /// Per-adapter connection + backoff-attempt state for `GET /chat/status`.
    pub fn adapter_statuses(&self) -> Vec<(String, crate::chat::AdapterStatus)> {
        self.multiplexer.adapter_statuses()
    }

    /// `POST /mock/turn`: script the next gateway reply, then ingest the
    /// fixture chat message that should trigger it.
    pub async fn mock_turn(&self, message: ChatMessage, response: Vec<String>) {
        self.mock_gateway.push_scripted(response).await;
        self.ingest_chat(message);
    }
}

/// Spawn the coordinator task and return a handle to it. `gateway` is
/// wrapped in a [`MockGateway`] so `POST /mock/turn` can script a single
/// reply without standing up a real agent backend.
pub fn spawn(
    config: CoordinatorConfig,
    gateway: Arc<dyn TriggerAgent>,
    multiplexer: Arc<ChatMultiplexer>,
    shutdown: CancellationToken,
) -> CoordinatorHandle {
    let (intent_tx, intent_rx) = mpsc::unbounded_channel();
    let (chat_tx, chat_rx) = mpsc::unbounded_channel();

    let overlay = Arc::new(OverlayHub::new());
    let dispatcher = Dispatcher::spawn();
    let speech = Arc::new(SpeechGate::new(Arc::clone(&overlay), config.ack_timeout()));
    let mock_gateway = Arc::new(MockGateway::new(gateway));
    multiplexer.connect_all(chat_tx);

    let handle = CoordinatorHandle {
        intents: intent_tx.clone(),
        overlay: Arc::clone(&overlay),
        speech,
        dispatcher: dispatcher.clone(),
        multiplexer,
        mock_gateway: Arc::clone(&mock_gateway),
        shutdown: shutdown.clone(),
    };

    let actor = CoordinatorActor::new(
        config,
        mock_gateway,
        dispatcher,
        overlay,
        Arc::clone(&handle.speech),
        intent_tx,
        intent_rx,
        chat_rx,
        shutdown,
    );
    tokio::spawn(actor.run());

    handle
}

struct CoordinatorActor {
    config: CoordinatorConfig,
    gateway: Arc<dyn TriggerAgent>,
    dispatcher: Dispatcher,
    overlay: Arc<OverlayHub>,
    speech: Arc<SpeechGate>,
    intent_tx: mpsc::UnboundedSender<Intent>,
    intents: mpsc::UnboundedReceiver<Intent>,
    chat: mpsc::UnboundedReceiver<ChatEvent>,
    shutdown: CancellationToken,

    state: StateMachine,
    batcher: ChatBatcher,
    engine: AutonomyEngine,

    vibe_deadline: Option<Instant>,
    plan_nudge_deadline: Option<Instant>,
    sleep_check_dirty: bool,
    started_at: Instant,
}

impl CoordinatorActor {
    #[allow(clippy::too_many_arguments)]
    fn new(
        config: CoordinatorConfig,
        gateway: Arc<dyn TriggerAgent>,
        dispatcher: Dispatcher,
        overlay: Arc<OverlayHub>,
        speech: Arc<SpeechGate>,
        intent_tx: mpsc::UnboundedSender<Intent>,
        intents: mpsc::UnboundedReceiver<Intent>,
        chat: mpsc::UnboundedReceiver<ChatEvent>,
        shutdown: CancellationToken,
    ) -> Self {
        let now = Instant::now();
        let batcher = ChatBatcher::new(
            config.batch_window(),
            config.startup_grace(),
            config.recent_messages_cap,
            epoch_ms(),
        );
        let engine = AutonomyEngine::new(config.vibe_interval(), config.plan_nudge_delay());
        Self {
            config,
            gateway,
            dispatcher,
            overlay,
            speech,
            intent_tx,
            intents,
            chat,
            shutdown,
            state: StateMachine::new(now),
            batcher,
            engine,
            vibe_deadline: None,
            plan_nudge_deadline: None,
            sleep_check_dirty: false,
            started_at: now,
        }
    }

    async fn run(mut self) {
        let mut sleep_check = crate::clock::interval(self.config.sleep_check_interval());

        loop {
            if self.sleep_check_dirty {
                sleep_check = crate::clock::interval(self.config.sleep_check_interval());
                self.sleep_check_dirty = false;
            }

            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("coordinator shutting down");
                    break;
                }

                intent = self.intents.recv() => {
                    match intent {
                        Some(intent) => self.handle_intent(intent),
                        None => break,
                    }
                }

                event = self.chat.recv() => {
                    if let Some(event) = event {
                        self.handle_chat_event(event);
                    }
                }

                _ = sleep_check.tick() => {
                    self.handle_sleep_tick();
                }

                _ = async {
                    match self.batcher.window_deadline() {
                        Some(d) => tokio::time::sleep_until(d).await,
                        None => std::future::pending().await,
                    }
                }, if self.batcher.window_deadline().is_some() => {
                    if let Some(batch) = self.batcher.on_window_expiry() {
                        self.dispatch_batch(batch);
                    }
                }

                _ = async {
                    match self.vibe_deadline {
                        Some(d) => tokio::time::sleep_until(d).await,
                        None => std::future::pending().await,
                    }
                }, if self.vibe_deadline.is_some() => {
                    self.handle_vibe_fire();
                }

                _ = async {
                    match self.plan_nudge_deadline {
                        Some(d) => tokio::time::sleep_until(d).await,
                        None => std::future::pending().await,
                    }
                }, if self.plan_nudge_deadline.is_some() => {
                    self.handle_plan_nudge_fire();
                }
            }
        }
    }

    fn handle_intent(&mut self, intent: Intent) {
        match intent {
            Intent::IngestChat(message) => self.handle_chat_message(message),
            Intent::NotifySpeech => self.on_activity(),
            Intent::SetPlan { goal, steps, reply } => {
                let now = Instant::now();
                let (abandoned, deadline) = self.engine.set_plan(goal, steps, now);
                if let Some(old_id) = abandoned {
                    self.overlay.emit(OverlayEvent::Plan {
                        r#type: "abandoned".to_owned(),
                        plan_id: old_id,
                        goal: None,
                    });
                }
                self.on_activity();
                self.plan_nudge_deadline = Some(deadline);
                let plan = self.engine.plan().expect("just created");
                self.overlay.emit(OverlayEvent::Plan {
                    r#type: "created".to_owned(),
                    plan_id: plan.id.clone(),
                    goal: Some(plan.goal.clone()),
                });
                let _ = reply.send(snapshot_plan(plan));
            }
            Intent::MarkStepDone { index, reply } => {
                let now = Instant::now();
                match self.engine.mark_step_done(index, now) {
                    Ok(deadline) => {
                        self.plan_nudge_deadline = deadline;
                        let plan = self.engine.plan().expect("just marked");
                        if deadline.is_none() {
                            self.overlay.emit(OverlayEvent::Plan {
                                r#type: "completed".to_owned(),
                                plan_id: plan.id.clone(),
                                goal: None,
                            });
                        }
                        let _ = reply.send(Ok(snapshot_plan(plan)));
                    }
                    Err(e) => {
                        let _ = reply.send(Err(e));
                    }
                }
            }
            Intent::AbandonPlan => {
                self.engine.abandon_plan();
                self.plan_nudge_deadline = None;
                if let Some(plan) = self.engine.plan() {
                    self.overlay.emit(OverlayEvent::Plan {
                        r#type: "abandoned".to_owned(),
                        plan_id: plan.id.clone(),
                        goal: None,
                    });
                }
            }
            Intent::GetPlan { reply } => {
                let _ = reply.send(self.engine.plan().map(snapshot_plan));
            }
            Intent::Status { reply } => {
                let _ = reply.send(StatusSnapshot {
                    enabled: self.state.state() != CoordinatorState::Sleep,
                    state: self.state.state().as_str(),
                    last_activity_at_ms: epoch_ms()
                        .saturating_sub(self.state.last_activity_at().elapsed().as_millis() as u64),
                    uptime_secs: self.started_at.elapsed().as_secs(),
                    mode: self.engine.mode().as_str(),
                    config: ConfigSnapshot::from(&self.config),
                });
            }
            Intent::UpdateConfig { partial, reply } => {
                let prev_sleep_check_ms = self.config.sleep_check_ms;
                let prev_vibe_interval_ms = self.config.vibe_interval_ms;
                let prev_plan_nudge_delay_ms = self.config.plan_nudge_delay_ms;
                let prev_batch_window_ms = self.config.batch_window_ms;
                let prev_recent_messages_cap = self.config.recent_messages_cap;
                let prev_ack_timeout_ms = self.config.ack_timeout_ms;

                self.config.merge(partial);

                if self.config.sleep_check_ms != prev_sleep_check_ms {
                    self.sleep_check_dirty = true;
                }
                if self.config.vibe_interval_ms != prev_vibe_interval_ms {
                    self.engine.set_vibe_interval(self.config.vibe_interval());
                }
                if self.config.plan_nudge_delay_ms != prev_plan_nudge_delay_ms {
                    self.engine.set_plan_nudge_delay(self.config.plan_nudge_delay());
                }
                if self.config.batch_window_ms != prev_batch_window_ms {
                    self.batcher.set_batch_window(self.config.batch_window());
                }
                if self.config.recent_messages_cap != prev_recent_messages_cap {
                    self.batcher.set_recent_cap(self.config.recent_messages_cap);
                }
                if self.config.ack_timeout_ms != prev_ack_timeout_ms {
                    self.speech.set_ack_timeout(self.config.ack_timeout());
                }

                let _ = reply.send(ConfigSnapshot::from(&self.config));
            }
            Intent::SetMode { mode } => {
                self.vibe_deadline = None;
                self.engine.set_mode(mode);
                if mode == AutonomyMode::Vibe && self.state.state() != CoordinatorState::Sleep {
                    self.vibe_deadline = Some(self.engine.next_vibe_deadline(Instant::now()));
                }
            }
            Intent::VibeReply { replies } => self.handle_vibe_reply(replies),
            Intent::SilentTurnReply { replies, hint } => {
                let misaligned: Vec<String> = replies
                    .into_iter()
                    .filter(|r| classify_reply(r) == ReplyKind::Misaligned)
                    .collect();
                if let Some(prompt) = render_misalignment_correction(&misaligned) {
                    self.submit_silent_turn("misalignment-correction", prompt, hint);
                }
            }
        }
    }

    fn handle_chat_message(&mut self, message: ChatMessage) {
        self.on_activity();
        self.overlay.emit(OverlayEvent::Chat(message.clone()));
        if let Some(batch) = self.batcher.ingest(message) {
            self.dispatch_batch(batch);
        }
    }

    fn handle_chat_event(&mut self, event: ChatEvent) {
        match event {
            ChatEvent::Message(message) => self.handle_chat_message(message),
            ChatEvent::AdapterUp(key) => info!(adapter = %key, "chat adapter connected"),
            ChatEvent::AdapterDown(key) => warn!(adapter = %key, "chat adapter disconnected"),
        }
    }

    /// Transition on activity (chat ingress, speech, successful vibe) and
    /// arm the timers a sleep→active wake starts.
    fn on_activity(&mut self) {
        let now = Instant::now();
        let (event, effect) = self.state.on_activity(now);
        self.apply_transition(event, effect);
    }

    fn apply_transition(&mut self, event: Option<StateChangeEvent>, effect: SideEffect) {
        if let Some(event) = event {
            self.overlay.emit(OverlayEvent::Status { status: event.next.as_str().to_owned() });
        }
        match effect {
            SideEffect::StartTimers => {
                if self.engine.mode() == AutonomyMode::Vibe {
                    self.vibe_deadline = Some(self.engine.next_vibe_deadline(Instant::now()));
                }
            }
            SideEffect::StopTimers => {
                self.vibe_deadline = None;
                self.plan_nudge_deadline = None;
            }
            SideEffect::StopTimersAndCompact => {
                self.vibe_deadline = None;
                self.plan_nudge_deadline = None;
                self.enqueue_compact();
            }
            SideEffect::None => {}
        }
    }

    fn handle_sleep_tick(&mut self) {
        let now = Instant::now();
        let (event, effect) =
            self.state.tick(now, self.config.idle_after(), self.config.sleep_after_idle());
        self.apply_transition(event, effect);
    }

    fn handle_vibe_fire(&mut self) {
        self.vibe_deadline = None;
        match self.engine.on_vibe_fire(self.state.state(), self.dispatcher.is_busy()) {
            VibeOutcome::Skipped { reschedule, .. } => {
                if reschedule {
                    self.vibe_deadline = Some(self.engine.next_vibe_deadline(Instant::now()));
                }
            }
            VibeOutcome::Fire { prompt } => {
                self.on_activity();
                self.submit_vibe_turn(prompt);
            }
        }
    }

    fn handle_vibe_reply(&mut self, replies: Vec<String>) {
        let kinds = classify_all(&replies);
        let api_errors = kinds.iter().filter(|k| **k == ReplyKind::ApiError).count();
        if api_errors > 0 {
            warn!(count = api_errors, "vibe reply classified as ApiError");
        }
        let quiet = kinds.iter().any(|k| *k == ReplyKind::QuietAck);
        let misaligned: Vec<String> = replies
            .iter()
            .zip(kinds.iter())
            .filter(|(_, k)| **k == ReplyKind::Misaligned)
            .map(|(s, _)| s.clone())
            .collect();

        match self.engine.on_vibe_reply(quiet, &misaligned) {
            ReplyOutcome::Sleep => {
                let (event, effect) = self.state.sleep_now();
                self.apply_transition(event, effect);
            }
            ReplyOutcome::Misaligned { prompt } => self.submit_vibe_turn(prompt),
            ReplyOutcome::Reschedule => {
                self.vibe_deadline = Some(self.engine.next_vibe_deadline(Instant::now()));
            }
        }
    }

    fn handle_plan_nudge_fire(&mut self) {
        self.plan_nudge_deadline = None;
        match self.engine.on_plan_nudge_fire(self.state.state(), self.dispatcher.is_busy()) {
            PlanNudgeOutcome::Skipped { .. } => {}
            PlanNudgeOutcome::Fire { prompt } => {
                self.submit_silent_turn("plan-nudge", prompt, "planning")
            }
        }
    }

    fn dispatch_batch(&mut self, batch: Batch) {
        let rendered = render_batch(&batch, epoch_ms());
        self.submit_silent_turn("chat-batch", rendered, "chatting");
    }

    fn enqueue_compact(&mut self) {
        let gateway = Arc::clone(&self.gateway);
        let job = DispatchJob::new("compact", async move { gateway.trigger("/compact").await });
        self.dispatcher.submit(job);
    }

    /// Submit a turn whose reply has no state-machine follow-up beyond
    /// misalignment correction: chat batches and plan nudges don't react to
    /// `NO_REPLY`/`LIVESTREAM_REPLIED` the way vibe does, but misalignment
    /// correction still applies to every invocation kind. Emits the
    /// transient `crawd:status` activity hint ("vibing"/"chatting"/
    /// "planning" are UI cues, not state-machine states) for the turn's
    /// duration, then decays back to the real state once it resolves.
    fn submit_silent_turn(&mut self, label: &'static str, prompt: String, hint: &'static str) {
        self.overlay.emit(OverlayEvent::Status { status: hint.to_owned() });
        let gateway = Arc::clone(&self.gateway);
        let (reply_tx, reply_rx) = oneshot::channel();
        let job = DispatchJob::new(label, async move { gateway.trigger(&prompt).await })
            .with_reply(reply_tx);
        self.dispatcher.submit(job);

        let overlay = Arc::clone(&self.overlay);
        let real_state = self.state.state().as_str();
        let intent_tx = self.intent_tx.clone();
        tokio::spawn(async move {
            let replies = reply_rx.await;
            overlay.emit(OverlayEvent::Status { status: real_state.to_owned() });
            if let Ok(replies) = replies {
                let _ = intent_tx.send(Intent::SilentTurnReply { replies, hint });
            }
        });
    }

    /// Submit a vibe turn and route its reply back into the actor as
    /// `Intent::VibeReply`, since only the vibe policy reacts to its own
    /// turn's outcome.
    fn submit_vibe_turn(&mut self, prompt: String) {
        self.overlay.emit(OverlayEvent::Status { status: "vibing".to_owned() });
        let gateway = Arc::clone(&self.gateway);
        let (reply_tx, reply_rx) = oneshot::channel();
        let job = DispatchJob::new("vibe", async move { gateway.trigger(&prompt).await })
            .with_reply(reply_tx);
        self.dispatcher.submit(job);

        let intent_tx = self.intent_tx.clone();
        tokio::spawn(async move {
            if let Ok(replies) = reply_rx.await {
                let _ = intent_tx.send(Intent::VibeReply { replies });
            }
        });
    }
}
