//! The conversation engine: walks a scenario graph, appends to the
//! transcript, and reacts to bridge signals.
//!
//! [`ConversationEngine`] is a cheap-to-clone handle over a locked inner
//! state, so the bridge listener task, scheduled continuations, and the
//! hosting application all drive the same session. The lock is a
//! `parking_lot::Mutex` and is never held across an await point; every
//! delay happens between lock scopes, with a generation check afterwards
//! so a reset invalidates anything that slept through it.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::{Value, json};
use thiserror::Error;
use tokio::task::JoinHandle;

use miette::Diagnostic;

use crate::event_bus::{BridgeEvent, EventHub};
use crate::graphs::{GraphError, ScenarioGraph, StateNode, resolver};
use crate::message::Message;
use crate::modules::{ModuleError, ModuleHistoryEntry, ModuleLifecycleManager};
use crate::notify::{Notification, Notifier, NullNotifier};
use crate::scanner::{FieldStatus, ScanError, SensitiveDataScanner, SensitiveField};
use crate::types::{SessionPhase, StateId, TOKEN_START_CALL};

use super::config::EngineConfig;
use super::session::ConversationSession;

/// Failures of engine operations.
#[derive(Debug, Error, Diagnostic)]
pub enum EngineError {
    #[error("session is not active (phase: {phase})")]
    #[diagnostic(
        code(scriptline::runtimes::session_not_active),
        help("Call start() before driving the conversation.")
    )]
    SessionNotActive { phase: SessionPhase },

    #[error("session already started")]
    #[diagnostic(code(scriptline::runtimes::already_started))]
    AlreadyStarted,

    #[error("input not expected in state '{state_id}': {detail}")]
    #[diagnostic(
        code(scriptline::runtimes::input_not_expected),
        help("Wait for pending verification to complete before selecting.")
    )]
    InputNotExpected { state_id: String, detail: String },

    #[error("no transition from state '{state_id}' for '{token}'")]
    #[diagnostic(
        code(scriptline::runtimes::transition_unresolved),
        help("The scenario has no edge for this response; the session state is unchanged.")
    )]
    TransitionUnresolved { state_id: String, token: String },

    #[error("unknown state: {state_id}")]
    #[diagnostic(code(scriptline::runtimes::unknown_state))]
    UnknownState { state_id: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Module(#[from] ModuleError),

    #[error(transparent)]
    Scanner(#[from] ScanError),
}

/// What a `select` call did once the settle delay elapsed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectOutcome {
    /// The session advanced to this state.
    Advanced(StateId),
    /// A reset happened while the selection settled; nothing was applied.
    Superseded,
}

/// Deferred work decided while the lock was held, executed after release.
enum Followup {
    AutoContinue { generation: u64 },
    VerificationResume { generation: u64, option: String },
}

struct EngineInner {
    graph: Arc<ScenarioGraph>,
    session: ConversationSession,
    messages: Vec<Message>,
    modules: ModuleLifecycleManager,
    scanner: SensitiveDataScanner,
    notifier: Arc<dyn Notifier>,
    /// Outstanding scheduled continuations; aborted on reset/end.
    scheduled: Vec<JoinHandle<()>>,
    /// Last accepted completion per (module id, state id), for dedup.
    recent_completions: FxHashMap<(String, String), Instant>,
    listener: Option<JoinHandle<()>>,
}

/// Cloneable driver for one scripted conversation.
#[derive(Clone)]
pub struct ConversationEngine {
    inner: Arc<Mutex<EngineInner>>,
    hub: Arc<EventHub>,
    config: EngineConfig,
}

impl ConversationEngine {
    /// Build an engine over a loaded graph.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Scanner`] if the built-in sensitive-data
    /// classifiers fail to compile.
    pub fn new(
        graph: Arc<ScenarioGraph>,
        hub: Arc<EventHub>,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        let inner = EngineInner {
            graph,
            session: ConversationSession::new(),
            messages: Vec::new(),
            modules: ModuleLifecycleManager::new(Arc::clone(&hub)),
            scanner: SensitiveDataScanner::with_defaults()?,
            notifier: Arc::new(NullNotifier),
            scheduled: Vec::new(),
            recent_completions: FxHashMap::default(),
            listener: None,
        };
        Ok(Self {
            inner: Arc::new(Mutex::new(inner)),
            hub,
            config,
        })
    }

    /// Replace the notifier collaborator.
    #[must_use]
    pub fn with_notifier(self, notifier: Arc<dyn Notifier>) -> Self {
        self.inner.lock().notifier = notifier;
        self
    }

    /// Replace the sensitive-data scanner.
    #[must_use]
    pub fn with_scanner(self, scanner: SensitiveDataScanner) -> Self {
        self.inner.lock().scanner = scanner;
        self
    }

    // ── Lifecycle ──────────────────────────────────────────────────────

    /// Begin the call.
    ///
    /// Takes the initial state's `START_CALL` transition when present,
    /// otherwise enters the initial state itself, then applies that
    /// state's side effects.
    ///
    /// # Errors
    ///
    /// [`EngineError::AlreadyStarted`] when a call is active;
    /// [`EngineError::SessionNotActive`] when the session has ended and
    /// was not reset.
    pub fn start(&self) -> Result<StateId, EngineError> {
        let followup = {
            let mut inner = self.inner.lock();
            match inner.session.phase {
                SessionPhase::Active => return Err(EngineError::AlreadyStarted),
                SessionPhase::Ended => {
                    return Err(EngineError::SessionNotActive {
                        phase: SessionPhase::Ended,
                    });
                }
                SessionPhase::Idle => {}
            }

            let initial = inner.graph.initial_state_id.clone();
            let entry = inner
                .graph
                .state(&initial)
                .and_then(|node| node.transition(TOKEN_START_CALL))
                .cloned()
                .unwrap_or(initial);

            inner.session.phase = SessionPhase::Active;
            inner.session.set_current_state(entry.clone());
            tracing::info!(scenario = %inner.graph.id, state = %entry, "conversation started");
            inner.apply_entry(&entry, &self.config)
        };
        self.schedule(followup);

        let inner = self.inner.lock();
        Ok(inner
            .session
            .current_state_id
            .clone()
            .unwrap_or_else(|| inner.graph.initial_state_id.clone()))
    }

    /// Apply a response selection.
    ///
    /// Waits out the settle delay first so the UI can show the pressed
    /// option; a reset during that window supersedes the selection and
    /// leaves the session untouched.
    ///
    /// # Errors
    ///
    /// [`EngineError::SessionNotActive`] outside an active call,
    /// [`EngineError::InputNotExpected`] while a verification is pending,
    /// [`EngineError::TransitionUnresolved`] when the scenario has no edge
    /// for `token` (the state stays where it was).
    pub async fn select(&self, token: &str) -> Result<SelectOutcome, EngineError> {
        let generation = {
            let inner = self.inner.lock();
            if inner.session.phase != SessionPhase::Active {
                return Err(EngineError::SessionNotActive {
                    phase: inner.session.phase,
                });
            }
            let state_id = inner.current_state_or_initial();
            if !inner.session.pending_verifications.is_empty() {
                return Err(EngineError::InputNotExpected {
                    state_id,
                    detail: "verification pending".into(),
                });
            }
            inner.session.generation
        };

        tokio::time::sleep(self.config.select_settle_delay).await;

        let (outcome, followup) = {
            let mut inner = self.inner.lock();
            if inner.session.generation != generation
                || inner.session.phase != SessionPhase::Active
            {
                tracing::debug!(token, "selection superseded by reset");
                return Ok(SelectOutcome::Superseded);
            }

            let state_id = inner.current_state_or_initial();
            inner.messages.push(Message::agent(token));

            let Some(target) = resolver::resolve(&inner.graph, &state_id, Some(token)).cloned()
            else {
                tracing::warn!(state = %state_id, token, "transition unresolved");
                inner.notifier.notify(Notification::warning(
                    "No matching response",
                    format!("'{token}' does not lead anywhere from here."),
                ));
                return Err(EngineError::TransitionUnresolved {
                    state_id,
                    token: token.to_string(),
                });
            };

            inner.session.awaiting_user_response = false;
            inner.session.user_initiated_transition = true;
            inner.session.set_current_state(target.clone());
            tracing::debug!(from = %state_id, to = %target, token, "transition applied");
            let followup = inner.apply_entry(&target, &self.config);
            inner.session.user_initiated_transition = false;
            (SelectOutcome::Advanced(target), followup)
        };
        self.schedule(followup);
        Ok(outcome)
    }

    /// Park the session; only `reset` revives it.
    pub fn end(&self) {
        let mut inner = self.inner.lock();
        inner.session.phase = SessionPhase::Ended;
        inner.abort_scheduled();
        tracing::info!(scenario = %inner.graph.id, "conversation ended");
    }

    /// Return to the pre-call state.
    ///
    /// Cancels outstanding scheduled continuations, invalidates everything
    /// that captured the old generation, forgets module state, and moves
    /// the position back to the graph's initial state id. Pass
    /// `clear_log: false` to keep the transcript for review.
    pub fn reset(&self, clear_log: bool) {
        let mut inner = self.inner.lock();
        inner.abort_scheduled();
        inner.session.reset();
        let initial = inner.graph.initial_state_id.clone();
        inner.session.set_current_state(initial);
        inner.modules.reset();
        inner.recent_completions.clear();
        if clear_log {
            inner.messages.clear();
        }
        tracing::info!(scenario = %inner.graph.id, clear_log, "session reset");
    }

    /// Move the session directly to `state_id` (authoring/debug path) and
    /// apply its side effects.
    ///
    /// # Errors
    ///
    /// [`EngineError::UnknownState`] when the graph has no such state.
    pub fn jump_to_state(&self, state_id: &str) -> Result<(), EngineError> {
        let followup = {
            let mut inner = self.inner.lock();
            if !inner.graph.contains(state_id) {
                return Err(EngineError::UnknownState {
                    state_id: state_id.to_string(),
                });
            }
            inner.session.phase = SessionPhase::Active;
            inner.session.set_current_state(state_id);
            tracing::debug!(state = %state_id, "jump applied");
            inner.apply_entry(state_id, &self.config)
        };
        self.schedule(followup);
        Ok(())
    }

    // ── Modules & fields ───────────────────────────────────────────────

    /// Complete a module with a result payload. Publishes the completion
    /// on the bridge; verification completions then flow back through the
    /// listener.
    ///
    /// # Errors
    ///
    /// [`EngineError::Module`] when the module was never triggered.
    pub fn complete_module(&self, module_id: &str, result: Value) -> Result<(), EngineError> {
        let mut inner = self.inner.lock();
        inner.modules.complete(module_id, result)?;
        Ok(())
    }

    /// Update the status of one sensitive field on one transcript entry.
    /// Returns `true` if the field was found.
    pub fn validate_field(&self, message_id: &str, field_id: &str, status: FieldStatus) -> bool {
        let mut inner = self.inner.lock();
        let Some(field) = inner
            .messages
            .iter_mut()
            .find(|m| m.id == message_id)
            .and_then(|m| m.sensitive_data.as_mut())
            .and_then(|fields| fields.iter_mut().find(|f| f.id == field_id))
        else {
            return false;
        };
        field.status = status;
        true
    }

    // ── Bridge listener ────────────────────────────────────────────────

    /// Subscribe to the bridge and react to completion/control signals.
    /// Idempotent: a second call while the listener runs is a no-op.
    ///
    /// The task holds only a weak reference to the session; it winds down
    /// on its own once the last engine handle is dropped, so no explicit
    /// teardown is required.
    pub fn listen_for_bridge_events(&self) {
        let mut inner = self.inner.lock();
        if inner
            .listener
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
        {
            tracing::debug!("bridge listener already running");
            return;
        }

        let mut stream = self.hub.subscribe();
        let weak = Arc::downgrade(&self.inner);
        let hub = Arc::clone(&self.hub);
        let config = self.config;
        inner.listener = Some(tokio::spawn(async move {
            loop {
                match stream.recv().await {
                    Ok(event) => {
                        let Some(inner) = weak.upgrade() else { break };
                        let engine = ConversationEngine {
                            inner,
                            hub: Arc::clone(&hub),
                            config,
                        };
                        engine.handle_bridge_event(event);
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "bridge listener lagged");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        }));
    }

    /// Stop the bridge listener, if running.
    pub fn stop_bridge_listener(&self) {
        if let Some(handle) = self.inner.lock().listener.take() {
            handle.abort();
        }
    }

    fn handle_bridge_event(&self, event: BridgeEvent) {
        match event {
            BridgeEvent::VerificationComplete { module_id, .. }
            | BridgeEvent::VerificationSuccessful { module_id, .. } => {
                self.on_verification_completed(&module_id, json!({ "verified": true }));
            }
            BridgeEvent::ModuleCompleted {
                module_id,
                module_kind,
                result,
            } if module_kind.is_verification() => {
                self.on_verification_completed(&module_id, result);
            }
            BridgeEvent::JumpToState { state_id } => {
                if let Err(err) = self.jump_to_state(&state_id) {
                    tracing::warn!(state = %state_id, %err, "bridge jump rejected");
                }
            }
            BridgeEvent::ModuleCompleted { module_id, .. } => {
                tracing::debug!(module_id, "non-verification module completed");
            }
            BridgeEvent::ModuleTrigger { .. }
            | BridgeEvent::ScenarioChange { .. }
            | BridgeEvent::Notification { .. } => {}
        }
    }

    /// A verification signal arrived; dedupe it, mark the transcript, and
    /// schedule the auto-advance.
    fn on_verification_completed(&self, module_id: &str, result: Value) {
        let followup = {
            let mut inner = self.inner.lock();
            if inner.session.phase != SessionPhase::Active {
                return;
            }
            let state_id = inner.current_state_or_initial();

            let key = (module_id.to_string(), state_id.clone());
            let now = Instant::now();
            if let Some(seen) = inner.recent_completions.get(&key) {
                if now.duration_since(*seen) < self.config.completion_cooldown {
                    tracing::debug!(module_id, state = %state_id, "duplicate completion ignored");
                    return;
                }
            }
            inner.recent_completions.insert(key, now);

            // Attach the result to the transcript entry carrying the module.
            for message in inner.messages.iter_mut().rev() {
                if let Some(module) = message.module.as_mut() {
                    if module.id == module_id {
                        module.completed = true;
                        module.result = Some(result.clone());
                        break;
                    }
                }
            }
            inner.session.pending_verifications.remove(module_id);

            let options = resolver::response_options_for(&inner.graph, &state_id);
            tracing::info!(module_id, state = %state_id, "verification completed");
            options.into_iter().next().map(|option| {
                Followup::VerificationResume {
                    generation: inner.session.generation,
                    option,
                }
            })
        };
        self.schedule(followup);
    }

    // ── Scheduled continuations ────────────────────────────────────────

    fn schedule(&self, followup: Option<Followup>) {
        let Some(followup) = followup else { return };
        let engine = self.clone();
        let handle = tokio::spawn(async move {
            match followup {
                Followup::AutoContinue { generation } => {
                    tokio::time::sleep(engine.config.select_settle_delay).await;
                    engine.advance_automatically(generation);
                }
                Followup::VerificationResume { generation, option } => {
                    tokio::time::sleep(engine.config.verification_resume_delay).await;
                    let still_valid = {
                        let inner = engine.inner.lock();
                        inner.session.generation == generation
                            && inner.session.phase == SessionPhase::Active
                    };
                    if !still_valid {
                        tracing::debug!("verification resume superseded by reset");
                        return;
                    }
                    if let Err(err) = engine.select(&option).await {
                        tracing::warn!(%err, %option, "verification resume failed");
                    }
                }
            }
        });
        self.inner.lock().track(handle);
    }

    /// Take the default path out of the current state, if it still exists.
    fn advance_automatically(&self, generation: u64) {
        let followup = {
            let mut inner = self.inner.lock();
            if inner.session.generation != generation
                || inner.session.phase != SessionPhase::Active
            {
                tracing::debug!("auto-continue superseded by reset");
                return;
            }
            let state_id = inner.current_state_or_initial();
            let Some(target) = resolver::resolve(&inner.graph, &state_id, None).cloned() else {
                return;
            };
            inner.session.set_current_state(target.clone());
            tracing::debug!(from = %state_id, to = %target, "auto-continued");
            inner.apply_entry(&target, &self.config)
        };
        self.schedule(followup);
    }

    // ── Views ──────────────────────────────────────────────────────────

    /// Snapshot of the transcript, oldest first.
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.inner.lock().messages.clone()
    }

    #[must_use]
    pub fn current_state_id(&self) -> Option<StateId> {
        self.inner.lock().session.current_state_id.clone()
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.inner.lock().session.phase
    }

    /// The current state's static payload, if the session is positioned.
    #[must_use]
    pub fn state_data(&self) -> Option<StateNode> {
        let inner = self.inner.lock();
        let state_id = inner.session.current_state_id.as_deref()?;
        inner.graph.state(state_id).cloned()
    }

    /// Response options for the current state.
    #[must_use]
    pub fn response_options(&self) -> Vec<String> {
        let inner = self.inner.lock();
        match inner.session.current_state_id.as_deref() {
            Some(state_id) => resolver::response_options_for(&inner.graph, state_id),
            None => Vec::new(),
        }
    }

    #[must_use]
    pub fn module_history(&self) -> Vec<ModuleHistoryEntry> {
        self.inner.lock().modules.history().to_vec()
    }

    #[must_use]
    pub fn awaiting_user_response(&self) -> bool {
        self.inner.lock().session.awaiting_user_response
    }

    #[must_use]
    pub fn scenario_id(&self) -> String {
        self.inner.lock().graph.id.clone()
    }

    /// The hub this engine publishes to and listens on.
    #[must_use]
    pub fn hub(&self) -> Arc<EventHub> {
        Arc::clone(&self.hub)
    }
}

// The listener task only holds a weak reference, so the inner state drops
// with the last engine handle; take its subscription down with it.
impl Drop for EngineInner {
    fn drop(&mut self) {
        self.abort_scheduled();
        if let Some(handle) = self.listener.take() {
            handle.abort();
        }
    }
}

impl EngineInner {
    fn current_state_or_initial(&self) -> StateId {
        self.session
            .current_state_id
            .clone()
            .unwrap_or_else(|| self.graph.initial_state_id.clone())
    }

    fn track(&mut self, handle: JoinHandle<()>) {
        self.scheduled.retain(|h| !h.is_finished());
        self.scheduled.push(handle);
    }

    fn abort_scheduled(&mut self) {
        for handle in self.scheduled.drain(..) {
            handle.abort();
        }
    }

    /// Run the side effects of entering `state_id`, at most once per
    /// session. Returns deferred work for the caller to schedule outside
    /// the lock.
    fn apply_entry(&mut self, state_id: &str, config: &EngineConfig) -> Option<Followup> {
        if self.session.is_processed(state_id) {
            tracing::debug!(state = %state_id, "state already processed, skipping effects");
            return None;
        }
        self.session.processed_state_ids.insert(state_id.to_string());

        let graph = Arc::clone(&self.graph);
        let Some(node) = graph.state(state_id) else {
            return None;
        };

        if let Some(text) = &node.meta.system_message {
            self.messages.push(Message::system(text.clone()));
        }

        if let Some(text) = &node.meta.customer_text {
            let fields = self.merged_sensitive_fields(node, text);
            let options = resolver::response_options_for(&graph, state_id);
            self.messages.push(
                Message::customer(text.clone())
                    .with_sensitive_data(fields)
                    .with_response_options(options)
                    .with_requires_verification(node.requires_verification),
            );
            self.session.awaiting_user_response = true;
        }

        if let Some(text) = &node.meta.agent_text {
            if !self.session.user_initiated_transition {
                let options = resolver::response_options_for(&graph, state_id);
                self.messages
                    .push(Message::agent(text.clone()).with_response_options(options));
            }
        }

        if let Some(module) = self.modules.on_state_entered(state_id, node) {
            if module.kind.is_verification() {
                self.session.pending_verifications.insert(module.id.clone());
            }
            let title = node
                .meta
                .module
                .as_ref()
                .and_then(|d| d.title.clone())
                .unwrap_or_else(|| module.kind.to_string());
            if module.inline {
                self.messages.push(
                    Message::system(title)
                        .with_module(module)
                        .with_requires_verification(node.requires_verification),
                );
            } else {
                self.messages
                    .push(Message::system(format!("Module available: {title}")));
            }
        }

        self.maybe_auto_continue(node, config)
    }

    /// Decide whether this state should advance on its own: a default-only
    /// path, nothing to wait for, and no auto-continue veto at any level.
    fn maybe_auto_continue(&self, node: &StateNode, config: &EngineConfig) -> Option<Followup> {
        if self.session.awaiting_user_response || !self.session.pending_verifications.is_empty() {
            return None;
        }
        if node.meta.module.is_some() || !node.has_default_path() {
            return None;
        }
        let has_choices = node
            .transitions
            .iter()
            .any(|(token, _)| !crate::types::is_reserved_token(token));
        if has_choices {
            return None;
        }
        if config.prevent_auto_continue
            || self.graph.prevent_auto_continue
            || node.meta.prevent_auto_continue
        {
            return None;
        }
        Some(Followup::AutoContinue {
            generation: self.session.generation,
        })
    }

    /// Authored fields first, then scan findings that add new values.
    fn merged_sensitive_fields(&self, node: &StateNode, text: &str) -> Vec<SensitiveField> {
        let mut fields = node.meta.sensitive_fields.clone();
        for found in self.scanner.scan(text) {
            if !fields.iter().any(|f| f.value == found.value) {
                fields.push(found);
            }
        }
        fields
    }
}
