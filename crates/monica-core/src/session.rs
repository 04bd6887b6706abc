//! Bridge session controller.
//!
//! A [`BridgeSession`] owns everything that used to be page-global: the
//! conversation state and changelog of one project, the tag status board and
//! the automation flag. It is created by rehydrating from the store and flushed
//! back on teardown.
//!
//! The automation flag starts from the value the extension saved under
//! [`AUTOMATION_KEY`] and falls back to the configured default.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use monica_config::SessionConfig;
use monica_protocols::{
    AUTOMATION_KEY, ActionCommand, Command, ContextStore, ConversationState, MessageRecord, NoticeLevel, Notifier,
    PersistedRecord, Report, StatusObserver, StorageError, UpdateCommand, UpstreamError,
    state::MESSAGES_KEY,
};

use crate::autofix::{AutoFixer, PreviewError};
use crate::dispatcher::ActionDispatcher;
use crate::extractor::extract_commands;
use crate::merge::merge_into;
use crate::project::ProjectId;
use crate::prompt;
use crate::tags::TagStatusBoard;

/// Notice shown when state cannot be keyed to a project.
pub const NO_PROJECT_NOTICE: &str = "Could not identify Project ID.";

/// What one call to [`BridgeSession::ingest`] did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngestOutcome {
    pub actions_dispatched: usize,
    /// Unknown actions and actions seen while automation was paused.
    pub actions_skipped: usize,
    pub updates_applied: usize,
    /// Updates rejected by the merge depth guard.
    pub updates_rejected: usize,
    pub changelog_entries: usize,
    /// Markers whose payload could not be parsed.
    pub malformed: usize,
    pub reports: Vec<Report>,
}

impl IngestOutcome {
    /// Whether any command was recognised.
    pub fn found_commands(&self) -> bool {
        self.actions_dispatched
            + self.actions_skipped
            + self.updates_applied
            + self.updates_rejected
            + self.changelog_entries
            > 0
    }
}

pub struct BridgeSession {
    project: Option<ProjectId>,
    record: PersistedRecord,
    tags: TagStatusBoard,
    automation: bool,
    sender_role: String,
    store: Arc<dyn ContextStore>,
    dispatcher: ActionDispatcher,
    autofix: AutoFixer,
    notifier: Arc<dyn Notifier>,
}

impl BridgeSession {
    /// Open a session and rehydrate it from the store.
    ///
    /// A missing record starts empty. A record that cannot be read also starts
    /// empty, and the user is told.
    pub async fn start(
        project: Option<ProjectId>,
        store: Arc<dyn ContextStore>,
        dispatcher: ActionDispatcher,
        notifier: Arc<dyn Notifier>,
        config: &SessionConfig,
    ) -> Self {
        let automation = match store.load(AUTOMATION_KEY).await {
            Ok(Some(Value::Bool(active))) => active,
            Ok(_) => config.automation_enabled,
            Err(e) => {
                debug!("Automation flag unavailable, using default: {}", e);
                config.automation_enabled
            }
        };

        let mut session = Self {
            project,
            record: PersistedRecord::default(),
            tags: TagStatusBoard::new(),
            automation,
            sender_role: config.sender_role.clone(),
            store,
            autofix: dispatcher.auto_fixer(),
            dispatcher,
            notifier,
        };

        match session.load_record().await {
            Ok(Some(record)) => {
                info!(
                    "Rehydrated context for project {}",
                    session.project_label()
                );
                session.record = record;
                session
                    .notifier
                    .notify(NoticeLevel::Success, "Context loaded.");
            }
            Ok(None) => debug!("No saved context for project {}", session.project_label()),
            Err(e) => {
                warn!("Failed to load context: {}", e);
                session.notifier.notify(
                    NoticeLevel::Error,
                    &format!("Could not load saved context: {}", e),
                );
            }
        }

        session
    }

    pub fn project(&self) -> Option<&ProjectId> {
        self.project.as_ref()
    }

    pub fn state(&self) -> &ConversationState {
        &self.record.conversation_state
    }

    pub fn changelog(&self) -> &str {
        &self.record.cumulative_changelog
    }

    pub fn tag_status(&self) -> &TagStatusBoard {
        &self.tags
    }

    /// Register an observer for tag status transitions.
    pub fn subscribe(&mut self, observer: Arc<dyn StatusObserver>) {
        self.tags.subscribe(observer);
    }

    pub fn automation_enabled(&self) -> bool {
        self.automation
    }

    pub fn set_automation(&mut self, enabled: bool) {
        if self.automation != enabled {
            info!("Automation {}", if enabled { "enabled" } else { "paused" });
        }
        self.automation = enabled;
    }

    /// Process every command embedded in `text`, one at a time, in document
    /// order. Each action completes (report included) before the next command
    /// starts.
    pub async fn ingest(&mut self, text: &str) -> IngestOutcome {
        let mut outcome = IngestOutcome::default();
        let mut commands = extract_commands(text);

        for command in commands.by_ref() {
            match command {
                Command::Action(action) => self.run_action(&action, &mut outcome).await,
                Command::Update(update) => self.apply_update(text, update, &mut outcome).await,
                Command::Changelog { text: entry } => {
                    self.record.cumulative_changelog.push_str(entry.trim());
                    self.record.cumulative_changelog.push_str("\n\n");
                    outcome.changelog_entries += 1;
                    self.persist_or_notify().await;
                }
            }
        }

        outcome.malformed = commands.skipped();
        if outcome.malformed > 0 {
            self.notifier.notify(
                NoticeLevel::Error,
                &format!("Skipped {} malformed command(s).", outcome.malformed),
            );
        }
        outcome
    }

    /// Forward a build or console error from the preview to the chat.
    ///
    /// Does nothing while automation is paused or the previous forward is
    /// still cooling down.
    pub async fn check_preview_errors(&mut self) -> Option<PreviewError> {
        if !self.automation {
            debug!("Automation paused, not checking preview errors");
            return None;
        }
        self.autofix.check().await
    }

    /// Surface an upstream failure and salvage any partial response.
    pub async fn recover_partial(&mut self, error: &UpstreamError) -> Option<IngestOutcome> {
        warn!("{}", error);
        self.notifier.notify(NoticeLevel::Error, error.user_message());
        match error.partial_response.as_deref() {
            Some(partial) if !partial.is_empty() => Some(self.ingest(partial).await),
            _ => None,
        }
    }

    /// Drop the saved context for this project and reset in-memory state.
    pub async fn clear(&mut self) -> Result<(), StorageError> {
        let Some(project) = &self.project else {
            self.notifier.notify(NoticeLevel::Error, NO_PROJECT_NOTICE);
            return Ok(());
        };

        self.store.save(project.as_str(), None).await?;
        info!("Cleared context for project {}", project);
        self.record = PersistedRecord::default();
        self.tags.reset();
        self.notifier
            .notify(NoticeLevel::Success, "Context cleared.");
        Ok(())
    }

    /// Persist the current state. Called on teardown.
    pub async fn flush(&self) -> Result<(), StorageError> {
        self.persist().await
    }

    /// Pretty-printed conversation state.
    pub fn state_json(&self) -> String {
        serde_json::to_string_pretty(&self.record.conversation_state)
            .unwrap_or_else(|_| "{}".to_string())
    }

    /// The new-session prompt built from what is currently saved for this
    /// project, or `None` when nothing is saved.
    pub async fn rehydrate_prompt(&self) -> Option<String> {
        match self.load_record().await {
            Ok(Some(record)) => Some(prompt::rehydrate_prompt(&record)),
            Ok(None) => {
                self.notifier
                    .notify(NoticeLevel::Info, "No saved context for this project.");
                None
            }
            Err(e) => {
                warn!("Failed to load context for prompt: {}", e);
                self.notifier.notify(
                    NoticeLevel::Error,
                    &format!("Could not load saved context: {}", e),
                );
                None
            }
        }
    }

    /// Hand out the accumulated changelog and start a new one.
    pub async fn take_changelog(&mut self) -> String {
        let changelog = std::mem::take(&mut self.record.cumulative_changelog);
        self.persist_or_notify().await;
        changelog
    }

    async fn run_action(&mut self, action: &ActionCommand, outcome: &mut IngestOutcome) {
        if !self.automation {
            debug!("Automation paused, skipping {}", action.action);
            self.notifier.notify(
                NoticeLevel::Info,
                &format!("Automation paused; skipped {}", action.action),
            );
            outcome.actions_skipped += 1;
            return;
        }

        match self.dispatcher.dispatch(action, &mut self.tags).await {
            Some(report) => {
                outcome.actions_dispatched += 1;
                outcome.reports.push(report);
            }
            None => outcome.actions_skipped += 1,
        }
    }

    async fn apply_update(&mut self, text: &str, update: UpdateCommand, outcome: &mut IngestOutcome) {
        // A rejected merge must leave the state exactly as it was.
        let mut state = self.record.conversation_state.clone();
        if let Err(e) = merge_into(&mut state, update.context_update) {
            warn!("Rejected context update: {}", e);
            self.notifier
                .notify(NoticeLevel::Error, &format!("Context update rejected: {}", e));
            outcome.updates_rejected += 1;
            return;
        }

        if let Some(summary) = update.summary {
            let message = MessageRecord::new(text, summary, self.sender_role.as_str());
            match serde_json::to_value(message) {
                Ok(message) => append_message(&mut state, message),
                Err(e) => warn!("Failed to record message: {}", e),
            }
        }
        self.record.conversation_state = state;

        outcome.updates_applied += 1;
        self.persist_or_notify().await;
    }

    async fn load_record(&self) -> Result<Option<PersistedRecord>, StorageError> {
        let Some(project) = &self.project else {
            return Ok(None);
        };
        match self.store.load(project.as_str()).await? {
            Some(value) => Ok(Some(PersistedRecord::from_value(value)?)),
            None => Ok(None),
        }
    }

    async fn persist(&self) -> Result<(), StorageError> {
        let Some(project) = &self.project else {
            self.notifier.notify(NoticeLevel::Error, NO_PROJECT_NOTICE);
            return Ok(());
        };
        let value = self.record.to_value()?;
        self.store.save(project.as_str(), Some(value)).await?;
        debug!("Persisted context for project {}", project);
        Ok(())
    }

    async fn persist_or_notify(&self) {
        if let Err(e) = self.persist().await {
            warn!("Failed to persist context: {}", e);
            self.notifier
                .notify(NoticeLevel::Error, &format!("Could not save context: {}", e));
        }
    }

    fn project_label(&self) -> &str {
        self.project.as_ref().map_or("<unknown>", ProjectId::as_str)
    }
}

/// Append to the message log, starting a new log if the key holds anything
/// other than a list.
fn append_message(state: &mut ConversationState, message: Value) {
    match state.get_mut(MESSAGES_KEY) {
        Some(Value::Array(messages)) => messages.push(message),
        _ => {
            state.insert(MESSAGES_KEY.to_string(), Value::Array(vec![message]));
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
