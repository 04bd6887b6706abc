//! Tag status board.
//!
//! Tracks the transient run-state of every dispatchable action kind and pushes
//! each transition to the registered observers as it happens.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use monica_protocols::{ActionName, ReportStatus, StatusObserver, TagEntry, TagState};

/// In-memory status of each action kind. Never persisted.
pub struct TagStatusBoard {
    entries: BTreeMap<ActionName, TagEntry>,
    observers: Vec<Arc<dyn StatusObserver>>,
}

impl TagStatusBoard {
    /// Create a board with every action idle.
    pub fn new() -> Self {
        Self {
            entries: ActionName::ALL
                .into_iter()
                .map(|name| (name, TagEntry::default()))
                .collect(),
            observers: Vec::new(),
        }
    }

    /// Register an observer for all future transitions.
    pub fn subscribe(&mut self, observer: Arc<dyn StatusObserver>) {
        self.observers.push(observer);
    }

    pub fn get(&self, action: ActionName) -> TagEntry {
        self.entries.get(&action).copied().unwrap_or_default()
    }

    /// Snapshot of all entries, ordered by action.
    pub fn entries(&self) -> Vec<(ActionName, TagEntry)> {
        self.entries.iter().map(|(name, entry)| (*name, *entry)).collect()
    }

    pub fn mark_running(&mut self, action: ActionName) {
        let last_run = self.get(action).last_run;
        self.set(
            action,
            TagEntry {
                status: TagState::Running,
                last_run,
            },
        );
    }

    /// Record the final outcome and stamp the run time.
    pub fn mark_finished(&mut self, action: ActionName, outcome: ReportStatus) {
        let status = match outcome {
            ReportStatus::Success => TagState::Success,
            ReportStatus::Error => TagState::Error,
        };
        self.set(
            action,
            TagEntry {
                status,
                last_run: Some(Utc::now()),
            },
        );
    }

    /// Return every action to idle, notifying observers of each change.
    pub fn reset(&mut self) {
        for name in ActionName::ALL {
            if self.get(name) != TagEntry::default() {
                self.set(name, TagEntry::default());
            }
        }
    }

    fn set(&mut self, action: ActionName, entry: TagEntry) {
        debug!("Tag {} -> {:?}", action, entry.status);
        self.entries.insert(action, entry);
        for observer in &self.observers {
            observer.status_changed(action, &entry);
        }
    }
}

impl Default for TagStatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TagStatusBoard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TagStatusBoard")
            .field("entries", &self.entries)
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingObserver {
        seen: Mutex<Vec<(ActionName, TagState)>>,
    }

    impl StatusObserver for RecordingObserver {
        fn status_changed(&self, action: ActionName, entry: &TagEntry) {
            self.seen.lock().unwrap().push((action, entry.status));
        }
    }

    #[test]
    fn test_board_starts_idle() {
        let board = TagStatusBoard::new();
        assert_eq!(board.entries().len(), ActionName::ALL.len());
        assert!(
            board
                .entries()
                .iter()
                .all(|(_, entry)| entry.status == TagState::Idle && entry.last_run.is_none())
        );
    }

    #[test]
    fn test_transitions_reach_observer_in_order() {
        let observer = Arc::new(RecordingObserver::default());
        let mut board = TagStatusBoard::new();
        board.subscribe(observer.clone());

        board.mark_running(ActionName::TakeScreenshot);
        board.mark_finished(ActionName::TakeScreenshot, ReportStatus::Error);

        let seen = observer.seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                (ActionName::TakeScreenshot, TagState::Running),
                (ActionName::TakeScreenshot, TagState::Error),
            ]
        );
    }

    #[test]
    fn test_finish_stamps_last_run() {
        let mut board = TagStatusBoard::new();
        board.mark_running(ActionName::GetDomStructure);
        assert!(board.get(ActionName::GetDomStructure).last_run.is_none());

        board.mark_finished(ActionName::GetDomStructure, ReportStatus::Success);
        let entry = board.get(ActionName::GetDomStructure);
        assert_eq!(entry.status, TagState::Success);
        assert!(entry.last_run.is_some());
    }

    #[test]
    fn test_running_keeps_previous_last_run() {
        let mut board = TagStatusBoard::new();
        board.mark_finished(ActionName::GetPreviewState, ReportStatus::Success);
        let stamped = board.get(ActionName::GetPreviewState).last_run;

        board.mark_running(ActionName::GetPreviewState);
        assert_eq!(board.get(ActionName::GetPreviewState).last_run, stamped);
    }

    #[test]
    fn test_reset_notifies_only_changed_entries() {
        let observer = Arc::new(RecordingObserver::default());
        let mut board = TagStatusBoard::new();
        board.mark_finished(ActionName::InteractElement, ReportStatus::Success);
        board.subscribe(observer.clone());

        board.reset();

        assert_eq!(
            *observer.seen.lock().unwrap(),
            vec![(ActionName::InteractElement, TagState::Idle)]
        );
        assert_eq!(board.get(ActionName::InteractElement), TagEntry::default());
    }
}
