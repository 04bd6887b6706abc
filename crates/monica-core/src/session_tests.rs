use super::*;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use monica_protocols::{
    ActionName, BuildErrorSource, ConsoleErrorFeed, ConsoleErrorWatch, HostError, PreviewDocument,
    ReportChannel, ScreenshotCapturer, TagEntry, TagState,
};
use monica_store::MemoryContextStore;

use crate::autofix::PreviewError;
use crate::dispatcher::{Capabilities, DispatchSettings};

const PROJECT: &str = "proj-1";

/// One fake standing in for every host capability.
#[derive(Default)]
struct FakeHost {
    console: Mutex<Vec<String>>,
    sent: Mutex<Vec<String>>,
}

#[async_trait]
impl BuildErrorSource for FakeHost {
    async fn build_errors(&self) -> Result<Vec<String>, HostError> {
        Ok(Vec::new())
    }
}

#[async_trait]
impl ConsoleErrorFeed for FakeHost {
    async fn watch(&self, _frame_id: u32) -> Result<ConsoleErrorWatch, HostError> {
        // Sender dropped on return, so the watch ends without waiting.
        let (tx, watch) = ConsoleErrorWatch::channel();
        for error in self.console.lock().unwrap().iter() {
            let _ = tx.send(error.clone());
        }
        Ok(watch)
    }
}

#[async_trait]
impl ScreenshotCapturer for FakeHost {
    async fn capture(&self) -> Result<String, HostError> {
        Ok("data:image/png;base64,AAAA".to_string())
    }
}

#[async_trait]
impl PreviewDocument for FakeHost {
    async fn body_markup(&self) -> Result<String, HostError> {
        Ok("<body></body>".to_string())
    }

    async fn click(&self, selector: &str) -> Result<(), HostError> {
        Err(HostError::ElementNotFound(selector.to_string()))
    }

    async fn text_content(&self, selector: &str) -> Result<String, HostError> {
        Err(HostError::ElementNotFound(selector.to_string()))
    }
}

#[async_trait]
impl ReportChannel for FakeHost {
    async fn send(&self, message: &str) -> Result<(), HostError> {
        self.sent.lock().unwrap().push(message.to_string());
        Ok(())
    }
}

#[derive(Default)]
struct RecordingNotifier {
    notices: Mutex<Vec<(NoticeLevel, String)>>,
}

impl RecordingNotifier {
    fn contains(&self, level: NoticeLevel, needle: &str) -> bool {
        self.notices
            .lock()
            .unwrap()
            .iter()
            .any(|(l, m)| *l == level && m.contains(needle))
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, level: NoticeLevel, message: &str) {
        self.notices.lock().unwrap().push((level, message.to_string()));
    }
}

/// Store whose every operation fails.
struct BrokenStore;

#[async_trait]
impl ContextStore for BrokenStore {
    async fn save(&self, _key: &str, _value: Option<Value>) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("disk full".to_string()))
    }

    async fn load(&self, _key: &str) -> Result<Option<Value>, StorageError> {
        Err(StorageError::Unavailable("disk full".to_string()))
    }
}

struct Fixture {
    host: Arc<FakeHost>,
    notifier: Arc<RecordingNotifier>,
    session: BridgeSession,
}

async fn start_with(project: Option<&str>, store: Arc<dyn ContextStore>) -> Fixture {
    let host = Arc::new(FakeHost::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let caps = Capabilities {
        build_errors: host.clone(),
        console: host.clone(),
        screenshots: host.clone(),
        document: host.clone(),
        reports: host.clone(),
    };
    let settings = DispatchSettings {
        preview_error_window: Duration::from_millis(50),
        preview_frame_id: 1,
        automation_cooldown: Duration::from_secs(10),
    };
    let dispatcher = ActionDispatcher::new(caps, settings, notifier.clone());
    let session = BridgeSession::start(
        project.and_then(ProjectId::new),
        store,
        dispatcher,
        notifier.clone(),
        &SessionConfig::default(),
    )
    .await;
    Fixture {
        host,
        notifier,
        session,
    }
}

async fn start(store: Arc<dyn ContextStore>) -> Fixture {
    start_with(Some(PROJECT), store).await
}

async fn saved(store: &MemoryContextStore) -> Option<PersistedRecord> {
    store
        .load(PROJECT)
        .await
        .unwrap()
        .map(|value| PersistedRecord::from_value(value).unwrap())
}

#[tokio::test]
async fn test_update_is_merged_logged_and_persisted() {
    let store = Arc::new(MemoryContextStore::new());
    let mut f = start(store.clone()).await;

    let text = r#"Done. <!-- MONICA_UPDATE: {"summary": "Added login", "context_update": {"currentTask": "auth", "topics": ["login"]}} -->"#;
    let outcome = f.session.ingest(text).await;

    assert_eq!(outcome.updates_applied, 1);
    assert_eq!(f.session.state()["currentTask"], "auth");
    let messages = f.session.state()[MESSAGES_KEY].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["summary"], "Added login");
    assert_eq!(messages[0]["sender"], "ai");
    assert_eq!(messages[0]["text"], text);

    let record = saved(&store).await.unwrap();
    assert_eq!(record.conversation_state, *f.session.state());
}

#[tokio::test]
async fn test_successive_updates_deep_merge() {
    let store = Arc::new(MemoryContextStore::new());
    let mut f = start(store.clone()).await;

    f.session
        .ingest(r#"<!-- MONICA_UPDATE: {"context_update": {"project": {"name": "shop", "stack": "react"}}} -->"#)
        .await;
    f.session
        .ingest(r#"<!-- MONICA_CONTEXT_DATA: {"project": {"stack": "vue"}, "errors": []} -->"#)
        .await;

    assert_eq!(
        Value::Object(f.session.state().clone()),
        json!({"project": {"name": "shop", "stack": "vue"}, "errors": []})
    );
    assert!(f.session.state().get(MESSAGES_KEY).is_none());
}

#[tokio::test]
async fn test_message_log_is_appended_not_replaced() {
    let store = Arc::new(MemoryContextStore::new());
    let mut f = start(store).await;

    for summary in ["one", "two"] {
        let text = format!(
            r#"<!-- MONICA_UPDATE: {{"summary": "{}", "context_update": {{}}}} -->"#,
            summary
        );
        f.session.ingest(&text).await;
    }

    let messages = f.session.state()[MESSAGES_KEY].as_array().unwrap();
    let summaries: Vec<_> = messages.iter().map(|m| m["summary"].clone()).collect();
    assert_eq!(summaries, vec![json!("one"), json!("two")]);
}

#[tokio::test]
async fn test_rehydrate_on_start() {
    let store = Arc::new(MemoryContextStore::new());
    store
        .save(
            PROJECT,
            Some(json!({"conversationState": {"currentTask": "cart"}, "cumulativeChangelog": "- x\n\n"})),
        )
        .await
        .unwrap();

    let f = start(store).await;

    assert_eq!(f.session.state()["currentTask"], "cart");
    assert_eq!(f.session.changelog(), "- x\n\n");
}

#[tokio::test]
async fn test_load_failure_starts_empty_and_notifies() {
    let f = start(Arc::new(BrokenStore)).await;

    assert!(f.session.state().is_empty());
    assert!(f.notifier.contains(NoticeLevel::Error, "disk full"));
}

#[tokio::test]
async fn test_actions_dispatch_and_report_in_order() {
    let store = Arc::new(MemoryContextStore::new());
    let mut f = start(store).await;

    let text = r##"
        <!-- MONICA_ACTION: {"action": "TAKE_SCREENSHOT"} -->
        <!-- MONICA_ACTION: {"action": "INTERACT_ELEMENT", "params": {"selector": "#missing", "action": "click"}} -->
        <!-- MONICA_ACTION: {"action": "SELF_DESTRUCT"} -->
    "##;
    let outcome = f.session.ingest(text).await;

    assert_eq!(outcome.actions_dispatched, 2);
    assert_eq!(outcome.actions_skipped, 1);
    let sent = f.host.sent.lock().unwrap();
    assert_eq!(sent.len(), 2);
    assert!(sent[0].contains("TAKE_SCREENSHOT (success)"));
    assert!(sent[1].contains("INTERACT_ELEMENT (error)"));
    assert!(sent[1].contains("#missing"));
    assert_eq!(
        f.session.tag_status().get(ActionName::InteractElement).status,
        TagState::Error
    );
}

/// Records how many reports had been sent when each transition fired.
struct SentCountObserver {
    host: Arc<FakeHost>,
    seen: Mutex<Vec<(ActionName, TagState, usize)>>,
}

impl StatusObserver for SentCountObserver {
    fn status_changed(&self, action: ActionName, entry: &TagEntry) {
        let sent = self.host.sent.lock().unwrap().len();
        self.seen.lock().unwrap().push((action, entry.status, sent));
    }
}

#[tokio::test]
async fn test_next_action_starts_after_previous_report_is_sent() {
    let store = Arc::new(MemoryContextStore::new());
    let mut f = start(store).await;
    let observer = Arc::new(SentCountObserver {
        host: f.host.clone(),
        seen: Mutex::new(Vec::new()),
    });
    f.session.subscribe(observer.clone());

    f.session
        .ingest(
            r#"<!-- MONICA_ACTION: {"action": "TAKE_SCREENSHOT"} -->
               <!-- MONICA_ACTION: {"action": "GET_DOM_STRUCTURE"} -->"#,
        )
        .await;

    let seen = observer.seen.lock().unwrap();
    assert_eq!(
        *seen,
        vec![
            (ActionName::TakeScreenshot, TagState::Running, 0),
            (ActionName::TakeScreenshot, TagState::Success, 0),
            (ActionName::GetDomStructure, TagState::Running, 1),
            (ActionName::GetDomStructure, TagState::Success, 1),
        ]
    );
}

#[tokio::test]
async fn test_action_inside_changelog_block_runs() {
    let store = Arc::new(MemoryContextStore::new());
    let mut f = start(store).await;

    let outcome = f
        .session
        .ingest(
            r#"<!-- MONICA_CHANGELOG_START -->
- Added cart
<!-- MONICA_ACTION: {"action":"TAKE_SCREENSHOT"} -->
<!-- MONICA_CHANGELOG_END -->"#,
        )
        .await;

    assert_eq!(outcome.changelog_entries, 1);
    assert_eq!(outcome.actions_dispatched, 1);
    assert_eq!(f.host.sent.lock().unwrap().len(), 1);
}

const MAX_DEPTH_PLUS: usize = crate::merge::MAX_MERGE_DEPTH + 2;

fn nested(depth: usize) -> Value {
    let mut value = json!({});
    for _ in 0..depth {
        value = json!({ "n": value });
    }
    value
}

#[tokio::test]
async fn test_rejected_update_leaves_state_untouched() {
    let store = Arc::new(MemoryContextStore::new());
    let mut f = start(store.clone()).await;
    let Value::Object(deep) = nested(MAX_DEPTH_PLUS) else {
        panic!("expected an object")
    };
    f.session.record.conversation_state = deep.clone();

    // "a" merges before the walk down "n" hits the depth limit.
    let Value::Object(mut update) = nested(MAX_DEPTH_PLUS) else {
        panic!("expected an object")
    };
    update.insert("a".to_string(), json!(1));
    let mut outcome = IngestOutcome::default();
    f.session
        .apply_update(
            "too deep",
            UpdateCommand {
                summary: Some("deep".to_string()),
                context_update: update,
            },
            &mut outcome,
        )
        .await;

    assert_eq!(outcome.updates_rejected, 1);
    assert_eq!(outcome.updates_applied, 0);
    assert_eq!(*f.session.state(), deep);
    assert!(f.session.state().get("a").is_none());
    assert!(saved(&store).await.is_none());

    // A later good update must not persist anything from the rejected one.
    f.session
        .ingest(r#"<!-- MONICA_CONTEXT_DATA: {"b": 2} -->"#)
        .await;
    let record = saved(&store).await.unwrap();
    assert!(record.conversation_state.get("a").is_none());
    assert_eq!(record.conversation_state["b"], 2);
}

#[tokio::test]
async fn test_preview_errors_forwarded_only_while_automation_on() {
    let store = Arc::new(MemoryContextStore::new());
    let mut f = start(store).await;
    f.host
        .console
        .lock()
        .unwrap()
        .push("TypeError: cart is undefined".to_string());

    f.session.set_automation(false);
    assert_eq!(f.session.check_preview_errors().await, None);
    assert!(f.host.sent.lock().unwrap().is_empty());

    f.session.set_automation(true);
    let forwarded = f.session.check_preview_errors().await;
    assert!(matches!(forwarded, Some(PreviewError::Console(_))));
    assert!(f.notifier.contains(NoticeLevel::Success, "sent to AI"));

    // Still cooling down.
    assert_eq!(f.session.check_preview_errors().await, None);
    let sent = f.host.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("TypeError: cart is undefined"));
}

#[tokio::test]
async fn test_saved_automation_flag_overrides_default() {
    let store = Arc::new(MemoryContextStore::new());
    store.save(AUTOMATION_KEY, Some(json!(false))).await.unwrap();
    let mut f = start(store).await;

    assert!(!f.session.automation_enabled());
    let outcome = f
        .session
        .ingest(r#"<!-- MONICA_ACTION: {"action": "TAKE_SCREENSHOT"} -->"#)
        .await;
    assert_eq!(outcome.actions_skipped, 1);
    assert!(f.host.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_paused_automation_skips_actions_but_applies_updates() {
    let store = Arc::new(MemoryContextStore::new());
    let mut f = start(store).await;
    f.session.set_automation(false);

    let outcome = f
        .session
        .ingest(r#"<!-- MONICA_ACTION: {"action": "TAKE_SCREENSHOT"} --><!-- MONICA_CONTEXT_DATA: {"a": 1} -->"#)
        .await;

    assert!(!f.session.automation_enabled());
    assert_eq!(outcome.actions_dispatched, 0);
    assert_eq!(outcome.actions_skipped, 1);
    assert_eq!(outcome.updates_applied, 1);
    assert!(f.host.sent.lock().unwrap().is_empty());
    assert_eq!(
        f.session.tag_status().get(ActionName::TakeScreenshot).status,
        TagState::Idle
    );
}

#[tokio::test]
async fn test_malformed_markers_are_counted() {
    let store = Arc::new(MemoryContextStore::new());
    let mut f = start(store).await;

    let outcome = f
        .session
        .ingest(r#"<!-- MONICA_UPDATE: {"summary": oops} --> <!-- MONICA_CONTEXT_DATA: {"ok": true} -->"#)
        .await;

    assert_eq!(outcome.malformed, 1);
    assert_eq!(outcome.updates_applied, 1);
    assert!(outcome.found_commands());
    assert_eq!(f.session.state()["ok"], true);
}

#[tokio::test]
async fn test_changelog_accumulates_and_take_clears() {
    let store = Arc::new(MemoryContextStore::new());
    let mut f = start(store.clone()).await;

    f.session
        .ingest("<!-- MONICA_CHANGELOG_START -->\n- Added cart\n<!-- MONICA_CHANGELOG_END -->")
        .await;
    f.session
        .ingest("<!-- MONICA_CHANGELOG_START --> - Fixed auth <!-- MONICA_CHANGELOG_END -->")
        .await;

    assert_eq!(f.session.changelog(), "- Added cart\n\n- Fixed auth\n\n");
    assert_eq!(
        saved(&store).await.unwrap().cumulative_changelog,
        "- Added cart\n\n- Fixed auth\n\n"
    );

    let taken = f.session.take_changelog().await;
    assert_eq!(taken, "- Added cart\n\n- Fixed auth\n\n");
    assert!(f.session.changelog().is_empty());
    assert!(saved(&store).await.unwrap().cumulative_changelog.is_empty());
}

#[tokio::test]
async fn test_clear_removes_record_and_resets_state() {
    let store = Arc::new(MemoryContextStore::new());
    let mut f = start(store.clone()).await;
    f.session
        .ingest(r#"<!-- MONICA_CONTEXT_DATA: {"a": 1} --><!-- MONICA_ACTION: {"action": "GET_DOM_STRUCTURE"} -->"#)
        .await;
    assert!(saved(&store).await.is_some());

    f.session.clear().await.unwrap();

    assert!(saved(&store).await.is_none());
    assert!(f.session.state().is_empty());
    assert_eq!(
        f.session.tag_status().get(ActionName::GetDomStructure).status,
        TagState::Idle
    );
}

#[tokio::test]
async fn test_missing_project_never_persists() {
    let store = Arc::new(MemoryContextStore::new());
    let mut f = start_with(None, store.clone()).await;

    f.session.ingest(r#"<!-- MONICA_CONTEXT_DATA: {"a": 1} -->"#).await;
    f.session.clear().await.unwrap();

    assert_eq!(f.session.state().len(), 1);
    assert!(f.notifier.contains(NoticeLevel::Error, NO_PROJECT_NOTICE));
    assert!(saved(&store).await.is_none());
}

#[tokio::test]
async fn test_persist_failure_is_notified() {
    let mut f = start(Arc::new(BrokenStore)).await;

    let outcome = f.session.ingest(r#"<!-- MONICA_CONTEXT_DATA: {"a": 1} -->"#).await;

    assert_eq!(outcome.updates_applied, 1);
    assert!(f.notifier.contains(NoticeLevel::Error, "Could not save context"));
    assert!(f.session.flush().await.is_err());
}

#[tokio::test]
async fn test_rehydrate_prompt_reads_saved_record() {
    let store = Arc::new(MemoryContextStore::new());
    let mut f = start(store).await;
    assert!(f.session.rehydrate_prompt().await.is_none());

    f.session
        .ingest(r#"<!-- MONICA_CONTEXT_DATA: {"currentTask": "payments"} -->"#)
        .await;

    let prompt = f.session.rehydrate_prompt().await.unwrap();
    assert!(prompt.starts_with("This is a new session."));
    assert!(prompt.contains("\"currentTask\": \"payments\""));
}

#[tokio::test]
async fn test_state_json_is_pretty() {
    let store = Arc::new(MemoryContextStore::new());
    let mut f = start(store).await;
    assert_eq!(f.session.state_json(), "{}");

    f.session.ingest(r#"<!-- MONICA_CONTEXT_DATA: {"a": 1} -->"#).await;
    assert_eq!(f.session.state_json(), "{\n  \"a\": 1\n}");
}

#[tokio::test]
async fn test_recover_partial_ingests_salvaged_text() {
    let store = Arc::new(MemoryContextStore::new());
    let mut f = start(store).await;

    let error = UpstreamError::new("429 Too Many Requests", "streaming reply")
        .with_partial_response(r#"half <!-- MONICA_CONTEXT_DATA: {"salvaged": true} -->"#);
    let outcome = f.session.recover_partial(&error).await.unwrap();

    assert_eq!(outcome.updates_applied, 1);
    assert_eq!(f.session.state()["salvaged"], true);
    assert!(f.notifier.contains(NoticeLevel::Error, "rate limit"));
}

#[tokio::test]
async fn test_recover_without_partial_only_notifies() {
    let store = Arc::new(MemoryContextStore::new());
    let mut f = start(store).await;

    let error = UpstreamError::new("API key not valid", "sending message");
    assert!(f.session.recover_partial(&error).await.is_none());
    assert!(f.notifier.contains(NoticeLevel::Error, "API key is invalid"));
}
