//! The "new session" prompt that re-seeds a fresh chat with saved context.

use monica_protocols::PersistedRecord;

const PREAMBLE: &str = "This is a new session. Please use the following JSON context to remember our previous state and continue our work.";

/// Build the rehydration prompt for a saved record.
pub fn rehydrate_prompt(record: &PersistedRecord) -> String {
    let state = serde_json::to_string_pretty(&record.conversation_state)
        .unwrap_or_else(|_| "{}".to_string());
    let mut prompt = format!("{}\n\n```json\n{}\n```", PREAMBLE, state);

    let changelog = record.cumulative_changelog.trim();
    if !changelog.is_empty() {
        prompt.push_str("\n\nChanges not yet committed:\n\n");
        prompt.push_str(changelog);
    }

    prompt
}
