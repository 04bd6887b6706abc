//! Per-project context commands: scan, show, clear, prompt, changelog.

use std::error::Error;
use std::path::Path;
use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tracing::info;

use monica_config::BridgeConfig;
use monica_core::{ActionDispatcher, BridgeSession, DispatchSettings, ProjectId, TracingNotifier};
use monica_store::open_store;

use crate::adapters::DetachedPreview;
use crate::cli::{Commands, ProjectArgs};

type CmdResult = Result<(), Box<dyn Error>>;

/// Resolve the project a command applies to.
pub(crate) fn resolve_project(args: &ProjectArgs) -> Result<ProjectId, Box<dyn Error>> {
    let resolved = match (&args.project, &args.url) {
        (Some(id), _) => ProjectId::new(id.as_str()),
        (None, Some(url)) => ProjectId::from_url(url),
        (None, None) => None,
    };
    resolved.ok_or_else(|| "Could not identify Project ID.".into())
}

async fn open_session(config: &BridgeConfig, args: &ProjectArgs) -> Result<BridgeSession, Box<dyn Error>> {
    let project = resolve_project(args)?;
    let store = open_store(&config.storage).await?;
    let notifier = Arc::new(TracingNotifier);
    let dispatcher = ActionDispatcher::new(
        DetachedPreview::capabilities(),
        DispatchSettings::from(&config.dispatch),
        notifier.clone(),
    );
    Ok(BridgeSession::start(Some(project), store, dispatcher, notifier, &config.session).await)
}

/// Handle a context command.
pub(crate) async fn handle_context_command(command: Commands, config: &BridgeConfig) -> CmdResult {
    match command {
        Commands::Scan {
            project,
            file,
            no_actions,
        } => {
            let text = read_input(file.as_deref()).await?;
            let mut session = open_session(config, &project).await?;
            if no_actions {
                session.set_automation(false);
            }

            let outcome = session.ingest(&text).await;
            info!(
                "Scan finished: {} action(s) run, {} skipped, {} update(s), {} changelog entr(ies), {} malformed",
                outcome.actions_dispatched,
                outcome.actions_skipped,
                outcome.updates_applied,
                outcome.changelog_entries,
                outcome.malformed
            );
            session.flush().await?;
        }
        Commands::Show { project } => {
            let session = open_session(config, &project).await?;
            println!("{}", session.state_json());
        }
        Commands::Clear { project } => {
            let mut session = open_session(config, &project).await?;
            session.clear().await?;
        }
        Commands::Prompt { project } => {
            let session = open_session(config, &project).await?;
            match session.rehydrate_prompt().await {
                Some(prompt) => println!("{}", prompt),
                None => return Err("No saved context for this project.".into()),
            }
        }
        Commands::Changelog { project, take } => {
            let mut session = open_session(config, &project).await?;
            let changelog = if take {
                session.take_changelog().await
            } else {
                session.changelog().to_string()
            };
            print!("{}", changelog);
        }
        Commands::Host => return Err("host is not a context command".into()),
    }
    Ok(())
}

async fn read_input(file: Option<&Path>) -> Result<String, Box<dyn Error>> {
    match file {
        Some(path) if path != Path::new("-") => Ok(tokio::fs::read_to_string(path).await?),
        _ => {
            let mut text = String::new();
            tokio::io::stdin().read_to_string(&mut text).await?;
            Ok(text)
        }
    }
}
