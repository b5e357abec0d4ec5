//! forte-ui preview - renders one tab against a live backend
//!
//! Registers the standard tabs for the chosen role, activates one, and prints
//! its markup to stdout.

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use clap::Parser;
use forte_common::config::{ConfigResolver, API_URL_ENV};
use forte_common::{Role, SessionInfo};
use forte_ui::{register_section, ActivationOutcome, ApiClient, Section, TabController};
use tracing::{error, info};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "forte-ui")]
#[command(about = "Render a Forte tab against the REST backend")]
#[command(version)]
struct Args {
    /// Tab to activate (defaults to the role's schedule)
    #[arg(short, long)]
    tab: Option<String>,

    /// Role of the signed-in user
    #[arg(short, long, default_value = "admin")]
    role: Role,

    /// Id of the signed-in user
    #[arg(short, long)]
    user_id: Option<String>,

    /// Display name of the signed-in user
    #[arg(long)]
    name: Option<String>,

    /// Access code sent to the backend as a bearer token
    #[arg(long, env = "FORTE_ACCESS_CODE", hide_env_values = true)]
    access_code: Option<String>,

    /// Backend base URL
    #[arg(long, env = API_URL_ENV)]
    api_url: Option<String>,

    /// Path to configuration file
    #[arg(short, long, env = "FORTE_CONFIG")]
    config: Option<PathBuf>,
}

impl Args {
    fn session(&self) -> SessionInfo {
        let mut session = match &self.user_id {
            Some(user_id) => SessionInfo::for_user(user_id.clone(), self.role),
            None => SessionInfo {
                role: Some(self.role),
                ..SessionInfo::anonymous()
            },
        };
        if let Some(name) = &self.name {
            session = session.with_display_name(name.clone());
        }
        if let Some(code) = &self.access_code {
            session = session.with_access_code(code.clone());
        }
        session
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = ConfigResolver::new()
        .with_cli_api_url(args.api_url.clone())
        .with_config_path(args.config.clone())
        .resolve()
        .context("Failed to resolve configuration")?;

    // stdout carries the rendered markup, so logs go to stderr or the configured file
    let subscriber = tracing_subscriber::fmt().with_env_filter(
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
    );
    match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            subscriber.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => subscriber.with_writer(std::io::stderr).init(),
    }

    info!(
        "Starting Forte UI preview v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    info!("Backend: {}", config.api_base_url);

    let backend = ApiClient::from_config(&config).context("Failed to create HTTP client")?;
    let controller = TabController::new();

    let section = Section::for_role(args.role);
    let ids = register_section(&controller, section, Arc::new(backend), config.page_size);

    let tab_id = args
        .tab
        .clone()
        .unwrap_or_else(|| section.default_tab().to_string());
    if !ids.contains(&tab_id) {
        bail!(
            "Tab '{}' is not part of the {} section (available: {})",
            tab_id,
            section,
            ids.join(", ")
        );
    }

    let session = args.session();
    info!("Activating '{}' as {}", tab_id, session.label());

    let outcome = controller
        .activate(tab_id.clone(), session)
        .await
        .with_context(|| format!("Failed to activate '{}'", tab_id))?;

    let snapshot = controller
        .inspect(tab_id.clone())
        .await
        .context("Failed to inspect tab")?;
    controller.shutdown().await;

    let html = snapshot.map(|s| s.html).unwrap_or_default();
    match outcome {
        ActivationOutcome::Activated { .. } | ActivationOutcome::AlreadyActive { .. } => {
            println!("{}", html);
            Ok(())
        }
        ActivationOutcome::Failed { message, .. } => {
            println!("{}", html);
            error!("Tab '{}' failed to load: {}", tab_id, message);
            bail!("Tab '{}' failed to load: {}", tab_id, message)
        }
        other => bail!("Activation of '{}' did not complete: {:?}", tab_id, other),
    }
}
