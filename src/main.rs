//! forumwatch — watches forum channels for posts that mention a keyword and
//! forwards them to a chat webhook.
//!
//! ## Architecture overview
//!
//! ```text
//! ┌──────────────┐  run()   ┌──────────┐  fetch()   ┌──────────────┐
//! │ scheduler.rs │ ───────► │ poll.rs  │ ─────────► │  source/     │
//! │ (tokio loop) │          │ (cycle)  │            │ (Reddit API) │
//! └──────────────┘          └──────────┘            └──────────────┘
//!                            │   │   │  deliver()   ┌──────────────┐
//!                            │   │   └────────────► │  notify/     │
//!                   load/save│   │ matches()        │ (webhook)    │
//!                     ┌──────▼┐ ┌▼───────────┐      └──────────────┘
//!                     │seen.rs│ │ matcher.rs │
//!                     └───────┘ └────────────┘
//! ```
//!
//! * **`source/`** — the `DataSource` trait, the `Item` type, and the Reddit
//!   implementation.
//! * **`seen`** — the persisted set of already-notified identifiers.
//! * **`matcher`** — case-insensitive keyword matching.
//! * **`notify/`** — the fixed message template and the webhook sink.
//! * **`poll`** — one pass over every channel.
//! * **`scheduler`** — repeats the pass on an interval, surviving failures.
//! * **`config`** — layered configuration and startup validation.
//! * **`main`** — wires everything together: logging, config, the runtime,
//!   and Ctrl-C handling.

mod config;
mod matcher;
mod notify;
mod poll;
mod scheduler;
mod seen;
mod source;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::notify::WebhookSink;
use crate::poll::PollCycle;
use crate::scheduler::Scheduler;
use crate::source::RedditSource;

/// How long to wait for an abandoned cycle's worker thread on exit.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

fn init_logging() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("forumwatch=info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}

/// Resolves on Ctrl-C.  If the handler cannot be installed the process
/// simply runs until killed.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

fn main() -> Result<ExitCode> {
    init_logging();

    // -- configuration -------------------------------------------------------
    let path = Config::resolve_path(std::env::args().nth(1));
    let config = Config::load(&path).with_context(|| format!("loading {}", path.display()))?;

    if let Err(e) = config.validate() {
        tracing::warn!("⚠️  {e}");
        if let Some(hint) = e.hint() {
            tracing::warn!("   {hint}");
        }
        return Ok(ExitCode::FAILURE);
    }

    tracing::info!("starting forumwatch");
    tracing::info!(channels = %config.channels.join(", "), "monitoring channels");
    tracing::info!(keywords = config.keywords.len(), "watching keywords");

    // -- components ----------------------------------------------------------
    let source = Arc::new(RedditSource::new(&config.reddit, config.request_timeout())?);
    let sink = Arc::new(WebhookSink::new(config.webhook_url.clone(), config.request_timeout())?);
    let cycle = PollCycle::new(&config, source, sink);
    let scheduler = Scheduler::from_config(cycle, &config);

    // -- run until Ctrl-C ----------------------------------------------------
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting tokio runtime")?;

    runtime.block_on(scheduler.run(interrupted()));
    // A cycle interrupted mid-flight is still parked on a blocking thread.
    runtime.shutdown_timeout(SHUTDOWN_GRACE);

    tracing::info!("🛑 forumwatch stopped");
    Ok(ExitCode::SUCCESS)
}
