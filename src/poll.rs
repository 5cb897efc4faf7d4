//! One polling pass over every configured channel.
//!
//! A cycle loads the seen set, fetches each channel in turn, notifies on
//! unseen items whose title or body mention a keyword, and saves the seen
//! set once at the end.  Ids that are listed again get their `last_listed`
//! stamp refreshed, so retention only forgets ids that have left the
//! listings.
//!
//! ## For contributors
//!
//! Channels are fetched sequentially; every HTTP call is bounded by the
//! configured request timeout, so a hung remote delays the cycle but cannot
//! stall it forever.  If concurrent fetching is ever needed, collect all
//! channel results first and keep the seen-set updates in this single
//! thread so the load → mutate → save ordering is preserved.

use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration, Utc};

use crate::config::Config;
use crate::matcher::KeywordMatcher;
use crate::notify::{DeliveryOutcome, MatchResult, NotificationSink};
use crate::seen::{SeenSet, SeenStore};
use crate::source::{DataSource, Item};

/// What happened during one cycle.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct CycleReport {
    pub channels_checked: usize,
    pub channels_failed: usize,
    /// Items not seen before that were run through the matcher.
    pub items_examined: usize,
    pub notifications_sent: usize,
    pub deliveries_failed: usize,
    /// Identifiers remembered after this cycle.
    pub tracked: usize,
    /// Identifiers forgotten because they left the retention window.
    pub pruned: usize,
}

pub struct PollCycle {
    source: Arc<dyn DataSource>,
    sink: Arc<dyn NotificationSink>,
    store: SeenStore,
    matcher: KeywordMatcher,
    channels: Vec<String>,
    fetch_limit: usize,
    retention: Option<Duration>,
}

impl PollCycle {
    pub fn new(
        config: &Config,
        source: Arc<dyn DataSource>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            source,
            sink,
            store: SeenStore::new(config.seen_file.clone()),
            matcher: KeywordMatcher::new(config.keywords.iter().cloned()),
            channels: config.channels.clone(),
            fetch_limit: config.fetch_limit,
            retention: config.retention(),
        }
    }

    /// Run a single pass.
    ///
    /// Per-channel fetch failures and delivery failures are logged and
    /// absorbed.  An error is returned only when the seen set cannot be
    /// loaded or saved.
    pub fn run_once(&self) -> Result<CycleReport> {
        let mut seen = self.store.load()?;
        let mut report = CycleReport::default();
        tracing::debug!(path = %self.store.path().display(), tracked = seen.len(), "loaded seen set");

        for channel in &self.channels {
            tracing::info!(channel = %channel, source = self.source.name(), "checking channel");

            match self.source.fetch(channel, self.fetch_limit) {
                Ok(items) => {
                    report.channels_checked += 1;
                    self.process_channel(channel, &items, &mut seen, &mut report);
                }
                Err(e) => {
                    report.channels_failed += 1;
                    tracing::warn!(channel = %channel, error = %format!("{e:#}"), "channel check failed, skipping");
                }
            }
        }

        if let Some(window) = self.retention {
            match Utc::now().checked_sub_signed(window) {
                Some(cutoff) => report.pruned = seen.prune_older_than(cutoff),
                None => tracing::warn!(?window, "retention window out of range, not pruning"),
            }
        }

        self.store.save(&seen)?;
        report.tracked = seen.len();

        tracing::info!(
            channels = self.channels.len(),
            checked = report.channels_checked,
            failed = report.channels_failed,
            examined = report.items_examined,
            notified = report.notifications_sent,
            delivery_failures = report.deliveries_failed,
            tracked = report.tracked,
            pruned = report.pruned,
            "monitoring cycle complete"
        );
        Ok(report)
    }

    fn process_channel(
        &self,
        channel: &str,
        items: &[Item],
        seen: &mut SeenSet,
        report: &mut CycleReport,
    ) {
        let listed_at = Utc::now();
        for item in items.iter().take(self.fetch_limit) {
            if seen.touch(&item.id, listed_at) {
                continue;
            }
            report.items_examined += 1;

            let keywords = self.matcher.matches(&item.combined_text());
            if keywords.is_empty() {
                continue;
            }

            let found = MatchResult {
                item,
                keywords,
                detected_at: Utc::now(),
            };

            match self.sink.deliver(&found.payload()) {
                DeliveryOutcome::Delivered => {
                    report.notifications_sent += 1;
                    tracing::info!(
                        channel = %channel,
                        item_id = %item.id,
                        keywords = ?found.keywords,
                        title = %item.title,
                        "notification sent"
                    );
                }
                DeliveryOutcome::Failed(reason) => {
                    report.deliveries_failed += 1;
                    tracing::error!(
                        channel = %channel,
                        item_id = %item.id,
                        reason = %reason,
                        "failed to send notification"
                    );
                }
            }

            // Marked even when delivery failed: a dropped notification is
            // preferred over repeating it every cycle.
            seen.insert(item.id.clone(), found.detected_at);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
