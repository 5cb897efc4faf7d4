//! Durable record of item identifiers that have already been notified on.
//!
//! The store is a single JSON file holding an ordered array of
//! `{"id", "first_seen", "last_listed"}` entries.  It is read once at the
//! start of a cycle and overwritten once at the end; writes go to a sibling temp file that is
//! then renamed over the original, so a crash mid-write leaves the previous
//! state intact.
//!
//! Retention counts from `last_listed`, the last cycle in which the source
//! still returned the id, so an id is only forgotten once it has dropped out
//! of the listings for the whole window.
//!
//! Files written by older versions (a bare array of identifier strings) are
//! still readable; such entries are stamped with the load time.  Saving a
//! set loaded from such a file writes the current format, so the file
//! changes once; from then on loading and saving leaves it byte-identical.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One remembered identifier.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct SeenEntry {
    pub id: String,
    pub first_seen: DateTime<Utc>,
    /// Last time the id showed up in a fetched listing.  Absent until the id
    /// is listed again after being recorded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_listed: Option<DateTime<Utc>>,
}

impl SeenEntry {
    fn new(id: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            first_seen: now,
            last_listed: None,
        }
    }

    /// The timestamp retention is measured from.
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_listed.unwrap_or(self.first_seen).max(self.first_seen)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredEntry {
    Stamped(SeenEntry),
    Bare(String),
}

/// Insertion-ordered set of seen identifiers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeenSet {
    entries: Vec<SeenEntry>,
    /// id -> position in `entries`.
    index: HashMap<String, usize>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn from_entries(entries: impl IntoIterator<Item = SeenEntry>) -> Self {
        let mut set = Self::new();
        for entry in entries {
            if !set.index.contains_key(&entry.id) {
                set.index.insert(entry.id.clone(), set.entries.len());
                set.entries.push(entry);
            }
        }
        set
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Remember `id` as first seen at `now`.  Returns `false` (and keeps the
    /// original timestamp) if it was already present.
    pub fn insert(&mut self, id: impl Into<String>, now: DateTime<Utc>) -> bool {
        let id = id.into();
        if self.index.contains_key(&id) {
            return false;
        }
        self.index.insert(id.clone(), self.entries.len());
        self.entries.push(SeenEntry::new(id, now));
        true
    }

    /// Record that `id` was listed again at `now`.  Returns `false` if the id
    /// is not in the set.
    pub fn touch(&mut self, id: &str, now: DateTime<Utc>) -> bool {
        match self.index.get(id) {
            Some(&pos) => {
                self.entries[pos].last_listed = Some(now);
                true
            }
            None => false,
        }
    }

    /// Forget every entry whose last activity is before `cutoff`.  Returns
    /// how many were dropped.
    pub fn prune_older_than(&mut self, cutoff: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.last_activity() >= cutoff);
        if self.entries.len() != before {
            self.index = self
                .entries
                .iter()
                .enumerate()
                .map(|(pos, entry)| (entry.id.clone(), pos))
                .collect();
        }
        before - self.entries.len()
    }

    pub fn entries(&self) -> &[SeenEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// File-backed persistence for a [`SeenSet`].
#[derive(Debug, Clone)]
pub struct SeenStore {
    path: PathBuf,
}

impl SeenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted set.  A missing file is an empty set; an
    /// unreadable or malformed file is an error.
    pub fn load(&self) -> Result<SeenSet> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no seen-state file yet, starting empty");
                return Ok(SeenSet::new());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("reading {}", self.path.display()));
            }
        };

        let stored: Vec<StoredEntry> = serde_json::from_slice(&bytes)
            .with_context(|| format!("parsing {}", self.path.display()))?;

        let now = Utc::now();
        Ok(SeenSet::from_entries(stored.into_iter().map(|entry| match entry {
            StoredEntry::Stamped(entry) => entry,
            StoredEntry::Bare(id) => SeenEntry::new(id, now),
        })))
    }

    /// Replace the persisted set with `set`.
    pub fn save(&self, set: &SeenSet) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        let json = serde_json::to_vec(set.entries()).context("serializing seen set")?;

        let tmp = self.temp_path();
        let write = || -> io::Result<()> {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&json)?;
            file.sync_all()
        };
        write().with_context(|| format!("writing {}", tmp.display()))?;

        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
