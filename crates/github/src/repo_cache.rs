// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TTL-bounded cache of local git clones, keyed by commit.
//!
//! The outer mutex guards map bookkeeping only, never a network or
//! filesystem operation. Each entry carries its own async mutex so the
//! same commit is cloned exactly once while lookups of other commits
//! proceed, and so the reaper can tell an in-use entry from an idle one.
//!
//! The key is the commit id alone, matching the on-disk layout. Two
//! distinct repositories sharing a commit hash (possible with forks, if
//! unlikely) would conflate clones; widening the key changes every
//! caller's disk layout, so it stays as-is.

use crate::token::TokenRefresher;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Repos idle for at least this long are deleted by the reaper.
const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

/// Errors from clone operations. Git failures are credential-redacted
/// before they leave this module; no internal retry is attempted.
#[derive(Debug, Error)]
pub enum CloneError {
    #[error("unable to refresh token: {0}")]
    Token(String),
    #[error("invalid repo url: {0}")]
    InvalidUrl(String),
    #[error("io error preparing clone dir: {0}")]
    Io(#[from] std::io::Error),
    #[error("git clone failed: {0}")]
    GitFailed(String),
}

/// A managed local clone. The caller has a limited time to use the path
/// before the reaper removes it.
#[derive(Debug, Clone)]
pub struct Repo {
    pub url: String,
    pub branch: String,
    pub commit: String,
    pub owner: String,
    pub name: String,
    pub path: PathBuf,
}

struct Entry {
    /// Serializes cloning of this commit. Held for the clone duration;
    /// the map mutex is not.
    guard: Arc<tokio::sync::Mutex<()>>,
    repo: Option<Repo>,
    last_access: Instant,
}

impl Entry {
    fn new(now: Instant) -> Self {
        Self {
            guard: Arc::new(tokio::sync::Mutex::new(())),
            repo: None,
            last_access: now,
        }
    }
}

/// Mutex-guarded map from commit to local clone, with a TTL reaper.
pub struct RepoCache {
    clone_dir: PathBuf,
    ttl: Duration,
    entries: Mutex<HashMap<String, Entry>>,
}

impl RepoCache {
    pub fn new(clone_dir: impl Into<PathBuf>) -> Self {
        Self::with_ttl(clone_dir, DEFAULT_TTL)
    }

    pub fn with_ttl(clone_dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            clone_dir: clone_dir.into(),
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Get a local clone of `commit`, cloning if necessary. A hit refreshes
    /// the entry's TTL and skips the network entirely.
    pub async fn clone_repo(
        &self,
        url: &str,
        branch: &str,
        commit: &str,
        owner: &str,
        name: &str,
        refresher: &dyn TokenRefresher,
    ) -> Result<Repo, CloneError> {
        // Fast path plus per-commit guard acquisition, under the
        // bookkeeping mutex only.
        let guard = {
            let mut entries = self.entries.lock();
            let entry = entries
                .entry(commit.to_string())
                .or_insert_with(|| Entry::new(Instant::now()));
            if let Some(repo) = &entry.repo {
                entry.last_access = Instant::now();
                debug!(commit, "repo cache hit");
                return Ok(repo.clone());
            }
            Arc::clone(&entry.guard)
        };

        // Serialize cloning of this commit without blocking the map.
        let _cloning = guard.lock().await;

        // Someone else may have finished the clone while we waited.
        {
            let mut entries = self.entries.lock();
            if let Some(entry) = entries.get_mut(commit) {
                if let Some(repo) = &entry.repo {
                    entry.last_access = Instant::now();
                    return Ok(repo.clone());
                }
            }
        }

        let repo = self
            .do_clone(url, branch, commit, owner, name, refresher)
            .await?;

        let mut entries = self.entries.lock();
        let entry = entries
            .entry(commit.to_string())
            .or_insert_with(|| Entry::new(Instant::now()));
        entry.repo = Some(repo.clone());
        entry.last_access = Instant::now();
        Ok(repo)
    }

    async fn do_clone(
        &self,
        url: &str,
        branch: &str,
        commit: &str,
        owner: &str,
        name: &str,
        refresher: &dyn TokenRefresher,
    ) -> Result<Repo, CloneError> {
        let path = self.clone_dir.join(commit);

        // A stale directory at the deterministic path is from an older,
        // failed or reaped clone; start clean.
        match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        tokio::fs::create_dir_all(&path).await?;

        let token = refresher
            .refresh_token()
            .await
            .map_err(CloneError::Token)?;
        let authed_url = authenticated_url(url, &token)?;

        let output = tokio::process::Command::new("git")
            .args([
                "clone",
                "--branch",
                branch,
                "--depth=1",
                "--single-branch",
                &authed_url,
                ".",
            ])
            .current_dir(&path)
            .output()
            .await?;

        if !output.status.success() {
            let mut text = String::from_utf8_lossy(&output.stderr).to_string();
            text.push_str(&String::from_utf8_lossy(&output.stdout));
            return Err(CloneError::GitFailed(redact(&text, &authed_url, url)));
        }

        info!(commit, owner, name, "cloned repo");
        Ok(Repo {
            url: url.to_string(),
            branch: branch.to_string(),
            commit: commit.to_string(),
            owner: owner.to_string(),
            name: name.to_string(),
            path,
        })
    }

    /// Delete idle entries whose TTL has elapsed: directory and map entry
    /// go together, under the bookkeeping mutex, so no deletion races a
    /// concurrent lookup. Entries mid-clone are skipped.
    pub fn reap(&self, now: Instant) {
        let mut entries = self.entries.lock();
        entries.retain(|commit, entry| {
            if now < entry.last_access + self.ttl {
                return true;
            }
            // A held guard means a clone (or caller) is active right now.
            if entry.guard.try_lock().is_err() {
                return true;
            }
            if let Some(repo) = &entry.repo {
                if let Err(e) = std::fs::remove_dir_all(&repo.path) {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        warn!(commit, error = %e, "unable to remove reaped repo");
                    }
                }
            }
            debug!(commit, "reaped idle repo");
            false
        });
    }

    /// Run the reaper every `interval` until the returned handle is
    /// aborted or the cache is dropped.
    pub fn start_reaper(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let cache = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // first tick fires immediately
            loop {
                ticker.tick().await;
                match cache.upgrade() {
                    Some(cache) => cache.reap(Instant::now()),
                    None => return,
                }
            }
        })
    }

    #[cfg(test)]
    pub(crate) fn insert_for_test(&self, repo: Repo, last_access: Instant) {
        let mut entries = self.entries.lock();
        let mut entry = Entry::new(last_access);
        entry.repo = Some(repo.clone());
        entry.last_access = last_access;
        entries.insert(repo.commit.clone(), entry);
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, commit: &str) -> bool {
        self.entries.lock().contains_key(commit)
    }
}

/// Inject basic-auth credentials into an https url.
fn authenticated_url(url: &str, token: &str) -> Result<String, CloneError> {
    let rest = url
        .strip_prefix("https://")
        .ok_or_else(|| CloneError::InvalidUrl(url.to_string()))?;
    Ok(format!("https://x-access-token:{}@{}", token, rest))
}

/// Replace the authenticated url in error text with its redacted form.
fn redact(text: &str, authed_url: &str, url: &str) -> String {
    let redacted = url.replacen("https://", "https://x-access-token:***@", 1);
    text.replace(authed_url, &redacted)
}

#[cfg(test)]
#[path = "repo_cache_tests.rs"]
mod tests;
