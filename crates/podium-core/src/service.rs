//! Request-facing orchestration: cache-first reads and writes over the
//! sheet-backed stores.
//!
//! Reads refresh the cache when stale and then serve from memory; a store
//! outage degrades to the previous (or empty) view and is logged, never
//! surfaced as fatal. Writes land in the cache unconditionally and in the
//! sheet best-effort, reporting `persisted: false` when the durable write
//! failed. Racing refreshes are harmless: the reload is idempotent and the
//! write lock lets only one run.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{RwLock, RwLockWriteGuard};

use crate::cache::{Clock, EvaluationCache, SystemClock};
use crate::config::Config;
use crate::engine;
use crate::model::{LeaderboardRow, ScoreMap, UserRecord};
use crate::rubric;
use crate::store::{EvalSheet, EvaluationSource, UsersSheet};
use crate::users::UserDirectory;

/// Outcome of a write: the cache always took it, the sheet may not have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SaveOutcome {
    pub persisted: bool,
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub token: String,
    pub user: UserRecord,
}

pub struct JudgingService {
    evaluations: EvalSheet,
    credentials: UsersSheet,
    teams: Vec<String>,
    cache: RwLock<EvaluationCache>,
}

impl JudgingService {
    pub fn new(
        evaluation_sheet: EvalSheet,
        credentials_sheet: UsersSheet,
        teams: Vec<String>,
        cache_ttl: Duration,
    ) -> Self {
        Self::with_clock(
            evaluation_sheet,
            credentials_sheet,
            teams,
            cache_ttl,
            Arc::new(SystemClock),
        )
    }

    pub fn with_clock(
        evaluation_sheet: EvalSheet,
        credentials_sheet: UsersSheet,
        teams: Vec<String>,
        cache_ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            evaluations: evaluation_sheet,
            credentials: credentials_sheet,
            teams,
            cache: RwLock::new(EvaluationCache::new(cache_ttl, clock)),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            EvalSheet::new(&config.evaluation_sheet),
            UsersSheet::new(&config.credentials_sheet),
            config.teams.clone(),
            Duration::from_secs(config.cache_ttl_secs),
        )
    }

    pub fn teams(&self) -> &[String] {
        &self.teams
    }

    /// Exact credentials lookup; the token is opaque and carries no claims.
    pub async fn login(&self, username: &str, password: &str) -> Option<LoginOutcome> {
        let directory = self.load_users().await;
        let user = directory.authenticate(username, password)?.clone();
        Some(LoginOutcome {
            token: format!("judge:{}", username.trim()),
            user,
        })
    }

    /// The judge's stored scores for one team, `None` when nothing was
    /// saved yet.
    pub async fn evaluation(&self, team: &str, judge: &str) -> Option<ScoreMap> {
        let cache = self.refreshed_cache().await;
        cache.get(team, judge).map(|r| r.scores.clone())
    }

    /// Cache-first upsert of a complete evaluation.
    pub async fn save_evaluation(
        &self,
        team: &str,
        judge: &str,
        raw_scores: &serde_json::Map<String, serde_json::Value>,
    ) -> SaveOutcome {
        let scores = rubric::normalize_json(raw_scores);
        let record = crate::model::EvaluationRecord::new(team.trim(), judge.trim(), scores);

        {
            // Populate from the sheet first so a cold cache does not start
            // from just this one entry, then overwrite ours.
            let mut cache = self.refreshed_cache().await;
            cache.set(team, judge, record.scores.clone());
        }

        let sheet = self.evaluations.clone();
        let to_write = record.clone();
        let persisted =
            match tokio::task::spawn_blocking(move || sheet.upsert(&to_write)).await {
                Ok(Ok(())) => true,
                Ok(Err(e)) => {
                    tracing::warn!(
                        team = record.team.as_str(),
                        judge = record.judge.as_str(),
                        error = %e,
                        "evaluation saved to cache only; sheet write failed"
                    );
                    false
                }
                Err(e) => {
                    tracing::warn!(error = %e, "evaluation sheet write task failed");
                    false
                }
            };
        SaveOutcome { persisted }
    }

    /// Per-team totals for one judge.
    pub async fn judge_totals(&self, judge: &str) -> BTreeMap<String, u32> {
        let cache = self.refreshed_cache().await;
        engine::totals_for(cache.records(), judge)
    }

    /// Ranked teams by average qualifying total.
    pub async fn leaderboard(&self) -> Vec<LeaderboardRow> {
        let directory = self.load_users().await;
        let cache = self.refreshed_cache().await;
        engine::leaderboard(cache.records(), &self.teams, &directory)
    }

    /// Flip the submitted flag for a user. `None` means no such user;
    /// a sheet outage degrades to `persisted: false`.
    pub async fn submit(&self, user_id: &str) -> Option<SaveOutcome> {
        let sheet = self.credentials.clone();
        let id = user_id.trim().to_string();
        match tokio::task::spawn_blocking(move || sheet.mark_submitted(&id)).await {
            Ok(Ok(true)) => Some(SaveOutcome { persisted: true }),
            Ok(Ok(false)) => None,
            Ok(Err(e)) => {
                tracing::warn!(user_id, error = %e, "submission not persisted; credentials sheet write failed");
                Some(SaveOutcome { persisted: false })
            }
            Err(e) => {
                tracing::warn!(user_id, error = %e, "submission task failed");
                Some(SaveOutcome { persisted: false })
            }
        }
    }

    /// Write-lock the cache, reloading it first when stale. The reload
    /// runs on a blocking thread, and holding the write lock across it
    /// keeps the refresh single-flight.
    async fn refreshed_cache(&self) -> RwLockWriteGuard<'_, EvaluationCache> {
        let mut cache = self.cache.write().await;
        if cache.is_stale() {
            let sheet = self.evaluations.clone();
            match tokio::task::spawn_blocking(move || sheet.load()).await {
                Ok(Ok(records)) => cache.install_records(records),
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "evaluation cache refresh failed; keeping previous contents");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "evaluation cache refresh task failed");
                }
            }
        }
        cache
    }

    async fn load_users(&self) -> UserDirectory {
        let sheet = self.credentials.clone();
        match tokio::task::spawn_blocking(move || sheet.load()).await {
            Ok(Ok(rows)) => UserDirectory::from_rows(&rows),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "credentials sheet unavailable; treating directory as empty");
                UserDirectory::default()
            }
            Err(e) => {
                tracing::warn!(error = %e, "credentials sheet read task failed");
                UserDirectory::default()
            }
        }
    }
}
