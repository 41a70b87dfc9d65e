//! In-memory evaluation cache with whole-cache staleness.
//!
//! The cache is the source of truth for read-after-write consistency
//! within the TTL window; the sheet behind it is a durable mirror. It
//! refreshes as a unit (never per key), and a failed reload keeps the
//! previous contents on the stale-but-available principle. Clock and TTL
//! are injected so staleness is testable without sleeping.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::model::{EvaluationRecord, ScoreMap};
use crate::store::EvaluationSource;

/// Observed refresh interval of the production deployment.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

pub struct EvaluationCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: HashMap<(String, String), EvaluationRecord>,
    last_refresh: Option<Instant>,
}

impl EvaluationCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: HashMap::new(),
            last_refresh: None,
        }
    }

    pub fn with_system_clock(ttl: Duration) -> Self {
        Self::new(ttl, Arc::new(SystemClock))
    }

    /// A never-refreshed cache is stale by definition.
    pub fn is_stale(&self) -> bool {
        match self.last_refresh {
            None => true,
            Some(at) => self.clock.now().duration_since(at) > self.ttl,
        }
    }

    /// Keys are the literal (team, judge) pair after trimming; no case
    /// normalization.
    pub fn get(&self, team: &str, judge: &str) -> Option<&EvaluationRecord> {
        self.entries
            .get(&(team.trim().to_string(), judge.trim().to_string()))
    }

    /// Unconditional overwrite of the (team, judge) entry. Callers supply
    /// the complete criterion map; partial updates are never merged.
    ///
    /// A write also counts as a refresh for staleness purposes: a read
    /// immediately after a write must serve the cache, not race a reload
    /// of the (possibly not yet written) sheet.
    pub fn set(&mut self, team: &str, judge: &str, scores: ScoreMap) {
        let team = team.trim().to_string();
        let judge = judge.trim().to_string();
        let record = EvaluationRecord::new(team.clone(), judge.clone(), scores);
        self.entries.insert((team, judge), record);
        self.last_refresh = Some(self.clock.now());
    }

    /// Replace the whole cache with freshly loaded records and mark it
    /// fresh. This is the only way cache contents are replaced as a unit.
    pub fn install_records(&mut self, records: Vec<EvaluationRecord>) {
        self.entries = records
            .into_iter()
            .map(|r| {
                let key = (r.team.trim().to_string(), r.judge.trim().to_string());
                (key, r)
            })
            .collect();
        self.last_refresh = Some(self.clock.now());
    }

    /// Reload the whole cache from `source` when older than the TTL.
    ///
    /// Returns true when a reload actually ran and succeeded. On reload
    /// failure the previous contents stay in place and the cache remains
    /// stale, so a later caller retries.
    pub fn refresh_if_stale(&mut self, source: &dyn EvaluationSource) -> bool {
        if !self.is_stale() {
            return false;
        }
        match source.load() {
            Ok(records) => {
                self.install_records(records);
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "evaluation cache refresh failed; keeping previous contents");
                false
            }
        }
    }

    pub fn records(&self) -> impl Iterator<Item = &EvaluationRecord> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StoreError;
    use crate::rubric;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct ManualClock {
        now: Mutex<Instant>,
    }

    impl ManualClock {
        fn starting_now() -> Arc<Self> {
            Arc::new(Self {
                now: Mutex::new(Instant::now()),
            })
        }

        fn advance(&self, by: Duration) {
            let mut now = self.now.lock().unwrap();
            *now += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            *self.now.lock().unwrap()
        }
    }

    struct CountingSource {
        loads: AtomicUsize,
        records: Vec<EvaluationRecord>,
        fail: bool,
    }

    impl CountingSource {
        fn with_records(records: Vec<EvaluationRecord>) -> Self {
            Self {
                loads: AtomicUsize::new(0),
                records,
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                loads: AtomicUsize::new(0),
                records: Vec::new(),
                fail: true,
            }
        }

        fn load_count(&self) -> usize {
            self.loads.load(Ordering::SeqCst)
        }
    }

    impl EvaluationSource for CountingSource {
        fn load(&self) -> Result<Vec<EvaluationRecord>, StoreError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(StoreError::Read {
                    path: "evals.csv".into(),
                    source: std::io::Error::new(std::io::ErrorKind::Other, "unreachable"),
                });
            }
            Ok(self.records.clone())
        }
    }

    fn record(team: &str, judge: &str, creativity: u8) -> EvaluationRecord {
        let mut scores: ScoreMap = rubric::criteria().map(|c| (c.to_string(), 0)).collect();
        scores.insert("Creativity".to_string(), creativity);
        EvaluationRecord::new(team, judge, scores)
    }

    #[test]
    fn refresh_runs_once_until_ttl_elapses() {
        let clock = ManualClock::starting_now();
        let mut cache = EvaluationCache::new(Duration::from_secs(30), clock.clone());
        let source = CountingSource::with_records(vec![record("Blue", "alice", 7)]);

        assert!(cache.refresh_if_stale(&source));
        assert!(!cache.refresh_if_stale(&source));
        assert!(!cache.refresh_if_stale(&source));
        assert_eq!(source.load_count(), 1);

        clock.advance(Duration::from_secs(31));
        assert!(cache.refresh_if_stale(&source));
        assert_eq!(source.load_count(), 2);
    }

    #[test]
    fn exactly_at_ttl_is_still_fresh() {
        let clock = ManualClock::starting_now();
        let mut cache = EvaluationCache::new(Duration::from_secs(30), clock.clone());
        let source = CountingSource::with_records(Vec::new());

        cache.refresh_if_stale(&source);
        clock.advance(Duration::from_secs(30));
        assert!(!cache.is_stale());
    }

    #[test]
    fn failed_refresh_keeps_previous_contents() {
        let clock = ManualClock::starting_now();
        let mut cache = EvaluationCache::new(Duration::from_secs(30), clock.clone());

        let good = CountingSource::with_records(vec![record("Blue", "alice", 7)]);
        assert!(cache.refresh_if_stale(&good));
        assert_eq!(cache.len(), 1);

        clock.advance(Duration::from_secs(31));
        let bad = CountingSource::failing();
        assert!(!cache.refresh_if_stale(&bad));
        assert_eq!(bad.load_count(), 1);
        assert_eq!(cache.get("Blue", "alice").unwrap().scores["Creativity"], 7);
        // Still stale, so the next caller retries the reload.
        assert!(cache.is_stale());
    }

    #[test]
    fn set_overwrites_whole_entry_and_trims_keys() {
        let mut cache = EvaluationCache::with_system_clock(DEFAULT_TTL);
        cache.set(" Blue ", " alice ", record("Blue", "alice", 3).scores);
        cache.set("Blue", "alice", record("Blue", "alice", 9).scores);

        assert_eq!(cache.len(), 1);
        let hit = cache.get("Blue", " alice").unwrap();
        assert_eq!(hit.scores["Creativity"], 9);
    }

    #[test]
    fn a_write_counts_as_a_refresh() {
        let clock = ManualClock::starting_now();
        let mut cache = EvaluationCache::new(Duration::from_secs(30), clock.clone());
        assert!(cache.is_stale());

        cache.set("Blue", "alice", record("Blue", "alice", 4).scores);
        assert!(!cache.is_stale());

        let source = CountingSource::with_records(Vec::new());
        assert!(!cache.refresh_if_stale(&source));
        assert_eq!(source.load_count(), 0);
        assert!(cache.get("Blue", "alice").is_some());
    }

    #[test]
    fn refresh_replaces_cache_as_a_unit() {
        let clock = ManualClock::starting_now();
        let mut cache = EvaluationCache::new(Duration::from_secs(30), clock.clone());

        let first = CountingSource::with_records(vec![record("Blue", "alice", 1)]);
        cache.refresh_if_stale(&first);
        cache.set("Green", "bob", record("Green", "bob", 5).scores);
        assert_eq!(cache.len(), 2);

        clock.advance(Duration::from_secs(31));
        let second = CountingSource::with_records(vec![record("Red", "carol", 2)]);
        cache.refresh_if_stale(&second);

        assert_eq!(cache.len(), 1);
        assert!(cache.get("Green", "bob").is_none());
        assert!(cache.get("Red", "carol").is_some());
    }
}
