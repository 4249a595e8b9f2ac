//! Decision metrics
//!
//! Thread-safe collection of access decision statistics: totals, per-role and
//! per-template tallies, denial reasons and a ring of recent decisions.
//!
//! Metrics live beside the resolver, never inside it, so the decision path
//! itself stays free of shared mutable state.

use crate::access_control::{AccessIntent, Decision, DenialReason};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant, SystemTime};

/// Decision metrics collector
pub struct DecisionMetrics {
    /// Collector start time
    start_time: Instant,
    /// Collector start time as SystemTime (for display)
    start_system_time: SystemTime,
    total_checks: AtomicU64,
    total_allowed: AtomicU64,
    total_denied: AtomicU64,
    total_errors: AtomicU64,
    /// Combined metrics data (single lock for all collections)
    data: RwLock<MetricsData>,
    /// Maximum recent decisions to keep
    max_recent: usize,
}

#[derive(Default)]
struct TallyInner {
    allowed: u64,
    denied: u64,
    last_checked: Option<SystemTime>,
}

impl TallyInner {
    fn bump(&mut self, allowed: bool, now: SystemTime) {
        if allowed {
            self.allowed += 1;
        } else {
            self.denied += 1;
        }
        self.last_checked = Some(now);
    }
}

#[derive(Default)]
struct MetricsData {
    role_stats: HashMap<String, TallyInner>,
    template_stats: HashMap<String, TallyInner>,
    denial_reasons: HashMap<DenialReason, u64>,
    recent: VecDeque<DecisionRecord>,
}

/// Record of a recent decision
#[derive(Debug, Clone, Serialize)]
pub struct DecisionRecord {
    /// Role that was checked (absent when the request carried none)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub method: String,
    /// Canonical template (absent when the check failed before canonicalization)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<AccessIntent>,
    pub allowed: bool,
    /// Denial reason or error message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub timestamp: u64,
}

/// Serializable allow/deny tally for the API
#[derive(Debug, Clone, Serialize)]
pub struct TallyStats {
    pub name: String,
    pub allowed: u64,
    pub denied: u64,
    pub last_checked: Option<u64>,
}

/// Denial reason count
#[derive(Debug, Clone, Serialize)]
pub struct ReasonCount {
    pub reason: DenialReason,
    pub count: u64,
}

/// Overall metrics snapshot for the API
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub start_time: u64,
    pub total_checks: u64,
    pub total_allowed: u64,
    pub total_denied: u64,
    pub total_errors: u64,
    pub checks_per_minute: f64,
    pub roles: Vec<TallyStats>,
    pub templates: Vec<TallyStats>,
    pub denial_reasons: Vec<ReasonCount>,
    pub recent: Vec<DecisionRecord>,
}

fn unix_secs(time: SystemTime) -> u64 {
    time.duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn tallies(stats: &HashMap<String, TallyInner>) -> Vec<TallyStats> {
    let mut tallies: Vec<TallyStats> = stats
        .iter()
        .map(|(name, s)| TallyStats {
            name: name.clone(),
            allowed: s.allowed,
            denied: s.denied,
            last_checked: s.last_checked.map(unix_secs),
        })
        .collect();
    tallies.sort_unstable_by(|a, b| {
        (b.allowed + b.denied)
            .cmp(&(a.allowed + a.denied))
            .then_with(|| a.name.cmp(&b.name))
    });
    tallies
}

impl DecisionMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    /// Create a new metrics collector with specified recent decision capacity
    pub fn with_capacity(max_recent: usize) -> Self {
        Self {
            start_time: Instant::now(),
            start_system_time: SystemTime::now(),
            total_checks: AtomicU64::new(0),
            total_allowed: AtomicU64::new(0),
            total_denied: AtomicU64::new(0),
            total_errors: AtomicU64::new(0),
            data: RwLock::new(MetricsData {
                recent: VecDeque::with_capacity(max_recent),
                ..Default::default()
            }),
            max_recent,
        }
    }

    // Poisoned locks are recovered; metrics are best effort.

    fn write_data(&self) -> RwLockWriteGuard<'_, MetricsData> {
        self.data.write().unwrap_or_else(|poisoned| {
            tracing::warn!("metrics data lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn read_data(&self) -> RwLockReadGuard<'_, MetricsData> {
        self.data.read().unwrap_or_else(|poisoned| {
            tracing::warn!("metrics data lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Record a completed decision
    pub fn record_decision(&self, role: &str, method: &str, decision: &Decision) {
        let now = SystemTime::now();
        let allowed = decision.is_allowed();

        self.total_checks.fetch_add(1, Ordering::Relaxed);
        if allowed {
            self.total_allowed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.total_denied.fetch_add(1, Ordering::Relaxed);
        }

        let mut data = self.write_data();

        // Avoid String allocation if key exists
        match data.role_stats.get_mut(role) {
            Some(entry) => entry.bump(allowed, now),
            None => {
                let mut entry = TallyInner::default();
                entry.bump(allowed, now);
                data.role_stats.insert(role.to_string(), entry);
            }
        }

        let template = decision.template.as_str();
        match data.template_stats.get_mut(template) {
            Some(entry) => entry.bump(allowed, now),
            None => {
                let mut entry = TallyInner::default();
                entry.bump(allowed, now);
                data.template_stats.insert(template.to_string(), entry);
            }
        }

        if let Some(reason) = decision.denial_reason() {
            *data.denial_reasons.entry(reason).or_default() += 1;
        }

        self.push_recent(
            &mut data,
            DecisionRecord {
                role: Some(role.to_string()),
                method: method.to_string(),
                template: Some(template.to_string()),
                intent: Some(decision.intent),
                allowed,
                reason: decision.denial_reason().map(|r| r.to_string()),
                timestamp: unix_secs(now),
            },
        );
    }

    /// Record a check that failed before a decision could be made
    ///
    /// Covers unsupported methods and requests that carried no role.
    pub fn record_error(&self, role: Option<&str>, method: &str, error: &str) {
        self.total_checks.fetch_add(1, Ordering::Relaxed);
        self.total_errors.fetch_add(1, Ordering::Relaxed);

        let mut data = self.write_data();
        self.push_recent(
            &mut data,
            DecisionRecord {
                role: role.map(String::from),
                method: method.to_string(),
                template: None,
                intent: None,
                allowed: false,
                reason: Some(error.to_string()),
                timestamp: unix_secs(SystemTime::now()),
            },
        );
    }

    fn push_recent(&self, data: &mut MetricsData, record: DecisionRecord) {
        if self.max_recent == 0 {
            return;
        }
        if data.recent.len() >= self.max_recent {
            data.recent.pop_front();
        }
        data.recent.push_back(record);
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        let uptime_secs = self.start_time.elapsed().as_secs();
        let total_checks = self.total_checks.load(Ordering::Relaxed);

        let checks_per_minute = if uptime_secs > 0 {
            (total_checks as f64 / uptime_secs as f64) * 60.0
        } else {
            0.0
        };

        // Read all data with a single lock acquisition
        let data = self.read_data();

        let roles = tallies(&data.role_stats);
        let templates = tallies(&data.template_stats);

        let mut denial_reasons: Vec<ReasonCount> = data
            .denial_reasons
            .iter()
            .map(|(reason, count)| ReasonCount {
                reason: *reason,
                count: *count,
            })
            .collect();
        denial_reasons.sort_unstable_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.reason.as_str().cmp(b.reason.as_str()))
        });

        let recent: Vec<_> = data.recent.iter().cloned().collect();

        drop(data);

        MetricsSnapshot {
            uptime_secs,
            start_time: unix_secs(self.start_system_time),
            total_checks,
            total_allowed: self.total_allowed.load(Ordering::Relaxed),
            total_denied: self.total_denied.load(Ordering::Relaxed),
            total_errors: self.total_errors.load(Ordering::Relaxed),
            checks_per_minute,
            roles,
            templates,
            denial_reasons,
            recent,
        }
    }

    /// Get uptime duration
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn total_checks(&self) -> u64 {
        self.total_checks.load(Ordering::Relaxed)
    }

    pub fn total_allowed(&self) -> u64 {
        self.total_allowed.load(Ordering::Relaxed)
    }

    pub fn total_denied(&self) -> u64 {
        self.total_denied.load(Ordering::Relaxed)
    }

    pub fn total_errors(&self) -> u64 {
        self.total_errors.load(Ordering::Relaxed)
    }
}

impl Default for DecisionMetrics {
    fn default() -> Self {
        Self::new()
    }
}
