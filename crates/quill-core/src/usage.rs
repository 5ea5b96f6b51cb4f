//! Token and cost accounting.
//!
//! The tracker keeps per-session counters in memory and folds every request
//! into a global stats file shared by all sessions. The file is rewritten
//! after each request; concurrent sessions race and the last writer wins.

use crate::config::quill_home;
use crate::error::QuillError;
use chrono::{DateTime, FixedOffset, Local, SecondsFormat};
use quill_provider::{ModelPricing, Usage};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Tracker shared between the REPL and the TokenStats tool.
pub type SharedTracker = Arc<Mutex<TokenTracker>>;

const RULE_WIDTH: usize = 60;

/// Totals across every session, as stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalStats {
    pub total_sessions: u64,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_tokens: u64,
    pub total_input_cost: f64,
    pub total_output_cost: f64,
    pub total_cost: f64,
    pub first_session: Option<DateTime<FixedOffset>>,
    pub last_updated: Option<DateTime<FixedOffset>>,
}

/// Location of the global stats file.
#[derive(Debug, Clone)]
pub struct GlobalStatsStore {
    path: PathBuf,
}

impl Default for GlobalStatsStore {
    fn default() -> Self {
        Self::at(quill_home().join("token_stats.json"))
    }
}

impl GlobalStatsStore {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stats; a missing or unreadable file counts as all zeros.
    pub fn load(&self) -> GlobalStats {
        let Ok(content) = fs::read_to_string(&self.path) else {
            return GlobalStats::default();
        };
        serde_json::from_str(&content).unwrap_or_else(|err| {
            tracing::debug!(path = %self.path.display(), error = %err, "unparseable token stats");
            GlobalStats::default()
        })
    }

    pub fn save(&self, stats: &GlobalStats) -> Result<(), QuillError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(stats)?)?;
        Ok(())
    }

    fn ensure_exists(&self) -> Result<(), QuillError> {
        if self.path.exists() {
            return Ok(());
        }
        self.save(&GlobalStats::default())
    }
}

/// In-memory counters for the running session.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SessionUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub input_cost: f64,
    pub output_cost: f64,
}

impl SessionUsage {
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }

    pub fn total_cost(&self) -> f64 {
        self.input_cost + self.output_cost
    }
}

/// What a single request consumed.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestUsage {
    pub usage: Usage,
    pub input_cost: f64,
    pub output_cost: f64,
    pub model: String,
    pub pricing_available: bool,
    /// Session totals after this request.
    pub session: SessionUsage,
}

impl RequestUsage {
    pub fn total_cost(&self) -> f64 {
        self.input_cost + self.output_cost
    }
}

/// Format a USD amount with six decimals.
pub fn format_cost(cost: f64) -> String {
    format!("${cost:.6}")
}

fn timestamp() -> DateTime<FixedOffset> {
    Local::now().fixed_offset()
}

fn format_time(time: Option<DateTime<FixedOffset>>) -> String {
    time.map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, false))
        .unwrap_or_default()
}

pub struct TokenTracker {
    session: SessionUsage,
    store: GlobalStatsStore,
    session_counted: bool,
}

impl TokenTracker {
    /// Create a tracker, creating the stats file if it does not exist yet.
    pub fn new(store: GlobalStatsStore) -> Self {
        if let Err(err) = store.ensure_exists() {
            tracing::warn!(path = %store.path().display(), error = %err, "could not create token stats file");
        }
        Self {
            session: SessionUsage::default(),
            store,
            session_counted: false,
        }
    }

    pub fn shared(store: GlobalStatsStore) -> SharedTracker {
        Arc::new(Mutex::new(Self::new(store)))
    }

    /// Record a finished request and fold it into the global stats.
    pub fn track(&mut self, usage: Usage, model: &str, pricing: Option<ModelPricing>) -> RequestUsage {
        let (input_cost, output_cost) = pricing.map(|p| p.cost(usage)).unwrap_or((0.0, 0.0));

        self.session.input_tokens += usage.input_tokens;
        self.session.output_tokens += usage.output_tokens;
        self.session.input_cost += input_cost;
        self.session.output_cost += output_cost;

        if let Err(err) = self.update_global(usage, input_cost, output_cost) {
            tracing::warn!(error = %err, "could not update global token stats");
        }

        RequestUsage {
            usage,
            input_cost,
            output_cost,
            model: model.to_string(),
            pricing_available: pricing.is_some(),
            session: self.session,
        }
    }

    fn update_global(&mut self, usage: Usage, input_cost: f64, output_cost: f64) -> Result<(), QuillError> {
        let mut stats = self.store.load();
        let now = timestamp();

        if stats.first_session.is_none() {
            stats.first_session = Some(now);
            stats.total_sessions = 0;
        }
        if !self.session_counted {
            stats.total_sessions += 1;
        }

        stats.total_input_tokens += usage.input_tokens;
        stats.total_output_tokens += usage.output_tokens;
        stats.total_tokens = stats.total_input_tokens + stats.total_output_tokens;
        stats.total_input_cost += input_cost;
        stats.total_output_cost += output_cost;
        stats.total_cost = stats.total_input_cost + stats.total_output_cost;
        stats.last_updated = Some(now);

        self.store.save(&stats)?;
        self.session_counted = true;
        Ok(())
    }

    pub fn session(&self) -> SessionUsage {
        self.session
    }

    pub fn reset_session(&mut self) {
        self.session = SessionUsage::default();
    }

    pub fn global_stats(&self) -> GlobalStats {
        self.store.load()
    }

    pub fn reset_global(&self) -> Result<(), QuillError> {
        self.store.save(&GlobalStats::default())
    }

    /// Two-line summary printed after every request.
    pub fn request_summary(request: &RequestUsage) -> String {
        let usage = request.usage;
        let head = format!(
            "💰 This request: {} tokens ({} in, {} out)",
            usage.total(),
            usage.input_tokens,
            usage.output_tokens
        );
        if request.pricing_available {
            format!(
                "{head} | Cost: {}\n📊 Session total: {} tokens | Cost: {}",
                format_cost(request.total_cost()),
                request.session.total_tokens(),
                format_cost(request.session.total_cost())
            )
        } else {
            format!(
                "{head} | Cost: N/A (pricing not available for {})\n📊 Session total: {} tokens",
                request.model,
                request.session.total_tokens()
            )
        }
    }

    pub fn session_summary(&self) -> String {
        let s = self.session;
        let rule = "=".repeat(RULE_WIDTH);
        let thin = "-".repeat(RULE_WIDTH);
        [
            rule.clone(),
            "SESSION TOKEN USAGE & COST SUMMARY".to_string(),
            rule.clone(),
            format!("Input tokens:   {:>12}", s.input_tokens),
            format!("Output tokens:  {:>12}", s.output_tokens),
            format!("Total tokens:   {:>12}", s.total_tokens()),
            thin,
            format!("Input cost:     {:>12}", format_cost(s.input_cost)),
            format!("Output cost:    {:>12}", format_cost(s.output_cost)),
            format!("Total cost:     {:>12}", format_cost(s.total_cost())),
            rule,
        ]
        .join("\n")
    }

    pub fn global_summary(&self) -> String {
        let g = self.global_stats();
        let rule = "=".repeat(RULE_WIDTH);
        let thin = "-".repeat(RULE_WIDTH);
        [
            rule.clone(),
            "GLOBAL TOKEN USAGE & COST SUMMARY".to_string(),
            rule.clone(),
            format!("Total sessions:      {:>12}", g.total_sessions),
            format!("Total input tokens:  {:>12}", g.total_input_tokens),
            format!("Total output tokens: {:>12}", g.total_output_tokens),
            format!("Total tokens:        {:>12}", g.total_tokens),
            thin.clone(),
            format!("Total input cost:    {:>12}", format_cost(g.total_input_cost)),
            format!("Total output cost:   {:>12}", format_cost(g.total_output_cost)),
            format!("Total cost:          {:>12}", format_cost(g.total_cost)),
            thin,
            format!("Last updated:        {}", format_time(g.last_updated)),
            rule,
        ]
        .join("\n")
    }

    /// One-line description used by the TokenStats tool.
    pub fn global_line(&self) -> String {
        let g = self.global_stats();
        format!(
            "Global token usage across all sessions: {} input + {} output = {} total tokens across {} sessions. Last updated: {}",
            g.total_input_tokens,
            g.total_output_tokens,
            g.total_tokens,
            g.total_sessions,
            format_time(g.last_updated)
        )
    }
}
