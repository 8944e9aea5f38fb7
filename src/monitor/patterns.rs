//! Substring pattern registry and live line classifier.
//!
//! The registry is caller-supplied and ordered: the first pattern (in
//! insertion order) contained in a line wins, and classification stops
//! there. Memory stays proportional to the number of patterns; no per-line
//! state is kept.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One watched substring with its counting and suppression policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternEntry {
    /// Substring to look for in stdout lines.
    pub pattern: String,
    /// Matches seen so far. Incremented once per matched line.
    #[serde(default)]
    pub count: u64,
    /// When true, warnings stop once `count` reaches `max_count`.
    #[serde(default)]
    pub count_only: bool,
    /// Warning budget for `count_only` entries. `None` with `count_only`
    /// set means every match is counted silently.
    #[serde(default)]
    pub max_count: Option<u64>,
    /// Remediation hint reported alongside the final counts.
    #[serde(default)]
    pub hint: String,
}

impl PatternEntry {
    fn should_warn(&self) -> bool {
        if !self.count_only {
            return true;
        }
        self.count <= self.max_count.unwrap_or(0)
    }

    fn at_suppression_threshold(&self) -> bool {
        self.count_only && Some(self.count) == self.max_count
    }
}

/// Ordered registry of watched patterns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatternRegistry {
    order: Vec<String>,
    entries: HashMap<String, PatternEntry>,
}

impl PatternRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from entries, keyed and ordered by pattern text.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = PatternEntry>,
    {
        let mut registry = Self::new();
        for entry in entries {
            registry.insert(entry);
        }
        registry
    }

    /// Add an entry; insertion order defines match precedence. Re-inserting
    /// an existing pattern replaces the entry without changing precedence.
    pub fn insert(&mut self, entry: PatternEntry) {
        if !self.entries.contains_key(&entry.pattern) {
            self.order.push(entry.pattern.clone());
        }
        self.entries.insert(entry.pattern.clone(), entry);
    }

    /// Watch a pattern that warns on every match.
    pub fn watch(&mut self, pattern: &str, hint: &str) {
        self.insert(PatternEntry {
            pattern: pattern.to_string(),
            count: 0,
            count_only: false,
            max_count: None,
            hint: hint.to_string(),
        });
    }

    /// Watch a pattern that warns for the first `max_count` matches and
    /// counts silently afterwards.
    pub fn watch_counted(&mut self, pattern: &str, hint: &str, max_count: u64) {
        self.insert(PatternEntry {
            pattern: pattern.to_string(),
            count: 0,
            count_only: true,
            max_count: Some(max_count),
            hint: hint.to_string(),
        });
    }

    /// Classify one stdout line: bump the first matching entry's counter
    /// and apply its warning policy. Returns the matched pattern, if any.
    pub fn classify(&mut self, line: &str) -> Option<&PatternEntry> {
        let key = self
            .order
            .iter()
            .find(|key| {
                self.entries
                    .get(key.as_str())
                    .is_some_and(|entry| line.contains(&entry.pattern))
            })?
            .clone();

        let entry = self.entries.get_mut(&key)?;
        entry.count += 1;
        if entry.should_warn() {
            tracing::warn!("{}", line);
            if entry.at_suppression_threshold() {
                tracing::warn!(
                    "Pattern '{}' reached {} matches; further occurrences will be counted silently",
                    entry.pattern,
                    entry.count
                );
            }
        }
        Some(&*entry)
    }

    /// Entries in precedence order.
    pub fn entries(&self) -> impl Iterator<Item = &PatternEntry> {
        self.order.iter().filter_map(|key| self.entries.get(key))
    }

    /// Final count for a pattern, if it is registered.
    pub fn count(&self, pattern: &str) -> Option<u64> {
        self.entries.get(pattern).map(|entry| entry.count)
    }

    /// Sum of all counters.
    pub fn total_matches(&self) -> u64 {
        self.entries.values().map(|entry| entry.count).sum()
    }

    /// Reset every counter to zero, keeping patterns and policy.
    pub fn reset(&mut self) {
        for entry in self.entries.values_mut() {
            entry.count = 0;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Log one summary line per matched pattern, with its hint.
    pub fn log_summary(&self) {
        for entry in self.entries().filter(|entry| entry.count > 0) {
            if entry.hint.is_empty() {
                tracing::warn!("Pattern '{}' matched {} time(s)", entry.pattern, entry.count);
            } else {
                tracing::warn!(
                    "Pattern '{}' matched {} time(s): {}",
                    entry.pattern,
                    entry.count,
                    entry.hint
                );
            }
        }
    }
}
