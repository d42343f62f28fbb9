use crate::entity::TagStore;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counter for long passes; rewrites one stderr line per interval.
pub struct ProgressCounter {
    label: &'static str,
    interval: u64,
    count: AtomicU64,
}

impl ProgressCounter {
    pub fn new(label: &'static str, interval: u64) -> Self {
        let counter = Self {
            label,
            interval: interval.max(1),
            count: AtomicU64::new(0),
        };
        counter.print(0);
        counter
    }

    pub fn inc(&self, delta: u64) {
        let prev = self.count.fetch_add(delta, Ordering::SeqCst);
        let current = prev + delta;
        if prev / self.interval < current / self.interval {
            self.print(current);
        }
    }

    pub fn finish(&self) {
        self.print(self.count.load(Ordering::SeqCst));
        eprintln!();
    }

    fn print(&self, current: u64) {
        eprint!("\r{}: {}", self.label, current);
        let _ = std::io::stderr().flush();
    }
}

pub fn build_tag_map<'a, I>(tags: I) -> TagStore
where
    I: Iterator<Item = (&'a str, &'a str)>,
{
    tags.map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

/// True when `key` is present and its value is one of `values`.
pub fn tag_in(tags: &TagStore, key: &str, values: &[&str]) -> bool {
    match tags.get(key) {
        Some(actual) => values.iter().any(|v| v == actual),
        None => false,
    }
}

/// Glob matching with `*` at the start, end, or both.
pub fn glob_match(pattern: &str, actual: &str) -> bool {
    if pattern == "*" {
        return true;
    }

    match (pattern.starts_with('*'), pattern.ends_with('*')) {
        (true, true) => actual.contains(&pattern[1..pattern.len() - 1]),
        (true, false) => actual.ends_with(&pattern[1..]),
        (false, true) => actual.starts_with(&pattern[..pattern.len() - 1]),
        (false, false) => actual == pattern,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(pairs: &[(&str, &str)]) -> TagStore {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn tag_in_requires_exact_value() {
        let t = tags(&[("railway", "station")]);
        assert!(tag_in(&t, "railway", &["station", "halt"]));
        assert!(!tag_in(&t, "railway", &["halt"]));
        assert!(!tag_in(&t, "public_transport", &["station"]));
    }

    #[test]
    fn glob_match_positions() {
        assert!(glob_match("*", "anything"));
        assert!(glob_match("*_link", "motorway_link"));
        assert!(!glob_match("*_link", "motorway"));
        assert!(glob_match("proposed*", "proposed:rail"));
        assert!(glob_match("*rail*", "light_rail_siding"));
        assert!(glob_match("rail", "rail"));
        assert!(!glob_match("rail", "railway"));
    }
}
