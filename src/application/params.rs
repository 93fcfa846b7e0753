//! Query-string parameter state shared by list screens.
//!
//! [`ParamStore`] is the single source of truth for filters, search keyword
//! and page cursor. Controls never mutate it directly: they merge partial
//! updates or remove keys, and every effective change becomes one history
//! entry plus one notification to subscribers.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::Mutex;

use tokio::sync::watch;
use tracing::debug;
use url::form_urlencoded;

use crate::application::pagination::PageCursor;
use crate::domain::resources::PAGE_KEY;
use crate::infra::lock::mutex_lock;

const SOURCE: &str = "application::params";
/// Oldest entries are dropped once this many navigations are remembered.
pub const HISTORY_LIMIT: usize = 256;

/// Decoded query-string state. Never holds an empty value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ParamSet {
    values: BTreeMap<String, String>,
}

impl ParamSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a query string (`?` prefix optional). Later duplicates win and
    /// blank values are dropped, so parsing never fails.
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut params = Self::new();
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            params.apply(key.into_owned(), value.into_owned());
        }
        params
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 1-based page cursor; absent or malformed values read as the first page.
    pub fn page(&self) -> PageCursor {
        PageCursor::from_param(self.get(PAGE_KEY))
    }

    /// Form-urlencoded representation with keys in sorted order.
    pub fn to_query(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in &self.values {
            serializer.append_pair(key, value);
        }
        serializer.finish()
    }

    /// Insert or, for blank values, remove. Returns whether the set changed.
    fn apply(&mut self, key: String, value: String) -> bool {
        if key.is_empty() {
            return false;
        }
        if value.trim().is_empty() {
            return self.values.remove(&key).is_some();
        }
        match self.values.get(&key) {
            Some(existing) if *existing == value => false,
            _ => {
                self.values.insert(key, value);
                true
            }
        }
    }

    fn remove_key(&mut self, key: &str) -> bool {
        self.values.remove(key).is_some()
    }
}

impl fmt::Display for ParamSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_query())
    }
}

impl<K, V> FromIterator<(K, V)> for ParamSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (key, value) in iter {
            params.apply(key.into(), value.into());
        }
        params
    }
}

/// Read/merge/remove surface over the current [`ParamSet`].
///
/// All mutations are read-modify-write under the channel lock, so writes
/// issued by independent controls in the same tick compose instead of
/// overwriting each other. Changing or removing any key other than `page`
/// resets the cursor to the first page unless the same update sets `page`.
#[derive(Debug)]
pub struct ParamStore {
    current: watch::Sender<ParamSet>,
    history: Mutex<VecDeque<ParamSet>>,
}

impl Default for ParamStore {
    fn default() -> Self {
        Self::new(ParamSet::new())
    }
}

impl ParamStore {
    pub fn new(initial: ParamSet) -> Self {
        let (current, _) = watch::channel(initial);
        Self {
            current,
            history: Mutex::new(VecDeque::new()),
        }
    }

    pub fn from_query(query: &str) -> Self {
        Self::new(ParamSet::parse(query))
    }

    pub fn read(&self) -> ParamSet {
        self.current.borrow().clone()
    }

    /// Current query string, e.g. `keyword=%C3%A1o&page=2`.
    pub fn location(&self) -> String {
        self.current.borrow().to_query()
    }

    /// Receiver notified on every effective change (a navigation event).
    pub fn subscribe(&self) -> watch::Receiver<ParamSet> {
        self.current.subscribe()
    }

    /// Number of history entries that [`ParamStore::back`] can restore.
    pub fn history_len(&self) -> usize {
        mutex_lock(&self.history, SOURCE, "history_len").len()
    }

    /// Merge `partial` into the current set. Blank values remove their key.
    pub fn set<I, K, V>(&self, partial: I) -> bool
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let updates: Vec<(String, String)> = partial
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();

        self.commit("set", |params| {
            let mut filter_changed = false;
            let mut page_written = false;
            for (key, value) in updates {
                let is_page = key == PAGE_KEY;
                page_written |= is_page;
                if params.apply(key, value) && !is_page {
                    filter_changed = true;
                }
            }
            if filter_changed && !page_written {
                params.remove_key(PAGE_KEY);
            }
        })
    }

    /// Remove `keys`, preserving every other key.
    pub fn remove<I, K>(&self, keys: I) -> bool
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let keys: Vec<String> = keys.into_iter().map(|k| k.as_ref().to_string()).collect();

        self.commit("remove", |params| {
            let mut filter_changed = false;
            for key in &keys {
                if params.remove_key(key) && key != PAGE_KEY {
                    filter_changed = true;
                }
            }
            if filter_changed {
                params.remove_key(PAGE_KEY);
            }
        })
    }

    /// Replace the whole set from a query string, as following a link would.
    pub fn navigate(&self, query: &str) -> bool {
        let next = ParamSet::parse(query);
        self.commit("navigate", |params| *params = next)
    }

    /// Restore the previous history entry. Returns `false` at the start of history.
    pub fn back(&self) -> bool {
        self.current.send_if_modified(|current| {
            let mut history = mutex_lock(&self.history, SOURCE, "back");
            match history.pop_back() {
                Some(previous) => {
                    debug!(location = %previous, "navigated back");
                    *current = previous;
                    true
                }
                None => false,
            }
        })
    }

    fn commit<F>(&self, op: &'static str, mutate: F) -> bool
    where
        F: FnOnce(&mut ParamSet),
    {
        self.current.send_if_modified(|current| {
            let mut next = current.clone();
            mutate(&mut next);
            if next == *current {
                return false;
            }
            debug!(op, location = %next, "parameters changed");
            let previous = std::mem::replace(current, next);
            let mut history = mutex_lock(&self.history, SOURCE, op);
            if history.len() == HISTORY_LIMIT {
                history.pop_front();
            }
            history.push_back(previous);
            true
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn set_merges_and_preserves_unrelated_keys() {
        let store = ParamStore::from_query("status=PENDING&keyword=shirt");

        assert!(store.set([("type", "NEWS")]));

        let params = store.read();
        assert_eq!(params.get("status"), Some("PENDING"));
        assert_eq!(params.get("keyword"), Some("shirt"));
        assert_eq!(params.get("type"), Some("NEWS"));
    }

    #[test]
    fn blank_value_is_equivalent_to_remove() {
        let via_set = ParamStore::from_query("keyword=tea&status=OPEN");
        let via_remove = ParamStore::from_query("keyword=tea&status=OPEN");

        via_set.set([("keyword", "")]);
        via_remove.remove(["keyword"]);

        assert_eq!(via_set.read(), via_remove.read());
        assert!(!via_set.read().contains_key("keyword"));
        assert!(via_set.read().iter().all(|(_, v)| !v.is_empty()));
    }

    #[test]
    fn whitespace_only_values_are_dropped() {
        let store = ParamStore::default();
        assert!(!store.set([("keyword", "   ")]));
        assert!(store.read().is_empty());
    }

    #[test]
    fn parse_drops_empty_values_and_decodes_utf8() {
        let params = ParamSet::parse("?keyword=%C3%A1o&status=&page=2");

        assert_eq!(params.get("keyword"), Some("áo"));
        assert!(!params.contains_key("status"));
        assert_eq!(params.page().get(), 2);
    }

    #[test]
    fn query_round_trips_through_location() {
        let store = ParamStore::default();
        store.set([("keyword", "áo sơ mi"), ("categoryNames", "Men,Sale")]);

        let location = store.location();
        assert_eq!(
            location,
            "categoryNames=Men%2CSale&keyword=%C3%A1o+s%C6%A1+mi"
        );
        assert_eq!(ParamSet::parse(&location), store.read());
    }

    #[test]
    fn filter_change_resets_page() {
        let store = ParamStore::from_query("page=3&status=PENDING");

        store.set([("status", "DELIVERED")]);

        assert_eq!(store.read().get("page"), None);
        assert_eq!(store.read().page(), PageCursor::FIRST);
    }

    #[test]
    fn removing_filter_resets_page() {
        let store = ParamStore::from_query("page=3&keyword=tea");
        store.remove(["keyword"]);
        assert!(store.read().is_empty());
    }

    #[test]
    fn page_write_does_not_reset_itself() {
        let store = ParamStore::from_query("keyword=tea");
        store.set([("page", "4")]);
        assert_eq!(store.read().page().get(), 4);
        assert_eq!(store.read().get("keyword"), Some("tea"));
    }

    #[test]
    fn explicit_page_in_same_update_wins_over_reset() {
        let store = ParamStore::from_query("page=3&keyword=tea");
        store.set([("keyword", "coffee"), ("page", "2")]);
        assert_eq!(store.read().page().get(), 2);
    }

    #[test]
    fn unchanged_value_is_a_no_op() {
        let store = ParamStore::from_query("page=3&keyword=tea");

        assert!(!store.set([("keyword", "tea")]));
        assert_eq!(store.read().page().get(), 3);
        assert_eq!(store.history_len(), 0);
    }

    #[test]
    fn back_restores_previous_entry() {
        let store = ParamStore::from_query("keyword=tea");
        store.set([("status", "OPEN")]);
        store.remove(["keyword"]);

        assert_eq!(store.history_len(), 2);
        assert!(store.back());
        assert_eq!(store.location(), "keyword=tea&status=OPEN");
        assert!(store.back());
        assert_eq!(store.location(), "keyword=tea");
        assert!(!store.back());
    }

    #[test]
    fn history_keeps_only_the_most_recent_entries() {
        let store = ParamStore::from_query("keyword=k0");
        for i in 1..=300 {
            store.navigate(&format!("keyword=k{i}"));
        }
        assert_eq!(store.history_len(), HISTORY_LIMIT);

        assert!(store.back());
        assert_eq!(store.location(), "keyword=k299");
        while store.back() {}
        assert_eq!(store.location(), format!("keyword=k{}", 300 - HISTORY_LIMIT));
    }

    #[test]
    fn navigate_replaces_everything() {
        let store = ParamStore::from_query("keyword=tea&status=OPEN");
        store.navigate("type=NEWS");
        assert_eq!(store.location(), "type=NEWS");
    }

    #[test]
    fn concurrent_writers_merge_instead_of_clobbering() {
        let store = Arc::new(ParamStore::default());
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for round in 0..50 {
                        store.set([(format!("k{worker}"), format!("v{round}"))]);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("writer thread");
        }

        let params = store.read();
        assert_eq!(params.len(), 8);
        for worker in 0..8 {
            assert_eq!(params.get(&format!("k{worker}")), Some("v49"));
        }
    }

    #[tokio::test]
    async fn subscribers_observe_each_change() {
        let store = ParamStore::default();
        let mut rx = store.subscribe();

        store.set([("keyword", "tea")]);
        rx.changed().await.expect("change notified");
        assert_eq!(rx.borrow_and_update().get("keyword"), Some("tea"));

        store.set([("keyword", "tea")]);
        assert!(!rx.has_changed().expect("sender alive"));
    }
}
