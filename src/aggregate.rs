//! Grouping primitives shared by the report builders.
//!
//! Groups remember the order in which their keys were first seen; every
//! "sort by count" in the reports is a stable sort over that order, so equal
//! counts keep first-encountered order.

use ahash::AHashMap;
use itertools::Itertools;
use serde::Serialize;
use std::hash::Hash;

#[derive(Debug, Clone)]
pub struct OrderedGroups<K, G> {
    index: AHashMap<K, usize>,
    items: Vec<(K, G)>,
}

impl<K, G> Default for OrderedGroups<K, G> {
    fn default() -> Self {
        Self { index: AHashMap::new(), items: Vec::new() }
    }
}

impl<K: Hash + Eq + Clone, G: Default> OrderedGroups<K, G> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(&mut self, key: &K) -> &mut G {
        let idx = match self.index.get(key) {
            Some(&i) => i,
            None => {
                let i = self.items.len();
                self.index.insert(key.clone(), i);
                self.items.push((key.clone(), G::default()));
                i
            }
        };
        &mut self.items[idx].1
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(K, G)> {
        self.items.iter()
    }

    /// Groups in descending order of `weight`, ties in first-seen order.
    pub fn into_sorted_by_desc<W: Ord, F: Fn(&G) -> W>(self, weight: F) -> Vec<(K, G)> {
        let mut items = self.items;
        items.sort_by(|a, b| weight(&b.1).cmp(&weight(&a.1)));
        items
    }
}

pub type OrderedCounter<K> = OrderedGroups<K, u64>;

impl<K: Hash + Eq + Clone> OrderedGroups<K, u64> {
    pub fn add(&mut self, key: &K) {
        *self.entry(key) += 1;
    }

    /// All keys by descending count, ties in first-seen order.
    pub fn most_common(&self) -> Vec<(K, u64)> {
        let mut items = self.items.clone();
        items.sort_by(|a, b| b.1.cmp(&a.1));
        items
    }

    pub fn top(&self, n: usize) -> Vec<(K, u64)> {
        let mut items = self.most_common();
        items.truncate(n);
        items
    }
}

/// Integer average; zero hits give zero. Totals are `u128` so that any number
/// of `u64` byte counts can be summed.
pub fn avg_bytes(total: u128, hits: u64) -> u64 {
    if hits == 0 {
        return 0;
    }
    u64::try_from(total / u128::from(hits)).unwrap_or(u64::MAX)
}

/// `"200:5, 404:2"`, most frequent first.
pub fn status_distribution(codes: &OrderedCounter<u16>) -> String {
    codes.most_common().iter().map(|(code, n)| format!("{code}:{n}")).join(", ")
}

pub fn percentage(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2(part as f64 / total as f64 * 100.0)
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UrlHits {
    pub url: String,
    pub hits: u64,
}

impl UrlHits {
    pub fn from_counts(counts: Vec<(String, u64)>) -> Vec<UrlHits> {
        counts.into_iter().map(|(url, hits)| UrlHits { url, hits }).collect()
    }
}
