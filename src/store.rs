use std::collections::HashSet;

use dashmap::DashMap;

use crate::metrics::MetricGroup;

type SeriesKey = (String, &'static str, Option<String>);

/// Latest metric groups, keyed by plugin instance, type and type instance.
///
/// Only the newest pass is kept. The API handlers read it concurrently while
/// the publisher replaces its contents.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    groups: DashMap<SeriesKey, MetricGroup>,
}

impl SnapshotStore {
    /// Replaces the stored groups with those of a new pass.
    ///
    /// Series that are not part of `groups` are dropped.
    pub fn publish(&self, groups: Vec<MetricGroup>) {
        let mut fresh = HashSet::with_capacity(groups.len());
        for group in groups {
            let key = group.series_key();
            fresh.insert(key.clone());
            self.groups.insert(key, group);
        }
        self.groups.retain(|key, _| fresh.contains(key));
        log::trace!("published {} metric groups", self.groups.len());
    }

    /// Returns every stored group, ordered by series key.
    pub fn all(&self) -> Vec<MetricGroup> {
        self.sorted(|_| true)
    }

    /// Returns the groups whose plugin instance equals `instance`.
    pub fn instance(&self, instance: &str) -> Vec<MetricGroup> {
        self.sorted(|key| key.0 == instance)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    fn sorted(&self, filter: impl Fn(&SeriesKey) -> bool) -> Vec<MetricGroup> {
        let mut out: Vec<(SeriesKey, MetricGroup)> = self
            .groups
            .iter()
            .filter(|entry| filter(entry.key()))
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out.into_iter().map(|(_, group)| group).collect()
    }
}
