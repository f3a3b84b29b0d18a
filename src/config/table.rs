use std::collections::BTreeMap;

use super::policy::{MountPolicy, WILDCARD};

/// Per-mount-point policies with a guaranteed wildcard fallback.
///
/// Built once at start-up and only read afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountTable {
    policies: BTreeMap<String, MountPolicy>,
}

impl Default for MountTable {
    fn default() -> Self {
        Self::new(BTreeMap::new())
    }
}

impl MountTable {
    /// Builds the table, inserting a default wildcard entry if none was configured.
    pub fn new(mut policies: BTreeMap<String, MountPolicy>) -> Self {
        policies
            .entry(WILDCARD.to_owned())
            .or_insert_with(MountPolicy::default);
        Self { policies }
    }

    /// Returns the policy for `mountpoint`, falling back to the wildcard entry.
    pub fn resolve(&self, mountpoint: &str) -> &MountPolicy {
        self.policies
            .get(mountpoint)
            .or_else(|| self.policies.get(WILDCARD))
            .expect("wildcard policy is inserted on construction")
    }

    pub fn wildcard(&self) -> &MountPolicy {
        self.resolve(WILDCARD)
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}
