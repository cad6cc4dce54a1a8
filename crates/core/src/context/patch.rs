//! [`ContextPatch`] and [`MergePolicy`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Per-key merge rule selecting how a patched value combines with any
/// existing value at that key. Absent from a patch's `policy` map, a key
/// defaults to `LastWriteWins`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    LastWriteWins,
    FirstWriteWins,
    AppendList,
    MergeDict,
    Reduce,
}

/// The output of one node execution, queued for application to [`super::Context`].
///
/// `provenance` is typically the emitting node's id; `tags` are free-form
/// labels a host may use to filter or audit patches.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextPatch {
    pub data: BTreeMap<String, Value>,
    #[serde(default)]
    pub policy: BTreeMap<String, MergePolicy>,
    #[serde(default)]
    pub provenance: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl ContextPatch {
    pub fn new(provenance: impl Into<String>) -> Self {
        Self {
            data: BTreeMap::new(),
            policy: BTreeMap::new(),
            provenance: provenance.into(),
            tags: BTreeSet::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    pub fn with_policy(mut self, key: impl Into<String>, policy: MergePolicy) -> Self {
        self.policy.insert(key.into(), policy);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Fold `other` into `self` under `merge_dict` semantics — used when
    /// fan-in queues a second patch for a downstream node that already has
    /// one pending (§4.3 step 6, §5 fan-in ordering).
    pub fn merge_pending(&mut self, other: &ContextPatch) {
        for (k, v) in &other.data {
            self.data.insert(k.clone(), v.clone());
        }
        for (k, p) in &other.policy {
            self.policy.insert(k.clone(), *p);
        }
        self.tags.extend(other.tags.iter().cloned());
    }
}
