//! Runtime state threaded through traversal: [`Context`], [`ContextPatch`],
//! and merge-policy application.
//!
//! `private.*` keys may never be written by a node patch; `tmp.*` keys are
//! excluded from [`Context::fingerprint`]. Both checks apply to the *patch*
//! key, not to direct host writes via [`Context::set`] — a host constructing
//! seed state is trusted, a node's patch is not.

mod patch;
mod policies;

pub use patch::{ContextPatch, MergePolicy};
pub use policies::apply_policy;

use crate::error::{GraphError, Result};
use crate::llm_client::LLMClient;
use serde_json::Value;
use std::collections::BTreeSet;
use std::collections::HashMap;
use std::sync::Arc;

const PRIVATE_PREFIX: &str = "private.";
const TMP_PREFIX: &str = "tmp.";

pub(crate) fn is_protected_write(key: &str) -> bool {
    key.starts_with(PRIVATE_PREFIX)
}

pub(crate) fn is_excluded_from_fingerprint(key: &str) -> bool {
    key.starts_with(TMP_PREFIX)
}

/// The mutable dotted-key store threaded through one `RunDAG` call.
///
/// Not safe for concurrent mutation — see the concurrency notes on
/// [`crate::traversal::run_dag`]. A `Context` may be reused across calls by
/// the host; traversal never drops state the node patches didn't overwrite.
#[derive(Clone, Default)]
pub struct Context {
    store: HashMap<String, Value>,
    /// The `llm_service` capability, set by the host via
    /// [`Context::with_llm_service`] (or left `None` for graphs with no
    /// classifier/extractor nodes). Held out-of-band from `store` since a
    /// trait object isn't representable as `serde_json::Value`.
    llm_service: Option<Arc<dyn LLMClient>>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("store", &self.store)
            .field("llm_service", &self.llm_service.is_some())
            .finish()
    }
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_llm_service(mut self, client: Arc<dyn LLMClient>) -> Self {
        self.llm_service = Some(client);
        self
    }

    pub fn llm_service(&self) -> Option<&Arc<dyn LLMClient>> {
        self.llm_service.as_ref()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.store.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.store.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.store.keys()
    }

    /// Direct host write. Bypasses the protected-namespace check — patches
    /// from node execution must go through [`Context::apply_patch`] instead.
    pub fn set(&mut self, key: impl Into<String>, value: Value, _modified_by: &str) {
        self.store.insert(key.into(), value);
    }

    /// Full copy of the current store, for checkpointing or diffing.
    pub fn snapshot(&self) -> HashMap<String, Value> {
        self.store.clone()
    }

    /// Merge another map into the store under `last_write_wins` for every key.
    pub fn merge_from(&mut self, other: &HashMap<String, Value>) {
        for (k, v) in other {
            self.store.insert(k.clone(), v.clone());
        }
    }

    /// Apply a patch produced by node execution, enforcing the
    /// protected-namespace rule and each key's declared merge policy.
    pub fn apply_patch(&mut self, patch: &ContextPatch) -> Result<()> {
        for (key, incoming) in &patch.data {
            if is_protected_write(key) {
                return Err(GraphError::protected_namespace(key));
            }
            let policy = patch.policy.get(key).copied().unwrap_or(MergePolicy::LastWriteWins);
            let existing = self.store.get(key).cloned();
            let resolved = apply_policy(key, policy, existing, incoming.clone())?;
            self.store.insert(key.clone(), resolved);
        }
        Ok(())
    }

    /// Deterministic content hash of the store, excluding `private.*` and
    /// `tmp.*` keys, stable across key-order permutations.
    ///
    /// `include` restricts the fingerprint to a specific key set when given;
    /// `None` fingerprints the whole (filtered) store.
    pub fn fingerprint(&self, include: Option<&BTreeSet<String>>) -> Fingerprint {
        use std::collections::BTreeMap;
        use std::hash::{Hash, Hasher};

        let mut sorted: BTreeMap<&str, &Value> = BTreeMap::new();
        for (k, v) in &self.store {
            if is_excluded_from_fingerprint(k) || is_protected_write(k) {
                continue;
            }
            if let Some(allow) = include {
                if !allow.contains(k.as_str()) {
                    continue;
                }
            }
            sorted.insert(k.as_str(), v);
        }

        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        for (k, v) in sorted {
            k.hash(&mut hasher);
            // serde_json::Value doesn't implement Hash; its canonical string
            // form does, and object keys serialize in BTreeMap order since
            // Value::Object is backed by one when the `preserve_order`
            // feature is off.
            v.to_string().hash(&mut hasher);
        }
        Fingerprint(hasher.finish())
    }
}

/// Opaque content hash returned by [`Context::fingerprint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(pub u64);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[test]
    fn rejects_private_namespace_write() {
        let mut ctx = Context::new();
        let mut data = BTreeMap::new();
        data.insert("private.secret".to_string(), json!("x"));
        let patch = ContextPatch {
            data,
            policy: BTreeMap::new(),
            provenance: "test".to_string(),
            tags: BTreeSet::new(),
        };
        assert!(ctx.apply_patch(&patch).is_err());
    }

    #[test]
    fn fingerprint_ignores_tmp_and_private_and_key_order() {
        let mut a = Context::new();
        a.set("a", json!(1), "t");
        a.set("b", json!(2), "t");
        a.set("tmp.scratch", json!("whatever"), "t");

        let mut b = Context::new();
        b.set("b", json!(2), "t");
        b.set("a", json!(1), "t");
        b.set("tmp.scratch", json!("different"), "t");

        assert_eq!(a.fingerprint(None), b.fingerprint(None));
    }

    #[test]
    fn fingerprint_changes_with_visible_state() {
        let mut a = Context::new();
        a.set("a", json!(1), "t");
        let mut b = Context::new();
        b.set("a", json!(2), "t");
        assert_ne!(a.fingerprint(None), b.fingerprint(None));
    }

    proptest::proptest! {
        /// Any permutation of the same `(key, value)` pairs, minus whatever
        /// `tmp.*`/`private.*` noise we sprinkle in, fingerprints identically —
        /// the quantified invariant in spec.md §8.
        #[test]
        fn fingerprint_is_stable_under_key_permutation(
            pairs in proptest::collection::vec((1u32..50, 0i64..1000), 1..12),
        ) {
            let mut a = Context::new();
            let mut shuffled = pairs.clone();
            shuffled.reverse();

            for (k, v) in &pairs {
                a.set(format!("k{k}"), json!(v), "t");
            }
            let mut b = Context::new();
            for (k, v) in &shuffled {
                b.set(format!("k{k}"), json!(v), "t");
            }
            // distinct tmp./private. noise must not affect either fingerprint.
            a.set("tmp.noise", json!("a"), "t");
            b.set("tmp.noise", json!("b"), "t");
            b.set("private.secret", json!("ignored"), "t");

            proptest::prop_assert_eq!(a.fingerprint(None), b.fingerprint(None));
        }
    }
}
