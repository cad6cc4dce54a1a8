//! Merge policy application, invoked per key from [`super::Context::apply_patch`].

use super::patch::MergePolicy;
use crate::error::{GraphError, Result};
use serde_json::Value;

/// Resolve `existing` (if any) against `incoming` under `policy`.
pub fn apply_policy(key: &str, policy: MergePolicy, existing: Option<Value>, incoming: Value) -> Result<Value> {
    match policy {
        MergePolicy::LastWriteWins => Ok(incoming),
        MergePolicy::FirstWriteWins => match existing {
            Some(v) if !v.is_null() => Ok(v),
            _ => Ok(incoming),
        },
        MergePolicy::AppendList => match (existing, &incoming) {
            (Some(Value::Array(mut base)), Value::Array(add)) => {
                base.extend(add.iter().cloned());
                Ok(Value::Array(base))
            }
            (None, Value::Array(_)) => Ok(incoming),
            _ => Err(GraphError::ContextConflict(format!(
                "append_list expects list for key '{key}'"
            ))),
        },
        MergePolicy::MergeDict => match (existing, &incoming) {
            (Some(Value::Object(mut base)), Value::Object(add)) => {
                for (k, v) in add {
                    base.insert(k.clone(), v.clone());
                }
                Ok(Value::Object(base))
            }
            (None, Value::Object(_)) => Ok(incoming),
            _ => Err(GraphError::ContextConflict(format!(
                "merge_dict expects dicts for key '{key}'"
            ))),
        },
        MergePolicy::Reduce => Err(GraphError::ContextConflict(format!(
            "reducer not registered for key '{key}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::any;
    use serde_json::json;

    #[test]
    fn append_list_concatenates_element_wise() {
        let existing = Some(json!([1, 2]));
        let incoming = json!([3, 4]);
        let result = apply_policy("k", MergePolicy::AppendList, existing, incoming).unwrap();
        assert_eq!(result, json!([1, 2, 3, 4]));
    }

    #[test]
    fn append_list_rejects_non_list() {
        let existing = Some(json!("not a list"));
        let incoming = json!([1]);
        assert!(apply_policy("k", MergePolicy::AppendList, existing, incoming).is_err());
    }

    #[test]
    fn merge_dict_is_right_biased() {
        let existing = Some(json!({"a": 1, "b": 2}));
        let incoming = json!({"b": 3, "c": 4});
        let result = apply_policy("k", MergePolicy::MergeDict, existing, incoming).unwrap();
        assert_eq!(result, json!({"a": 1, "b": 3, "c": 4}));
    }

    #[test]
    fn first_write_wins_keeps_existing_non_null() {
        let existing = Some(json!("first"));
        let incoming = json!("second");
        let result = apply_policy("k", MergePolicy::FirstWriteWins, existing, incoming).unwrap();
        assert_eq!(result, json!("first"));
    }

    #[test]
    fn first_write_wins_treats_null_as_absent() {
        let existing = Some(Value::Null);
        let incoming = json!("second");
        let result = apply_policy("k", MergePolicy::FirstWriteWins, existing, incoming).unwrap();
        assert_eq!(result, json!("second"));
    }

    #[test]
    fn reduce_without_registration_fails() {
        assert!(apply_policy("k", MergePolicy::Reduce, None, json!(1)).is_err());
    }

    proptest::proptest! {
        /// `append_list` always equals `existing ++ incoming` element-wise,
        /// for any two integer lists — spec.md §8's quantified invariant.
        #[test]
        fn append_list_concatenates_for_any_two_lists(
            existing in proptest::collection::vec(any::<i64>(), 0..20),
            incoming in proptest::collection::vec(any::<i64>(), 0..20),
        ) {
            let existing_json = Value::Array(existing.iter().map(|n| json!(n)).collect());
            let incoming_json = Value::Array(incoming.iter().map(|n| json!(n)).collect());
            let result = apply_policy("k", MergePolicy::AppendList, Some(existing_json), incoming_json).unwrap();

            let mut expected: Vec<i64> = existing.clone();
            expected.extend(incoming.iter().copied());
            let expected_json = Value::Array(expected.iter().map(|n| json!(n)).collect());
            proptest::prop_assert_eq!(result, expected_json);
        }
    }
}
