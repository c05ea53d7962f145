//! JSON merge helper for layered configuration.

use serde_json::Value;

/// Merge overlay values into the base, recursively overriding objects.
///
/// Non-object values (including arrays and `null`) replace the base value.
pub(super) fn merge_json_values(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(existing) => merge_json_values(existing, value),
                    None => {
                        base_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (base_slot, overlay_value) => {
            *base_slot = overlay_value.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::merge_json_values;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn nested_objects_merge_and_scalars_replace() {
        let mut base = json!({ "waiter": { "poll_interval_ms": 50, "timeout_ms": 2000 } });
        merge_json_values(&mut base, &json!({ "waiter": { "timeout_ms": 500 } }));
        assert_eq!(
            base,
            json!({ "waiter": { "poll_interval_ms": 50, "timeout_ms": 500 } })
        );
    }

    #[test]
    fn null_overlay_clears_value() {
        let mut base = json!({ "sessions": { "max_age_ms": 1000 } });
        merge_json_values(&mut base, &json!({ "sessions": { "max_age_ms": null } }));
        assert_eq!(base, json!({ "sessions": { "max_age_ms": null } }));
    }
}
