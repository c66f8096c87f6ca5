/// Merge a JSON patch into a base value.
///
/// For each key in `patch`:
/// - If the value is `null`, the key is removed from `base`.
/// - Otherwise, the key is set to the patch value.
///
/// This follows RFC 7386 (JSON Merge Patch) semantics.
pub fn merge_patch(
    base: &mut serde_json::Value,
    patch: &serde_json::Value,
) {
    if let (Some(base_obj), Some(patch_obj)) = (base.as_object_mut(), patch.as_object()) {
        for (key, value) in patch_obj {
            if value.is_null() {
                base_obj.remove(key);
            } else if value.is_object() {
                // Recursively merge nested objects.
                let entry = base_obj
                    .entry(key.clone())
                    .or_insert_with(|| serde_json::Value::Object(serde_json::Map::new()));
                merge_patch(entry, value);
            } else {
                base_obj.insert(key.clone(), value.clone());
            }
        }
    } else {
        *base = patch.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_patch() {
        let mut base = serde_json::json!({"name": "Alien", "duration": 117, "mpa": {"id": 4}});
        let patch = serde_json::json!({"duration": null, "mpa": {"id": 5}, "description": "space"});
        merge_patch(&mut base, &patch);
        assert_eq!(
            base,
            serde_json::json!({"name": "Alien", "mpa": {"id": 5}, "description": "space"})
        );
    }

    #[test]
    fn test_merge_patch_replaces_arrays() {
        let mut base = serde_json::json!({"genres": [1, 2, 3]});
        merge_patch(&mut base, &serde_json::json!({"genres": [2]}));
        assert_eq!(base, serde_json::json!({"genres": [2]}));
    }
}
