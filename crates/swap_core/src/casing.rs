//! Key renaming between the backend's snake_case and the client's camelCase.
//!
//! Only object keys are rewritten; values are left untouched. An underscore
//! is folded only when followed by a lowercase ASCII letter, and leading
//! underscores (`_id`) are kept, so keys produced by one direction convert
//! back unchanged with the other.

use serde_json::{Map, Value};

pub fn to_camel_case(key: &str) -> String {
    let body = key.trim_start_matches('_');
    let mut out = String::with_capacity(key.len());
    out.push_str(&key[..key.len() - body.len()]);

    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        match (c, chars.peek()) {
            ('_', Some(next)) if next.is_ascii_lowercase() => {
                out.push(next.to_ascii_uppercase());
                chars.next();
            }
            _ => out.push(c),
        }
    }
    out
}

pub fn to_snake_case(key: &str) -> String {
    let body = key.trim_start_matches('_');
    let mut out = String::with_capacity(key.len() + 4);
    out.push_str(&key[..key.len() - body.len()]);

    for c in body.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Recursively rename every object key from snake_case to camelCase.
pub fn keys_to_camel(value: Value) -> Value {
    rename_keys(value, &to_camel_case)
}

/// Recursively rename every object key from camelCase to snake_case.
pub fn keys_to_snake(value: Value) -> Value {
    rename_keys(value, &to_snake_case)
}

fn rename_keys(value: Value, rename: &dyn Fn(&str) -> String) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, inner)| (rename(&key), rename_keys(inner, rename)))
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| rename_keys(item, rename))
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_conversion() {
        assert_eq!(to_camel_case("slot_stats"), "slotStats");
        assert_eq!(to_camel_case("is_always_empty"), "isAlwaysEmpty");
        assert_eq!(to_camel_case("_id"), "_id");
        assert_eq!(to_camel_case("id"), "id");
        assert_eq!(to_camel_case("battery_2"), "battery_2");
        assert_eq!(to_snake_case("slotStats"), "slot_stats");
        assert_eq!(to_snake_case("isAlwaysEmpty"), "is_always_empty");
        assert_eq!(to_snake_case("_id"), "_id");
        assert_eq!(to_snake_case("battery_2"), "battery_2");
    }

    #[test]
    /// Unusual underscore placements survive a round trip unchanged
    fn test_edge_keys_round_trip() {
        for key in ["a__b", "k_1_a", "x_", "__a_b__", "_", "a_b_c"] {
            let camel = to_camel_case(key);
            assert_eq!(to_snake_case(&camel), key, "{key} -> {camel}");
        }
        assert_eq!(to_camel_case("a__b"), "a_B");
        assert_eq!(to_camel_case("k_1_a"), "k_1A");
        assert_eq!(to_camel_case("x_"), "x_");
        assert_eq!(to_camel_case("__a_b__"), "__aB__");

        let value = json!({"a__b": {"k_1_a": [{"x_": 1}]}, "__a_b__": null});
        assert_eq!(keys_to_snake(keys_to_camel(value.clone())), value);
    }

    #[test]
    fn test_values_are_untouched() {
        let value = json!({"slot_code": "slot_code_A", "tags": ["snake_case", 1, null]});
        let camel = keys_to_camel(value);
        assert_eq!(
            camel,
            json!({"slotCode": "slot_code_A", "tags": ["snake_case", 1, null]})
        );
    }

    #[test]
    fn test_nested_round_trip() {
        let original = json!({
            "pillar": {
                "_id": "PILLAR-1",
                "pillar_code": "P1",
                "slot_stats": {"total": 10, "occupied": 6, "empty": 2, "reserved": 2},
                "station": {"id": "ST-1", "name": "Depot", "address": null}
            },
            "grid_layout": {"rows": 2, "columns": 5, "total_slots": 10},
            "slots_list": [
                {"slot_number": 1, "is_always_empty": true, "last_activity": {"user_id": "U-7"}},
                {"slot_number": 2, "battery": {"serial_number": "SN-1", "current_pillar": "PILLAR-1"}}
            ],
            "grid": [[{"slot_code": "A1"}], []]
        });

        let camel = keys_to_camel(original.clone());
        assert_eq!(camel["gridLayout"]["totalSlots"], 10);
        assert_eq!(camel["slotsList"][0]["lastActivity"]["userId"], "U-7");
        assert_eq!(camel["slotsList"][1]["battery"]["serialNumber"], "SN-1");
        assert_eq!(camel["pillar"]["_id"], "PILLAR-1");

        assert_eq!(keys_to_snake(camel), original);
    }
}
