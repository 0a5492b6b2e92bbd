//! Best-effort normalization of untrusted model output.
//!
//! The model promises the response contract but does not always keep it.
//! This pass coerces an arbitrary decoded JSON value into a structurally
//! complete candidate: missing pieces get safe defaults, wrong-typed pieces
//! degrade instead of failing. It never errors; rejection is the
//! validator's job. One deliberate exception to blanket defaulting: a
//! present-but-invalid `type` is kept as-is so the validator can flag it
//! rather than silently reclassifying the item.

use serde_json::{json, Map, Value};

const VALID_PRIORITIES: [&str; 3] = ["HIGH", "MEDIUM", "LOW"];
const VALID_TARGET_TYPES: [&str; 3] = ["TASK", "SCHEDULE", "LOG"];

/// Coerce the raw decoded value into the candidate shape the validator
/// expects. Total: any input produces an object with `reply`, `actions`,
/// `commands`.
pub fn normalize_response(raw: Value) -> Value {
    let obj = match raw {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    let reply = obj
        .get("reply")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let actions: Vec<Value> = match obj.get("actions") {
        Some(Value::Array(items)) => items.iter().map(normalize_action_item).collect(),
        _ => Vec::new(),
    };

    let commands: Vec<Value> = match obj.get("commands") {
        Some(Value::Array(items)) => items.iter().map(normalize_command).collect(),
        _ => Vec::new(),
    };

    json!({
        "reply": reply,
        "actions": actions,
        "commands": commands,
    })
}

/// Loose truthiness for the `type` field: null, false, and the empty string
/// fall back to the default; any other present value survives to validation.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

fn string_tags(value: &Value) -> Option<Vec<String>> {
    value.as_array().map(|items| {
        items
            .iter()
            .filter_map(|t| t.as_str().map(str::to_string))
            .collect()
    })
}

fn valid_priority(value: &Value) -> Option<&str> {
    value
        .as_str()
        .filter(|s| VALID_PRIORITIES.contains(s))
}

fn normalize_action_item(item: &Value) -> Value {
    let Some(obj) = item.as_object() else {
        return json!({ "type": "LOG", "title": "", "tags": [], "priority": "MEDIUM" });
    };

    let mut out = Map::new();
    out.insert(
        "type".to_string(),
        match obj.get("type") {
            Some(v) if is_truthy(v) => v.clone(),
            _ => json!("LOG"),
        },
    );
    out.insert(
        "title".to_string(),
        json!(obj.get("title").and_then(Value::as_str).unwrap_or_default()),
    );
    if let Some(date) = obj.get("date").and_then(Value::as_str) {
        out.insert("date".to_string(), json!(date));
    }
    out.insert(
        "tags".to_string(),
        json!(obj.get("tags").and_then(string_tags).unwrap_or_default()),
    );
    out.insert(
        "priority".to_string(),
        json!(obj
            .get("priority")
            .and_then(valid_priority)
            .unwrap_or("MEDIUM")),
    );
    Value::Object(out)
}

/// `newData` keeps only the fields the model explicitly sent, each coerced
/// with the action-item rules. Absent fields stay absent so the mutation
/// executor knows what the user meant to change; present-but-wrong-typed
/// fields are dropped rather than defaulted, since a fabricated default
/// here would overwrite data the user never mentioned.
fn normalize_partial_action_item(item: &Value) -> Value {
    let Some(obj) = item.as_object() else {
        return json!({});
    };

    let mut out = Map::new();
    if let Some(kind) = obj.get("type").filter(|v| is_truthy(v)) {
        out.insert("type".to_string(), kind.clone());
    }
    if let Some(title) = obj.get("title").and_then(Value::as_str) {
        out.insert("title".to_string(), json!(title));
    }
    if let Some(date) = obj.get("date").and_then(Value::as_str) {
        out.insert("date".to_string(), json!(date));
    }
    if let Some(tags) = obj.get("tags").and_then(string_tags) {
        out.insert("tags".to_string(), json!(tags));
    }
    if let Some(priority) = obj.get("priority").and_then(valid_priority) {
        out.insert("priority".to_string(), json!(priority));
    }
    Value::Object(out)
}

fn normalize_command(command: &Value) -> Value {
    let Some(obj) = command.as_object() else {
        return json!({ "type": "DELETE", "targetType": "TASK", "targetTitle": "" });
    };

    let mut out = Map::new();
    let kind = if obj.get("type").and_then(Value::as_str) == Some("EDIT") {
        "EDIT"
    } else {
        "DELETE"
    };
    out.insert("type".to_string(), json!(kind));

    let target_type = obj
        .get("targetType")
        .and_then(Value::as_str)
        .filter(|s| VALID_TARGET_TYPES.contains(s))
        .unwrap_or("TASK");
    out.insert("targetType".to_string(), json!(target_type));

    out.insert(
        "targetTitle".to_string(),
        json!(obj
            .get("targetTitle")
            .and_then(Value::as_str)
            .unwrap_or_default()),
    );

    if let Some(new_data) = obj.get("newData") {
        if !new_data.is_null() {
            out.insert(
                "newData".to_string(),
                normalize_partial_action_item(new_data),
            );
        }
    }
    Value::Object(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_object_input_becomes_empty_response() {
        for raw in [json!(null), json!("text"), json!(42), json!([1, 2])] {
            let normalized = normalize_response(raw);
            assert_eq!(normalized["reply"], "");
            assert_eq!(normalized["actions"], json!([]));
            assert_eq!(normalized["commands"], json!([]));
        }
    }

    #[test]
    fn missing_and_wrong_typed_top_level_fields_get_defaults() {
        let normalized = normalize_response(json!({
            "reply": 7,
            "actions": "nope",
            "commands": { "x": 1 },
        }));
        assert_eq!(normalized["reply"], "");
        assert_eq!(normalized["actions"], json!([]));
        assert_eq!(normalized["commands"], json!([]));
    }

    #[test]
    fn non_object_action_element_becomes_default_log() {
        let normalized = normalize_response(json!({ "actions": ["oops"] }));
        assert_eq!(
            normalized["actions"][0],
            json!({ "type": "LOG", "title": "", "tags": [], "priority": "MEDIUM" })
        );
    }

    #[test]
    fn action_fields_are_coerced_independently() {
        let normalized = normalize_response(json!({
            "actions": [{
                "title": 123,
                "date": 20240115,
                "tags": ["a", 1, null, "b"],
                "priority": "URGENT",
            }]
        }));
        let action = &normalized["actions"][0];
        assert_eq!(action["type"], "LOG");
        assert_eq!(action["title"], "");
        assert!(action.get("date").is_none());
        assert_eq!(action["tags"], json!(["a", "b"]));
        assert_eq!(action["priority"], "MEDIUM");
    }

    #[test]
    fn priority_is_always_one_of_the_three_literals() {
        for bad in [json!("urgent"), json!(1), json!(null), json!(["HIGH"])] {
            let normalized = normalize_response(json!({ "actions": [{ "priority": bad }] }));
            let p = normalized["actions"][0]["priority"].as_str().unwrap();
            assert!(["HIGH", "MEDIUM", "LOW"].contains(&p));
        }
        let kept = normalize_response(json!({ "actions": [{ "priority": "LOW" }] }));
        assert_eq!(kept["actions"][0]["priority"], "LOW");
    }

    #[test]
    fn invalid_present_type_survives_for_the_validator() {
        let normalized = normalize_response(json!({ "actions": [{ "type": 5 }] }));
        assert_eq!(normalized["actions"][0]["type"], 5);
    }

    #[test]
    fn command_defaults_apply() {
        let normalized = normalize_response(json!({ "commands": [42] }));
        assert_eq!(
            normalized["commands"][0],
            json!({ "type": "DELETE", "targetType": "TASK", "targetTitle": "" })
        );

        let normalized = normalize_response(json!({
            "commands": [{ "type": "RENAME", "targetType": "NOTE", "targetTitle": 9 }]
        }));
        let cmd = &normalized["commands"][0];
        assert_eq!(cmd["type"], "DELETE");
        assert_eq!(cmd["targetType"], "TASK");
        assert_eq!(cmd["targetTitle"], "");
    }

    #[test]
    fn edit_command_type_is_preserved() {
        let normalized = normalize_response(json!({
            "commands": [{ "type": "EDIT", "targetType": "SCHEDULE", "targetTitle": "会議" }]
        }));
        let cmd = &normalized["commands"][0];
        assert_eq!(cmd["type"], "EDIT");
        assert_eq!(cmd["targetType"], "SCHEDULE");
    }

    #[test]
    fn new_data_keeps_only_explicitly_present_fields() {
        let normalized = normalize_response(json!({
            "commands": [{
                "type": "EDIT",
                "targetType": "SCHEDULE",
                "targetTitle": "会議",
                "newData": { "date": "2024-01-15T15:00:00" },
            }]
        }));
        let new_data = &normalized["commands"][0]["newData"];
        assert_eq!(new_data["date"], "2024-01-15T15:00:00");
        assert!(new_data.get("title").is_none());
        assert!(new_data.get("tags").is_none());
        assert!(new_data.get("priority").is_none());
    }

    #[test]
    fn new_data_drops_wrong_typed_fields_instead_of_defaulting() {
        let normalized = normalize_response(json!({
            "commands": [{
                "type": "EDIT",
                "targetType": "TASK",
                "targetTitle": "t",
                "newData": { "title": 5, "tags": "nope", "priority": "URGENT" },
            }]
        }));
        let new_data = &normalized["commands"][0]["newData"];
        assert_eq!(new_data, &json!({}));
    }

    #[test]
    fn null_new_data_is_omitted() {
        let normalized = normalize_response(json!({
            "commands": [{ "type": "DELETE", "targetType": "TASK", "targetTitle": "t", "newData": null }]
        }));
        assert!(normalized["commands"][0].get("newData").is_none());
    }
}
