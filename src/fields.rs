use serde_json::Value;

/// Walks a dotted path (e.g. "departments.0.name") through a JSON value.
/// String segments index objects, numeric segments index arrays. Any step
/// that cannot be taken resolves to an empty string rather than an error,
/// so a source with a slightly different shape degrades to blank fields
/// instead of failing the whole batch.
pub fn resolve(data: &Value, path: &str) -> String {
    if path.is_empty() {
        return String::new();
    }

    let mut current = data;
    for key in path.split('.') {
        current = match current {
            Value::Object(map) => match map.get(key) {
                Some(value) => value,
                None => return String::new(),
            },
            Value::Array(items) => {
                match key.parse::<usize>().ok().and_then(|idx| items.get(idx)) {
                    Some(value) => value,
                    None => return String::new(),
                }
            }
            _ => return String::new(),
        };
    }

    scalar_to_string(current)
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        // A path ending on an object/array is a misconfigured field path;
        // treat it the same as absent.
        Value::Null | Value::Object(_) | Value::Array(_) => String::new(),
    }
}
