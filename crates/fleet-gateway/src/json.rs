//! Wire-format boundary: every domain type in this workspace serializes
//! with `snake_case` field names (no `rename_all` on the types themselves),
//! but the HTTP edge requires camelCase JSON. Rather than layer
//! a hand-written DTO over every response shape, [`CamelJson`] performs the
//! rename once, generically, by walking the already-serialized
//! [`serde_json::Value`] and recasing every object key.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

pub struct CamelJson<T>(pub T);

impl<T: Serialize> IntoResponse for CamelJson<T> {
    fn into_response(self) -> Response {
        match serde_json::to_value(&self.0) {
            Ok(value) => Json(to_camel_case(value)).into_response(),
            Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
        }
    }
}

/// Recursively renames every object key from `snake_case` to `camelCase`.
/// Array elements and scalar values are left untouched; map keys that are
/// already camelCase (no underscore) round-trip unchanged.
fn to_camel_case(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, v) in map {
                out.insert(snake_to_camel(&key), to_camel_case(v));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(to_camel_case).collect()),
        other => other,
    }
}

fn snake_to_camel(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper_next = false;
    for c in key.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn renames_nested_object_keys() {
        let input = json!({"query_id": "q1", "nested": {"model_id": "m1", "tier": "fast"}});
        let output = to_camel_case(input);
        assert_eq!(output["queryId"], "q1");
        assert_eq!(output["nested"]["modelId"], "m1");
        assert_eq!(output["nested"]["tier"], "fast");
    }

    #[test]
    fn renames_keys_inside_arrays() {
        let input = json!({"items": [{"model_id": "a"}, {"model_id": "b"}]});
        let output = to_camel_case(input);
        assert_eq!(output["items"][0]["modelId"], "a");
        assert_eq!(output["items"][1]["modelId"], "b");
    }

    #[test]
    fn leaves_already_camel_keys_alone() {
        assert_eq!(snake_to_camel("tier"), "tier");
        assert_eq!(snake_to_camel("scanPath"), "scanPath");
    }
}
