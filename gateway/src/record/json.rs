//! Insertion-ordered JSON codec with cycle detection.
//!
//! Requires `serde_json`'s `preserve_order` feature — without it
//! `serde_json::Map` is a `BTreeMap` and insertion order would be lost on
//! the very first re-serialization.

use std::collections::HashMap;

use common::err::GatewayError;
use serde_json::{Map, Value as JsonValue};

use super::value::Value;
use super::Record;

const MAX_DEPTH: usize = 100;

impl Record {
    pub fn to_json(&self) -> JsonValue {
        let mut visited = HashMap::new();
        self.to_json_visited(&mut visited, 0)
    }

    fn to_json_visited(&self, visited: &mut HashMap<usize, ()>, depth: usize) -> JsonValue {
        if depth > MAX_DEPTH {
            return serde_json::json!({ "__depth_exceeded__": true });
        }
        let id = self.identity();
        if visited.contains_key(&id) {
            return serde_json::json!({ "__cycle__": true });
        }
        visited.insert(id, ());

        let mut map = Map::new();
        for key in self.keys() {
            let v = self.get(&key);
            map.insert(key, value_to_json(&v, visited, depth + 1));
        }

        visited.remove(&id);
        JsonValue::Object(map)
    }

    /// Parses a JSON object into a `Record`. Arrays of objects are
    /// promoted to arrays of `Record`s; any other array stays an array of
    /// scalars/arrays. Fails with `DepthExceeded` past 100 levels of
    /// nesting instead of blowing the stack.
    pub fn from_json(json: &JsonValue) -> Result<Record, GatewayError> {
        Self::from_json_depth(json, 0)
    }

    fn from_json_depth(json: &JsonValue, depth: usize) -> Result<Record, GatewayError> {
        if depth > MAX_DEPTH {
            return Err(GatewayError::DepthExceeded);
        }
        match json {
            JsonValue::Object(map) => {
                let record = Record::new();
                for (k, v) in map {
                    let value = json_to_value(v, depth + 1)?;
                    record.set_trusted(k, value);
                }
                Ok(record)
            }
            _ => Err(GatewayError::invalid_argument("from_json expects a JSON object")),
        }
    }
}

fn value_to_json(v: &Value, visited: &mut HashMap<usize, ()>, depth: usize) -> JsonValue {
    if depth > MAX_DEPTH {
        return serde_json::json!({ "__depth_exceeded__": true });
    }
    match v {
        Value::Null => JsonValue::Null,
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::I64(i) => JsonValue::from(*i),
        Value::U64(u) => JsonValue::from(*u),
        Value::F64(f) => serde_json::Number::from_f64(*f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        Value::Str(s) => JsonValue::String(s.clone()),
        Value::Bytes(b) => JsonValue::String(hex_encode(b)),
        Value::Time(t) => JsonValue::String(t.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
        Value::Array(items) => {
            JsonValue::Array(items.iter().map(|i| value_to_json(i, visited, depth + 1)).collect())
        }
        Value::Record(r) => r.to_json_visited(visited, depth),
        Value::Opaque(j) => j.clone(),
    }
}

fn json_to_value(v: &JsonValue, depth: usize) -> Result<Value, GatewayError> {
    if depth > MAX_DEPTH {
        return Err(GatewayError::DepthExceeded);
    }
    Ok(match v {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::I64(i)
            } else if let Some(u) = n.as_u64() {
                Value::U64(u)
            } else {
                Value::F64(n.as_f64().unwrap_or(0.0))
            }
        }
        JsonValue::String(s) => Value::Str(s.clone()),
        JsonValue::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                if item.is_object() {
                    out.push(Value::Record(Record::from_json_depth(item, depth + 1)?));
                } else {
                    out.push(json_to_value(item, depth + 1)?);
                }
            }
            Value::Array(out)
        }
        JsonValue::Object(_) => Value::Record(Record::from_json_depth(v, depth + 1)?),
    })
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn case_preserving_roundtrip() {
        let r = Record::new();
        r.set("Name", "A");
        r.set("name", "B");
        assert_eq!(r.to_json().to_string(), r#"{"Name":"B"}"#);
    }

    #[test]
    fn scalar_roundtrip() {
        let r = Record::new();
        r.set("a", 1i64);
        r.set("b", true);
        r.set("c", "s");
        r.set("d", Value::Null);
        let json = r.to_json();
        let back = Record::from_json(&json).unwrap();
        assert_eq!(back.get_i64("a"), 1);
        assert!(back.get_bool("b"));
        assert_eq!(back.get_string("c"), "s");
        assert!(matches!(back.get("d"), Value::Null));
        assert_eq!(back.keys(), r.keys());
    }

    #[test]
    fn nested_record_roundtrip_preserves_key_order() {
        let r = Record::new();
        let nested = Record::new();
        nested.set("x", 1i64);
        nested.set("y", 2i64);
        r.set("child", nested);
        let json = r.to_json();
        let back = Record::from_json(&json).unwrap();
        assert_eq!(back.get_record("child").unwrap().keys(), vec!["x", "y"]);
    }

    #[test]
    fn array_of_objects_is_promoted_to_records() {
        let json = serde_json::json!({
            "items": [{"id": 1}, {"id": 2}]
        });
        let r = Record::from_json(&json).unwrap();
        let items = r.get_array("items");
        assert_eq!(items.len(), 2);
        assert!(matches!(items[0], Value::Record(_)));
    }

    #[test]
    fn cycle_emits_sentinel_instead_of_looping_forever() {
        let a = Record::new();
        let b = Record::new();
        a.set_trusted("next", b.share());
        b.set_trusted("next", a.share());

        let json = a.to_json();
        // must terminate and must mark the cycle somewhere in the tree
        assert!(json.to_string().contains("__cycle__"));
    }

    #[test]
    fn from_json_rejects_non_object_top_level() {
        assert!(Record::from_json(&serde_json::json!([1, 2, 3])).is_err());
    }
}
