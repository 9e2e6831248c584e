//! C1: the dynamic, ordered, case-insensitive row container.

pub mod clone;
pub mod coerce;
pub mod json;
pub mod time_parse;
pub mod value;

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::NaiveDateTime;
use common::err::GatewayError;

pub use value::{IntoValue, Value};

#[derive(Default)]
pub(crate) struct RecordInner {
    /// original-case key -> value
    values: HashMap<String, Value>,
    /// case-folded key -> original-case key, so `set`/`get` are O(1)
    /// regardless of which casing the caller uses.
    lower_index: HashMap<String, String>,
    /// original-case keys, in insertion order; survives `remove`.
    order: Vec<String>,
}

/// A dynamic row/object. Cheap to hand around (it's a handle over shared,
/// lock-protected state) but deliberately NOT `Clone`: copying the handle
/// by value would alias the same mutable row under two names, which is
/// exactly the footgun §3 rules out. Use [`Record::clone_shallow`] or
/// [`Record::deep_clone`] to get an independent copy.
pub struct Record {
    inner: Arc<RwLock<RecordInner>>,
}

impl Record {
    pub fn new() -> Self {
        Record {
            inner: Arc::new(RwLock::new(RecordInner::default())),
        }
    }

    /// Aliases the same underlying row. Used internally wherever a nested
    /// `Record` value is handed out by reference (e.g. from `get`) rather
    /// than copied.
    pub(crate) fn share(&self) -> Record {
        Record {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Stable identity of the underlying allocation, used as the key for
    /// the deep-clone and JSON-serialization visited maps.
    pub(crate) fn identity(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }

    fn normalize(value: Value) -> Value {
        match value {
            Value::Record(r) => Value::Record(r.deep_clone()),
            Value::Array(items) => Value::Array(items.into_iter().map(Record::normalize).collect()),
            other => other,
        }
    }

    fn set_inner(&self, key: &str, value: Value) {
        let mut inner = self.inner.write().unwrap();
        let lower = key.to_ascii_lowercase();
        if let Some(existing) = inner.lower_index.get(&lower).cloned() {
            inner.values.insert(existing, value);
        } else {
            inner.lower_index.insert(lower, key.to_string());
            inner.order.push(key.to_string());
            inner.values.insert(key.to_string(), value);
        }
    }

    /// Public setter. Pointer-normalizes the input per §3: nested
    /// `Record`/array values are deep-copied so later mutation of the
    /// caller's variable can't leak into the stored row.
    pub fn set<V: IntoValue>(&self, key: &str, value: V) {
        self.set_inner(key, Self::normalize(value.into_value()));
    }

    /// Used by the row scanner: the driver just produced this value fresh,
    /// so it is trusted and stored verbatim without the normalization pass.
    pub fn set_trusted<V: IntoValue>(&self, key: &str, value: V) {
        self.set_inner(key, value.into_value());
    }

    pub fn get(&self, key: &str) -> Value {
        let inner = self.inner.read().unwrap();
        let lower = key.to_ascii_lowercase();
        match inner.lower_index.get(&lower) {
            Some(original) => inner
                .values
                .get(original)
                .map(Value::shallow_clone)
                .unwrap_or(Value::Null),
            None => Value::Null,
        }
    }

    pub fn has(&self, key: &str) -> bool {
        let inner = self.inner.read().unwrap();
        inner.lower_index.contains_key(&key.to_ascii_lowercase())
    }

    /// Removes `key`; preserves the relative order of the remaining keys.
    pub fn remove(&self, key: &str) -> bool {
        let mut inner = self.inner.write().unwrap();
        let lower = key.to_ascii_lowercase();
        match inner.lower_index.remove(&lower) {
            Some(original) => {
                inner.values.remove(&original);
                inner.order.retain(|k| k != &original);
                true
            }
            None => false,
        }
    }

    pub fn clear(&self) {
        let mut inner = self.inner.write().unwrap();
        inner.values.clear();
        inner.lower_index.clear();
        inner.order.clear();
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner.read().unwrap().order.clone()
    }

    pub fn size(&self) -> usize {
        self.inner.read().unwrap().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// `a.b.c` traverses nested records; fails on the first missing
    /// segment or the first segment that isn't a nested record.
    pub fn get_path(&self, path: &str) -> Result<Value, GatewayError> {
        let mut segments = path.split('.');
        let first = segments
            .next()
            .ok_or_else(|| GatewayError::PathNotFound(path.to_string()))?;

        let mut current = self.get(first);
        if matches!(current, Value::Null) && !self.has(first) {
            return Err(GatewayError::PathNotFound(path.to_string()));
        }

        for segment in segments {
            current = match current {
                Value::Record(ref r) => {
                    if !r.has(segment) {
                        return Err(GatewayError::PathNotFound(path.to_string()));
                    }
                    r.get(segment)
                }
                _ => return Err(GatewayError::PathNotFound(path.to_string())),
            };
        }
        Ok(current)
    }

    // -- typed getters, routed through the value coercion component --

    pub fn get_bool(&self, key: &str) -> bool {
        coerce::to_bool(&self.get(key))
    }
    pub fn get_bool_strict(&self, key: &str) -> Result<bool, GatewayError> {
        coerce::to_bool_strict(&self.get(key))
    }
    pub fn get_i64(&self, key: &str) -> i64 {
        coerce::to_i64(&self.get(key))
    }
    pub fn get_i64_strict(&self, key: &str) -> Result<i64, GatewayError> {
        coerce::to_i64_strict(&self.get(key))
    }
    pub fn get_u64(&self, key: &str) -> u64 {
        coerce::to_u64(&self.get(key))
    }
    pub fn get_u64_strict(&self, key: &str) -> Result<u64, GatewayError> {
        coerce::to_u64_strict(&self.get(key))
    }
    pub fn get_f64(&self, key: &str) -> f64 {
        coerce::to_f64(&self.get(key))
    }
    pub fn get_f64_strict(&self, key: &str) -> Result<f64, GatewayError> {
        coerce::to_f64_strict(&self.get(key))
    }
    pub fn get_string(&self, key: &str) -> String {
        coerce::to_string_val(&self.get(key))
    }
    pub fn get_string_strict(&self, key: &str) -> Result<String, GatewayError> {
        coerce::to_string_strict(&self.get(key))
    }
    pub fn get_bytes(&self, key: &str) -> Vec<u8> {
        coerce::to_bytes(&self.get(key))
    }
    pub fn get_bytes_strict(&self, key: &str) -> Result<Vec<u8>, GatewayError> {
        coerce::to_bytes_strict(&self.get(key))
    }
    pub fn get_time_strict(&self, key: &str) -> Result<NaiveDateTime, GatewayError> {
        coerce::to_time_strict(&self.get(key))
    }
    pub fn get_array(&self, key: &str) -> Vec<Value> {
        coerce::to_array(&self.get(key))
    }
    pub fn get_record(&self, key: &str) -> Option<Record> {
        match self.get(key) {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }
}

impl Default for Record {
    fn default() -> Self {
        Record::new()
    }
}

impl std::fmt::Debug for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read().unwrap();
        let mut debug = f.debug_struct("Record");
        for key in inner.order.iter() {
            if let Some(v) = inner.values.get(key) {
                debug.field(key, &v.kind());
            }
        }
        debug.finish()
    }
}
