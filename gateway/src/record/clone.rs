//! Shallow and cycle-safe deep cloning.

use std::collections::HashMap;

use super::value::Value;
use super::{Record, RecordInner};

impl Record {
    /// Shallow copy: a new, independent value table, but any nested
    /// `Record`/array-of-`Record` values keep pointing at the same
    /// underlying row (pointer sharing *within* `R` is preserved).
    pub fn clone_shallow(&self) -> Record {
        let inner = self.inner.read().unwrap();
        let values = inner
            .values
            .iter()
            .map(|(k, v)| (k.clone(), v.shallow_clone()))
            .collect();
        let new_inner = RecordInner {
            values,
            lower_index: inner.lower_index.clone(),
            order: inner.order.clone(),
        };
        Record {
            inner: std::sync::Arc::new(std::sync::RwLock::new(new_inner)),
        }
    }

    /// Recursively copies nested records, arrays and scalars. Cycle-safe:
    /// a source-address-keyed visited map ensures two references to the
    /// same source object end up as two references to the same clone,
    /// preserving the original sharing topology, and a cycle terminates
    /// instead of recursing forever.
    pub fn deep_clone(&self) -> Record {
        let mut visited = HashMap::new();
        self.deep_clone_visited(&mut visited)
    }

    pub(crate) fn deep_clone_visited(&self, visited: &mut HashMap<usize, Record>) -> Record {
        let id = self.identity();
        if let Some(existing) = visited.get(&id) {
            return existing.share();
        }

        let clone = Record::new();
        visited.insert(id, clone.share());

        let keys = self.keys();
        for key in keys {
            let value = self.get(&key);
            let cloned_value = deep_clone_value(&value, visited);
            clone.set_trusted(&key, cloned_value);
        }
        clone
    }
}

fn deep_clone_value(v: &Value, visited: &mut HashMap<usize, Record>) -> Value {
    match v {
        Value::Record(r) => Value::Record(r.deep_clone_visited(visited)),
        Value::Array(items) => Value::Array(items.iter().map(|i| deep_clone_value(i, visited)).collect()),
        other => other.shallow_clone(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn deep_clone_shares_no_mutable_substructure() {
        let r = Record::new();
        r.set("v", 1i64);
        let clone = r.deep_clone();
        r.set("v", 2i64);
        assert_eq!(clone.get_i64("v"), 1);
    }

    #[test]
    fn deep_clone_preserves_sharing_topology() {
        let shared_child = Record::new();
        shared_child.set("v", 1i64);

        let parent = Record::new();
        // both fields point at the SAME underlying row before cloning
        parent.set_trusted("a", shared_child.share());
        parent.set_trusted("b", shared_child.share());

        let cloned = parent.deep_clone();
        let a = cloned.get_record("a").unwrap();
        let b = cloned.get_record("b").unwrap();
        a.set("v", 99i64);
        // a and b must still be the same object after cloning
        assert_eq!(b.get_i64("v"), 99);
    }

    #[test]
    fn deep_clone_terminates_on_a_cycle() {
        let a = Record::new();
        let b = Record::new();
        let c = Record::new();
        let d = Record::new();
        let e = Record::new();

        a.set_trusted("next", b.share());
        b.set_trusted("next", c.share());
        c.set_trusted("next", d.share());
        d.set_trusted("next", e.share());
        e.set_trusted("next", a.share());

        let cloned = a.deep_clone();

        // walk 5 hops and expect to land back on the first clone
        let mut cur = cloned.share();
        let mut visited_ids = std::collections::HashSet::new();
        for _ in 0..5 {
            visited_ids.insert(cur.identity());
            cur = cur.get_record("next").unwrap();
        }
        assert_eq!(visited_ids.len(), 5);
        assert_eq!(cur.identity(), cloned.identity());
    }

    #[test]
    fn clone_shallow_preserves_nested_record_aliasing() {
        let child = Record::new();
        child.set("v", 1i64);
        let parent = Record::new();
        parent.set_trusted("child", child.share());

        let shallow = parent.clone_shallow();
        child.set("v", 2i64);
        // shallow clone aliases nested records, so the mutation is visible
        assert_eq!(shallow.get_record("child").unwrap().get_i64("v"), 2);
    }
}
