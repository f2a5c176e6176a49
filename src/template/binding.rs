//! Template binding - the state a template host owns.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::engine::{DataSource, Descriptor, TemplateSpec};
use crate::types::NodeId;

/// Where a host's duplicates are attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Attach {
    /// Duplicates become children of the host (lists).
    #[default]
    Host,
    /// Duplicates become siblings of the host (template pages).
    HostParent,
}

/// Template state of a host node.
///
/// `duplicate_ids` and `data_rows` are index-aligned: the duplicate at
/// position `k` was built from the row at position `k`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateBinding {
    /// Row container descriptor, cloned once per data row.
    pub row: Descriptor,
    /// Registered abstract sub-objects duplicated into every row container.
    pub abstract_ids: Vec<NodeId>,
    /// Sub-object descriptors, registered as abstract nodes on creation.
    pub objects: Vec<Descriptor>,
    pub data_rows: Vec<Value>,
    pub duplicate_ids: Vec<NodeId>,
    /// Row container identity → source data row.
    pub row_to_duplicate: HashMap<NodeId, Value>,
    pub source: Option<DataSource>,
    /// A remote load completed at least once.
    pub loaded: bool,
    /// Query of the last completed load.
    pub last_query: Option<Value>,
    /// Query of the request currently in flight.
    pub in_flight: Option<Value>,
    /// Bumped by every issued request; responses from older generations are dropped.
    pub generation: u64,
    pub attach: Attach,
}

impl TemplateBinding {
    pub fn from_spec(spec: &TemplateSpec, attach: Attach) -> Self {
        Self {
            row: spec.row.clone(),
            objects: spec.objects.clone(),
            source: spec.source.clone(),
            attach,
            ..Default::default()
        }
    }

    /// Data row a duplicate was built from.
    pub fn row_for(&self, duplicate: &str) -> Option<&Value> {
        self.row_to_duplicate.get(duplicate)
    }

    /// True when every duplicate maps back to the row at its own position.
    pub fn is_aligned(&self) -> bool {
        self.duplicate_ids.len() == self.data_rows.len()
            && self
                .duplicate_ids
                .iter()
                .zip(&self.data_rows)
                .all(|(id, row)| self.row_to_duplicate.get(id) == Some(row))
    }

    pub(crate) fn clear_duplicates(&mut self) -> Vec<NodeId> {
        self.data_rows.clear();
        self.row_to_duplicate.clear();
        std::mem::take(&mut self.duplicate_ids)
    }

    /// Drop duplicates that left the registry, keeping the rest aligned.
    ///
    /// The last completed load no longer describes the host once one of its
    /// duplicates is gone, so the next load with the same query goes out
    /// again. Returns true if anything was dropped.
    pub(crate) fn forget_duplicates(&mut self, gone: &HashSet<NodeId>) -> bool {
        if !self.duplicate_ids.iter().any(|id| gone.contains(id)) {
            return false;
        }
        let rows = std::mem::take(&mut self.data_rows);
        let (ids, rows): (Vec<NodeId>, Vec<Value>) = std::mem::take(&mut self.duplicate_ids)
            .into_iter()
            .zip(rows)
            .filter(|(id, _)| !gone.contains(id))
            .unzip();
        self.duplicate_ids = ids;
        self.data_rows = rows;
        self.row_to_duplicate.retain(|id, _| !gone.contains(id));
        self.loaded = false;
        self.last_query = None;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_alignment() {
        let mut binding = TemplateBinding::default();
        for (id, row) in [("a", json!({"n": 1})), ("b", json!({"n": 2}))] {
            binding.duplicate_ids.push(id.into());
            binding.data_rows.push(row.clone());
            binding.row_to_duplicate.insert(id.into(), row);
        }
        assert!(binding.is_aligned());
        assert_eq!(binding.row_for("b"), Some(&json!({"n": 2})));

        binding.data_rows.swap(0, 1);
        assert!(!binding.is_aligned());

        let cleared = binding.clear_duplicates();
        assert_eq!(cleared, ["a", "b"]);
        assert!(binding.is_aligned());
    }

    #[test]
    fn test_forget_duplicates_keeps_alignment() {
        let mut binding = TemplateBinding {
            loaded: true,
            last_query: Some(json!({"q": 1})),
            ..Default::default()
        };
        for (id, row) in [("a", json!({"n": 1})), ("b", json!({"n": 2})), ("c", json!({"n": 3}))] {
            binding.duplicate_ids.push(id.into());
            binding.data_rows.push(row.clone());
            binding.row_to_duplicate.insert(id.into(), row);
        }

        let unrelated: HashSet<NodeId> = ["x".to_string()].into();
        assert!(!binding.forget_duplicates(&unrelated));
        assert!(binding.loaded);

        let gone: HashSet<NodeId> = ["b".to_string()].into();
        assert!(binding.forget_duplicates(&gone));
        assert_eq!(binding.duplicate_ids, ["a", "c"]);
        assert_eq!(binding.data_rows, [json!({"n": 1}), json!({"n": 3})]);
        assert!(binding.row_for("b").is_none());
        assert!(binding.is_aligned());
        assert!(!binding.loaded);
        assert_eq!(binding.last_query, None);
    }
}
