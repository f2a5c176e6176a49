//! Template Engine - data-driven duplication of abstract subtrees.
//!
//! A template host owns a [`TemplateBinding`]: a row-container descriptor,
//! abstract sub-objects, and the index-aligned `data_rows` / `duplicate_ids`
//! pair tracking what has been materialized from which row.
//!
//! - [`duplicate_with_data`] - expand rows into duplicates (append or reset)
//! - [`reset`] - drop every duplicate of a host
//! - [`load`] - fetch rows from the host's data source first
//! - [`row_for`] - reverse lookup from a duplicate to its data row
//!
//! # Pattern: Hosts and Attach Points
//!
//! List templates attach their rows under the host itself. Template pages
//! attach each duplicated page next to the host, under the main view, and
//! keep every page they ever materialized.

mod binding;
mod duplicate;
mod remote;

pub use binding::{Attach, TemplateBinding};
pub use duplicate::{duplicate_with_data, normalize_rows, reset, DuplicateOptions};
pub use remote::{load, LoadOptions, LoadOutcome};

pub(crate) use remote::{complete, PendingLoad};

use serde_json::Value;

use crate::context::Engine;

/// Data row a duplicate of `host` was built from.
pub fn row_for<'a>(engine: &'a Engine, host: &str, duplicate: &str) -> Option<&'a Value> {
    engine
        .object(host)?
        .template
        .as_ref()?
        .row_for(duplicate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Descriptor, TemplateSpec};
    use serde_json::json;

    #[test]
    fn test_row_for() {
        let mut engine = Engine::builder().build().unwrap();
        engine
            .create(Descriptor::new("template").with_id("list").with_template(TemplateSpec {
                row: Descriptor::new("container"),
                ..Default::default()
            }))
            .unwrap();
        let ids = duplicate_with_data(
            &mut engine,
            "list",
            json!([{ "n": 1 }, { "n": 2 }]),
            DuplicateOptions::default(),
        )
        .unwrap();

        assert_eq!(row_for(&engine, "list", &ids[1]), Some(&json!({ "n": 2 })));
        assert_eq!(row_for(&engine, "list", "nobody"), None);
        assert_eq!(row_for(&engine, "nobody", &ids[0]), None);
    }
}
