//! Property tests for identity, template bookkeeping and route keys.

use std::collections::HashSet;

use proptest::prelude::*;
use serde_json::{json, Value};
use trellis::router::{page_key, Route};
use trellis::template::{duplicate_with_data, reset};
use trellis::{Attrs, Descriptor, DuplicateOptions, Engine, MemoryTarget, RenderTarget, TemplateSpec};

// =============================================================================
// Helpers
// =============================================================================

fn list_engine(target: &MemoryTarget) -> Engine {
    let mut engine = Engine::builder().target(target.clone()).build().unwrap();
    engine
        .create(
            Descriptor::new("app").with_id("app").with_child(
                Descriptor::new("template").with_id("list").with_template(TemplateSpec {
                    row: Descriptor::new("container"),
                    objects: vec![Descriptor::new("label").with_behavior("text", "{{name}}")],
                    source: None,
                }),
            ),
        )
        .unwrap();
    engine.rebuild("app", None).unwrap();
    engine
}

fn rows() -> impl Strategy<Value = Vec<Value>> {
    prop::collection::vec("[a-z]{0,6}".prop_map(|name| json!({ "name": name })), 0..6)
}

fn params() -> impl Strategy<Value = Attrs> {
    (
        prop::option::of("[a-z0-9]{1,5}"),
        prop::collection::btree_map("[a-z]{1,4}", "[a-z0-9]{1,5}", 0..4),
    )
        .prop_map(|(bare, keyed)| {
            let mut params = Attrs::new();
            if let Some(bare) = bare {
                params.insert(String::new(), Value::String(bare));
            }
            for (k, v) in keyed {
                params.insert(k, Value::String(v));
            }
            params
        })
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn prop_generated_identities_are_unique(count in 1usize..20, copies in 0usize..5) {
        let mut engine = Engine::builder().build().unwrap();
        let mut seen = HashSet::new();
        for _ in 0..count {
            let id = engine.create(Descriptor::new("label")).unwrap();
            prop_assert!(seen.insert(id));
        }
        let base = seen.iter().next().cloned().unwrap();
        for _ in 0..copies {
            let copy = engine.registry_mut().duplicate(&base, &Default::default()).unwrap();
            prop_assert!(seen.insert(copy));
        }
        prop_assert_eq!(engine.registry().len(), count + copies);
    }

    #[test]
    fn prop_duplicates_stay_aligned(batches in prop::collection::vec(rows(), 1..4)) {
        let target = MemoryTarget::new();
        let mut engine = list_engine(&target);
        let mut total = 0;
        for batch in batches {
            total += batch.len();
            duplicate_with_data(&mut engine, "list", Value::Array(batch), DuplicateOptions::default())
                .unwrap();
        }

        let binding = engine.object("list").unwrap().template.clone().unwrap();
        prop_assert!(binding.is_aligned());
        prop_assert_eq!(binding.duplicate_ids.len(), total);
        prop_assert_eq!(target.children_of("list"), binding.duplicate_ids.clone());
        for (id, row) in binding.duplicate_ids.iter().zip(&binding.data_rows) {
            let label = &target.children_of(id)[0];
            prop_assert_eq!(target.text_of(label), row["name"].as_str().map(str::to_string));
        }
    }

    #[test]
    fn prop_reset_removes_every_duplicate(first in rows(), second in rows()) {
        let target = MemoryTarget::new();
        let mut engine = list_engine(&target);
        let old = duplicate_with_data(&mut engine, "list", Value::Array(first), DuplicateOptions::default())
            .unwrap();
        let base = engine.registry().len();

        let removed = reset(&mut engine, "list").unwrap();
        prop_assert_eq!(removed.len(), old.len() * 2);
        for id in &old {
            prop_assert!(!engine.registry().contains(id));
            prop_assert!(!target.exists(id));
        }
        prop_assert_eq!(engine.registry().len(), base - removed.len());

        let fresh = duplicate_with_data(
            &mut engine,
            "list",
            Value::Array(second.clone()),
            DuplicateOptions::reset(),
        )
        .unwrap();
        let binding = engine.object("list").unwrap().template.clone().unwrap();
        prop_assert_eq!(&binding.duplicate_ids, &fresh);
        prop_assert_eq!(binding.data_rows, second);
    }

    #[test]
    fn prop_page_key_parses_back(name in "[a-z]{1,8}", params in params()) {
        let key = page_key(&name, &params);
        let route = Route::parse(&format!("#/{key}"));
        prop_assert_eq!(&route.name, &name);
        prop_assert_eq!(&route.params, &params);
        prop_assert_eq!(route.key(), key);
    }
}
