//! Engine - nodes, descriptors, the widget catalog and the object registry.
//!
//! # Architecture
//!
//! ```text
//! Descriptor ──WidgetCatalog──▶ Node ──register──▶ Registry
//!     (data)      (type tag →      (base record +      (identity → Node,
//!                  constructor)     variant extension)   roles, prepared set)
//! ```
//!
//! Nodes are plain records. Widget types are flat variants that differ only
//! in the defaults they construct a node with; there is no inheritance
//! between them. The registry is the single source of truth for whether a
//! node exists and what state it is in.

mod behavior;
mod catalog;
mod descriptor;
mod merge;
mod node;
mod registry;

pub use behavior::{behaviors_from_attrs, handler, Behavior, BehaviorMap, Event, Handler};
pub use catalog::{construct_with, Constructor, VariantDefaults, WidgetCatalog};
pub use descriptor::{DataSource, Descriptor, PageSpec, TemplateSpec};
pub use merge::{as_attrs, merge_layers, overlay};
pub use node::{Node, PageMeta};
pub use registry::{Overrides, Registry};
