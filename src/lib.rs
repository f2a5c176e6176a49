//! # trellis
//!
//! Retained-mode declarative UI engine.
//!
//! Applications describe a tree of typed objects as plain data; the engine
//! materializes it into a render target, refreshes it incrementally, expands
//! templates against data rows, and drives page navigation from the location
//! hash. Session state is exposed through
//! [spark-signals](https://github.com/RLabs-Inc/spark-signals).
//!
//! ## Architecture
//!
//! ```text
//! descriptors ─▶ Registry ─▶ build pass ─▶ commit ─▶ RenderTarget
//!                   ▲            ▲
//!                   │            │
//!           template engine    Pager (hash → page → transitions)
//! ```
//!
//! Everything hangs off one [`Engine`] value passed explicitly to every
//! operation. The style resolver, transition runner, network and render
//! target are collaborators behind traits, with headless implementations
//! bundled for tests and tooling.
//!
//! ## Modules
//!
//! - [`types`] - Identities, lifecycle flags, tickets
//! - [`engine`] - Nodes, descriptors, widget catalog, registry
//! - [`pipeline`] - Build pass and render commit
//! - [`template`] - Template duplication and remote loading
//! - [`router`] - Routes, history, pager state machine
//! - [`renderer`] - Markup synthesis and the render-target adapter
//! - [`theme`] - Style intents to classes
//! - [`services`] - Transition runner and network collaborators

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod renderer;
pub mod router;
pub mod services;
pub mod template;
pub mod theme;
pub mod types;

// Re-export commonly used items
pub use types::*;

pub use config::EngineConfig;
pub use context::{Continuation, Engine, EngineBuilder, FailureContinuation, LoadReport, LoadWarning};
pub use error::{EngineError, Result};

pub use engine::{
    handler, Behavior, BehaviorMap, DataSource, Descriptor, Event, Handler, Node, PageMeta,
    PageSpec, Registry, TemplateSpec, WidgetCatalog,
};

pub use renderer::{MemoryTarget, Mutation, RenderTarget, StringBuilder};

pub use router::{Direction, Pager, PagerEvent, PagerState, Route};

pub use services::{
    Network, Progress, QueuedNetwork, RecordingTransitions, Request, Transition, TransitionKind,
    TransitionOptions, TransitionRunner,
};

pub use template::{DuplicateOptions, LoadOptions, LoadOutcome, TemplateBinding};

pub use theme::{StyleResolver, Variant, VariantResolver};
