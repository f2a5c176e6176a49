//! Build Pipeline
//!
//! Converts nodes into markup and applies it to the render target.
//!
//! # Pipeline Architecture
//!
//! ```text
//! rebuild(id) → prepare_build → Vec<Fragment> → commit → RenderTarget
//!                    │                              │
//!                    └── marks prepared ────────────┴── drains prepared,
//!                                                       sets MATERIALIZED/ENTERED
//! ```
//!
//! ## Key Design Principles
//!
//! - **No markup for existing elements**: a materialized node only ever gets
//!   a class write, and only when its classes changed.
//! - **Idempotent refresh**: rebuilding an unchanged subtree writes nothing.
//! - **Whole-subtree markup**: new subtrees are rendered in one fragment;
//!   there is no node-by-node patching.

mod build;
mod commit;

pub use build::{prepare_build, Fragment};
pub use commit::{commit, rebuild};
