//! Renderer - markup synthesis and the render-target adapter.
//!
//! # Architecture
//!
//! ```text
//! build pass → StringBuilder (markup pieces) → Fragment → RenderTarget::insert
//!                                                       → RenderTarget::set_class
//! ```
//!
//! The build pipeline assembles markup depth-first with [`StringBuilder`]
//! and hands finished fragments to a [`RenderTarget`]. Nothing in the engine
//! reads element state back except existence checks.

mod markup;
mod string_builder;
mod target;

pub use markup::{close_tag, escape, is_void, open_tag, render_text, VOID_TAGS};
pub use string_builder::StringBuilder;
pub use target::{Element, MemoryTarget, Mutation, RenderTarget};
