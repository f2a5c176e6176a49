//! Core types for trellis.
//!
//! These types flow through the registry, the build pipeline, the template
//! engine and the router. They carry no behavior of their own.

use std::fmt;

use serde_json::{Map, Value};

// =============================================================================
// Identity
// =============================================================================

/// Stable string key of a node.
///
/// Doubles as the render-target element id and the registry lookup key.
pub type NodeId = String;

/// Ordered attribute map used for style intents, structural data and raw
/// element attributes.
pub type Attrs = Map<String, Value>;

/// Parent key used for nodes that are not attached to any container.
pub const DOCUMENT_ROOT: &str = "#document";

// =============================================================================
// Lifecycle Flags (bitflags)
// =============================================================================

bitflags::bitflags! {
    /// Lifecycle state of a node.
    ///
    /// Combine with bitwise OR: `Lifecycle::MATERIALIZED | Lifecycle::ENTERED`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Lifecycle: u8 {
        const NONE = 0;
        /// The element exists in the render target.
        const MATERIALIZED = 1 << 0;
        /// The enter animation already fired.
        const ENTERED = 1 << 1;
        /// The identity was generated, not chosen by the developer.
        const UNNAMED = 1 << 2;
        /// Abstract template object. Only ever duplicated, never rendered.
        const ABSTRACT = 1 << 3;
    }
}

// =============================================================================
// Roles
// =============================================================================

/// Well-known structural roles whose identity the registry caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// The application root container.
    Root,
    /// The main view pages are attached to.
    MainView,
}

// =============================================================================
// Tickets
// =============================================================================

/// Completion token handed to asynchronous collaborators.
///
/// A transition runner or network adapter that cannot finish synchronously
/// keeps the ticket and reports back through the engine when done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(pub u64);

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// =============================================================================
// Geometry
// =============================================================================

/// Bounding box of a rendered element, as reported by the render target.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}
