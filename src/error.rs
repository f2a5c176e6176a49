//! Engine error type.

use thiserror::Error;

use crate::types::{NodeId, Ticket};

/// Errors produced by the engine.
///
/// Lookups that may legitimately miss return `Option` instead; these variants
/// cover operations that must not silently do nothing.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No node is registered under this identity.
    #[error("unknown identity `{0}`")]
    UnknownIdentity(NodeId),

    /// The node is registered but its element is not in the render target.
    #[error("element for `{0}` is missing from the render target")]
    ElementMissing(NodeId),

    /// A descriptor asked for an identity that is already taken.
    #[error("identity `{0}` is already registered")]
    DuplicateIdentity(NodeId),

    /// A descriptor carries no `type`.
    #[error("descriptor has no type")]
    MissingType,

    /// The widget catalog has no constructor for this type tag.
    #[error("unknown widget type `{0}`")]
    UnknownType(String),

    /// A constructor is already registered under this type tag.
    #[error("widget type `{0}` is already registered")]
    TypeAlreadyRegistered(String),

    /// Type tags are non-empty and limited to `[A-Za-z0-9_-]`.
    #[error("invalid widget type tag `{0}`")]
    InvalidTypeTag(String),

    /// The node has no template binding.
    #[error("`{0}` is not a template host")]
    NotATemplate(NodeId),

    /// The template host declares no data source.
    #[error("template host `{0}` has no data source")]
    NoDataSource(NodeId),

    /// The node has no page metadata.
    #[error("`{0}` is not a page")]
    NotAPage(NodeId),

    /// A collaborator reported completion for a ticket nobody is waiting on.
    #[error("unknown completion ticket {0}")]
    UnknownTicket(Ticket),

    /// Malformed markup handed to the render target.
    #[error("malformed markup: {0}")]
    Markup(String),

    /// Configuration or descriptor JSON failed to deserialize.
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result alias used across the crate.
pub type Result<T, E = EngineError> = std::result::Result<T, E>;
