//! Semantic variants - the `variant` style intent.
//!
//! A variant names the role of a widget, never its colours. Each one resolves
//! to exactly one `v-<name>` class and the stylesheet decides what it looks
//! like, so two themes can render the same tree differently.
//!
//! # Example
//!
//! ```ignore
//! use trellis::theme::Variant;
//!
//! assert_eq!(Variant::parse("Primary"), Some(Variant::Primary));
//! assert_eq!(Variant::Error.class_name(), "v-error");
//! ```

// =============================================================================
// Variant Enum
// =============================================================================

/// Role of a widget, resolved to a `v-<name>` class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Variant {
    /// `v-default`. Also what an explicit `"variant": "default"` asks for.
    #[default]
    Default,
    /// `v-primary`, the main call to action of a view.
    Primary,
    Secondary,
    Accent,
    /// Outcome classes for status labels and toasts.
    Success,
    Warning,
    Error,
    Info,
    /// `v-muted`, de-emphasized text such as the loading indicator.
    Muted,
    /// `v-surface`, a raised container (cards, template rows).
    Surface,
    /// `v-ghost`, an action with no container of its own.
    Ghost,
    /// `v-outline`, an action drawn as a bordered container.
    Outline,
}

/// Intent value ↔ variant. The single source for parsing and naming.
const NAMES: [(Variant, &str); 12] = [
    (Variant::Default, "default"),
    (Variant::Primary, "primary"),
    (Variant::Secondary, "secondary"),
    (Variant::Accent, "accent"),
    (Variant::Success, "success"),
    (Variant::Warning, "warning"),
    (Variant::Error, "error"),
    (Variant::Info, "info"),
    (Variant::Muted, "muted"),
    (Variant::Surface, "surface"),
    (Variant::Ghost, "ghost"),
    (Variant::Outline, "outline"),
];

impl Variant {
    /// Variant named by an intent value, ignoring ASCII case.
    pub fn parse(intent: &str) -> Option<Self> {
        NAMES
            .iter()
            .find(|(_, name)| name.eq_ignore_ascii_case(intent))
            .map(|(variant, _)| *variant)
    }

    /// Intent value naming this variant.
    pub fn name(self) -> &'static str {
        NAMES
            .iter()
            .find(|(variant, _)| *variant == self)
            .map_or("default", |(_, name)| name)
    }

    /// Class the variant resolves to.
    pub fn class_name(self) -> String {
        format!("v-{}", self.name())
    }

    /// Every variant, in declaration order.
    pub fn all() -> impl Iterator<Item = Variant> {
        NAMES.iter().map(|(variant, _)| *variant)
    }
}
