//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Override requests, escalations and notifications are entities: a record is
/// replaced wholesale on every state change, and repositories key it by `id()`.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
