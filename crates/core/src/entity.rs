//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Stores key their records by `id()`, so two values with the same id are the
/// same entity at different points in time.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
