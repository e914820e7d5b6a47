//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Product records and alert records are both entities: two records with the
/// same id describe the same thing at different points in time.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
