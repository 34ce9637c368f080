//! Entity trait: identity that survives attribute changes.

/// Something identified by a stable id rather than by its attributes.
///
/// A card record keeps its id through narrow and wide updates, so two
/// snapshots of it taken before and after an amendment are still the same
/// entity.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;

    /// Whether `other` refers to the same entity, regardless of its attributes.
    fn is_same_as(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}
