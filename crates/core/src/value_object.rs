//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects carry no identity. Two card numbers with the same text are
/// the same card number; two tracking updates with the same status and
/// carrier id are interchangeable.
///
/// Implementors must be cheap to clone and compare:
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq)]
/// struct TrackingStatus(String);
///
/// impl ValueObject for TrackingStatus {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
