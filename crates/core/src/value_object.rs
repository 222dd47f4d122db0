//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects have **no identity**: two values with the same attributes are
/// the same value (`VehicleInfo`, `Money`, ...). They are immutable in spirit;
/// "modifying" one means building a new value.
///
/// ```ignore
/// let a = VehicleInfo::new().with_plate("abc-123");
/// let b = VehicleInfo::new().with_plate("ABC-123");
/// assert_eq!(a, b); // both store "ABC-123"
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
