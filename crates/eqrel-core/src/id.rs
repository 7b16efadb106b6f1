//! Arena identifiers.
//!
//! Variables, relations and domains live in arenas owned by the engine and are
//! addressed by these small copyable ids.

use std::fmt;

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        pub struct $name(u32);

        impl $name {
            /// Creates an id from an arena index.
            #[inline]
            pub const fn new(index: u32) -> Self {
                Self(index)
            }

            /// Returns the arena index.
            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

arena_id!(
    /// Identity of a variable or priority level.
    VarId,
    "v"
);

arena_id!(
    /// Identity of a declared relation. Ids grow with registration order.
    RelationId,
    "r"
);

arena_id!(
    /// Identity of a domain record. Records are recycled after a merge.
    DomainId,
    "d"
);
