//! Strongly typed identifier wrappers.
//!
//! Hosts, interfaces and connections are all dense indices into `Vec`s owned
//! by the simulation, so each id is a `u32` newtype with an `index()` helper.
//! Message ids are allocated by the traffic source and only ever used as set
//! and map keys.

use std::fmt;

/// Generate a typed ID wrapper around a primitive integer.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty) = $label:literal;) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        $vis struct $name(pub $inner);

        impl $name {
            /// Sentinel for "not assigned yet".
            pub const INVALID: $name = $name(<$inner>::MAX);

            /// Cast to `usize` for direct use as a `Vec` index.
            #[inline(always)]
            pub fn index(self) -> usize {
                self.0 as usize
            }

            /// The id allocated right after `self`.
            #[inline]
            pub fn next(self) -> $name {
                $name(self.0 + 1)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{}", $label, self.0)
            }
        }

        impl TryFrom<usize> for $name {
            type Error = std::num::TryFromIntError;
            fn try_from(n: usize) -> Result<$name, Self::Error> {
                <$inner>::try_from(n).map($name)
            }
        }
    };
}

typed_id! {
    /// Index of a host (mobile node) in the simulation.
    pub struct HostId(u32) = "h";
}

typed_id! {
    /// Index of a network interface across all hosts.
    pub struct InterfaceId(u32) = "if";
}

typed_id! {
    /// Identifier of a connection endpoint.  Never reused within a run.
    pub struct ConnectionId(u32) = "c";
}

typed_id! {
    /// Identifier of a message, unique for the whole run.
    pub struct MessageId(u32) = "M";
}
