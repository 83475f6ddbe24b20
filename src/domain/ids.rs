//! Type-safe numeric identifiers.
//!
//! Events, users and registrations are all keyed by positive 64-bit
//! integers. Each gets its own newtype so that an event id can never be
//! passed where a user id is expected.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
        )]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw database identifier.
            #[must_use]
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Returns the raw integer value.
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }

            /// Returns `true` for identifiers that can refer to a stored row.
            #[must_use]
            pub const fn is_valid(self) -> bool {
                self.0 > 0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

numeric_id!(
    /// Identifier of an event in the capacity store.
    EventId
);

numeric_id!(
    /// Identifier of a user, taken from verified access-token claims.
    UserId
);

numeric_id!(
    /// Identifier of a registration record in the ledger.
    RegistrationId
);

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn display_is_raw_integer() {
        assert_eq!(EventId::new(42).to_string(), "42");
    }

    #[test]
    fn serializes_transparently() {
        let Ok(json) = serde_json::to_string(&UserId::new(7)) else {
            panic!("serialization failed");
        };
        assert_eq!(json, "7");

        let Ok(id) = serde_json::from_str::<RegistrationId>("13") else {
            panic!("deserialization failed");
        };
        assert_eq!(id.get(), 13);
    }

    #[test]
    fn only_positive_ids_are_valid() {
        assert!(EventId::new(1).is_valid());
        assert!(!EventId::new(0).is_valid());
        assert!(!EventId::new(-3).is_valid());
    }

    #[test]
    fn hash_works_in_hashmap() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert((EventId::new(1), UserId::new(2)), "pair");
        assert_eq!(map.get(&(EventId::new(1), UserId::new(2))), Some(&"pair"));
        assert_eq!(map.get(&(EventId::new(2), UserId::new(1))), None);
    }
}
