use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates an identifier from an existing string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns true if the identifier is empty or whitespace.
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }

            /// Consumes the identifier, returning the inner string.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Identifier of a shared-ride room.
    RoomId
);

string_id!(
    /// Identifier of a user, as forwarded by the authentication layer.
    UserId
);

string_id!(
    /// Identifier of a single payment attempt in the ledger.
    PaymentId
);

string_id!(
    /// Identifier of a completed trip in the route history.
    RouteId
);

impl RoomId {
    /// Generates a new random room ID.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl PaymentId {
    /// Generates a new random payment ID.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl RouteId {
    /// Generates a new random route ID.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}
