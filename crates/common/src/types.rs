use serde::{Deserialize, Serialize};

/// Declares a store-generated row identifier.
///
/// Each entity gets its own newtype so a product id can never be passed
/// where an order id is expected, even though both are serial keys.
macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw key as returned by the store.
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the raw key.
            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

row_id!(
    /// Identifier of a product row.
    ProductId
);
row_id!(
    /// Identifier of a customer row.
    CustomerId
);
row_id!(
    /// Identifier of an order header row.
    OrderId
);
row_id!(
    /// Identifier of a payment row.
    PaymentId
);
