//! pay-ids
//!
//! Identity codec shared by every other crate:
//! - [`encode`] / [`decode`]: composite identifier struct <-> opaque base64url string
//! - [`idempotency_key`]: SHA-256 of the canonical encoding of a designated value
//!
//! Pure functions. No IO, no clock, no global state.

mod canonical;
mod codec;
mod idempotency;

pub use canonical::{to_canonical_bytes, to_canonical_json};
pub use codec::{decode, encode, try_encode, IdError};
pub use idempotency::{idempotency_key, try_idempotency_key};

/// A composite identifier with an opaque string form.
///
/// Implemented through [`impl_composite_id!`], which also wires `Display`
/// and `FromStr` to the codec.
pub trait CompositeId: serde::Serialize + serde::de::DeserializeOwned + Sized {
    /// Opaque external string.
    fn encode(&self) -> String {
        codec::encode(self)
    }

    /// Parse an opaque external string.
    fn decode(s: &str) -> Result<Self, IdError> {
        codec::decode(s)
    }

    /// Idempotency key derived from the identifier alone.
    fn idempotency_key(&self) -> String {
        idempotency::idempotency_key(self)
    }
}

/// Implement [`CompositeId`], `Display` and `FromStr` for identifier structs.
#[macro_export]
macro_rules! impl_composite_id {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::CompositeId for $ty {}

            impl ::std::fmt::Display for $ty {
                fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                    f.write_str(&$crate::encode(self))
                }
            }

            impl ::std::str::FromStr for $ty {
                type Err = $crate::IdError;

                fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                    $crate::decode(s)
                }
            }
        )+
    };
}
