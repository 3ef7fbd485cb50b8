//! Row identifiers.
//!
//! Every table keys on a `SERIAL` column. Each gets its own wrapper so an
//! order id cannot be passed where a product id is expected.

/// Declare an `i32` identifier newtype.
///
/// The wrapper is `Copy`, serializes as a bare number, and maps to `INTEGER`
/// when the `postgres` feature is on.
///
/// ```rust
/// # use hey_harvest_core::define_id;
/// define_id!(CouponId);
///
/// let id = CouponId::new(3);
/// assert_eq!(i32::from(id), 3);
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[cfg_attr(feature = "postgres", derive(::sqlx::Type))]
        #[cfg_attr(feature = "postgres", sqlx(transparent))]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            #[must_use]
            pub const fn new(id: i32) -> Self {
                Self(id)
            }

            #[must_use]
            pub const fn as_i32(&self) -> i32 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                ::core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self(id)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(UserId);
define_id!(ProductId);
define_id!(OrderId);
define_id!(OrderItemId);
define_id!(ReviewId);
define_id!(AddressId);
define_id!(SubscriptionId);
define_id!(BlogPostId);
define_id!(ContactMessageId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_bare_number() {
        let id = ProductId::new(42);
        assert_eq!(serde_json::to_string(&id).unwrap(), "42");
        assert_eq!(serde_json::from_str::<ProductId>("42").unwrap(), id);
    }

    #[test]
    fn converts_to_and_from_i32() {
        let order_id = OrderId::from(7);
        assert_eq!(order_id.as_i32(), 7);
        assert_eq!(i32::from(order_id), 7);
        assert_eq!(order_id.to_string(), "7");
    }

    #[test]
    fn orders_by_value() {
        let mut ids = vec![UserId::new(9), UserId::new(2), UserId::new(5)];
        ids.sort();
        assert_eq!(ids, [UserId::new(2), UserId::new(5), UserId::new(9)]);
    }
}
