//! Domain models for the storefront.
//!
//! These are validated domain objects, separate from the row types in
//! [`crate::db`]. All of them serialize with camelCase field names.

pub mod cart;
pub mod content;
pub mod newsletter;
pub mod order;
pub mod product;
pub mod review;
pub mod session;
pub mod user;

pub use cart::{Cart, CartItem};
pub use content::{BlogPost, BlogPostSummary, ContactMessage};
pub use newsletter::Subscription;
pub use order::{Order, OrderItem, OrderSummary, StatusHistoryEntry};
pub use product::{CategoryCount, Product, ProductSummary};
pub use review::Review;
pub use session::{CurrentUser, keys as session_keys};
pub use user::{Address, AddressDetails, CustomerSummary, User};
