//! Business logic services for the storefront.
//!
//! Services sit between route handlers and repositories. They validate
//! input, apply the rules from `hey_harvest_core` and orchestrate one or
//! more repository calls.
//!
//! # Services
//!
//! - `auth` - Registration, login and profile updates
//! - `catalog` - Cached product reads
//! - `checkout` - Cart quotes and order placement
//! - `markdown` - Blog post rendering
//! - `newsletter` - Subscribe, unsubscribe and preferences
//! - `payment` - Razorpay orders and signature verification
//! - `reviews` - Review eligibility and submission

pub mod auth;
pub mod catalog;
pub mod checkout;
pub mod markdown;
pub mod newsletter;
pub mod payment;
pub mod reviews;
