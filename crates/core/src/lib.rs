//! Hey Harvest Core - Shared types and business rules.
//!
//! This crate provides the types and rules used across all Hey Harvest components:
//! - `storefront` - JSON API consumed by the storefront SPA and the back-office
//! - `cli` - Command-line tools for migrations, seeding and admin management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Every pricing, identifier and lifecycle rule lives
//! here so it can be tested without a running database.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, emails, statuses and catalog enums
//! - [`pricing`] - Shipping, GST, COD and coupon arithmetic plus order totals
//! - [`identifiers`] - SKU, tracking number and order number formats
//! - [`validation`] - Indian pincode and mobile number checks
//! - [`delivery`] - Estimated delivery dates
//! - [`pagination`] - Offset pagination math
//! - [`cart`] - Cart line aggregation
//! - [`lifecycle`] - Order status transitions and progress steps
//! - [`review`] - Review eligibility gate and draft validation
//! - [`newsletter`] - Subscription preferences and reactivation rules

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod delivery;
pub mod identifiers;
pub mod lifecycle;
pub mod newsletter;
pub mod pagination;
pub mod pricing;
pub mod review;
pub mod types;
pub mod validation;

pub use types::*;
