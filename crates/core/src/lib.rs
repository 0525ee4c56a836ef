//! Arenza Core - Shared domain types.
//!
//! This crate provides the types shared by the storefront client library, the
//! CLI front end and the integration tests:
//! - products and prices as the catalog backend stores them
//! - the authenticated session reported by the auth backend
//! - the viewer [`Role`] derived from a session and the admin identity
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no async runtime. This keeps it lightweight and allows it to be
//! used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices and emails, plus the product,
//!   session and role types

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
