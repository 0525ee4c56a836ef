//! Arenza storefront client library.
//!
//! Keeps the viewer's session, role and the product catalog in sync with a
//! hosted backend, and drives a presentation layer through the [`View`] trait.
//!
//! # Architecture
//!
//! - [`SessionController`] owns the session and the product cache
//! - [`AuthBackend`] / [`CatalogBackend`] abstract the hosted backend
//! - [`SupabaseClient`] implements both against Supabase (GoTrue + PostgREST)
//! - [`resolve_config`] is the single bootstrap path

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod config;
pub mod controller;
pub mod error;
pub mod supabase;
pub mod view;

pub use backend::{
    AuthBackend, AuthChange, AuthChangeKind, CatalogBackend, SessionEvents, SessionPublisher,
    session_channel,
};
pub use config::{ClientConfig, ConfigSource, ConfigurationError, SupabaseConfig, resolve_config};
pub use controller::{ActionOutcome, SessionController};
pub use error::{AuthError, BackendError};
pub use supabase::SupabaseClient;
pub use view::View;
