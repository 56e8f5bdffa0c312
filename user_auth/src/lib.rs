//! # User Auth
//!
//! User authentication with email-verified registration and two-tier refresh
//! sessions.
//!
//! ## Architecture
//!
//! Registration is two-phase: signup data is staged in an ephemeral store and
//! a verification link is mailed; the user row is created only when the link
//! is followed. Login opens a refresh session in one of two tiers:
//!
//! - **Short**: the refresh token lives only in the ephemeral store
//! - **Long** (stay logged in): additionally backed by one durable row per user,
//!   consulted when the cached copy has expired
//!
//! Every use of a refresh token rotates it, so a token is accepted at most once.
//!
//! ## Core Modules
//!
//! - [`auth`]: Registration, login, rotation and logout
//! - [`token`]: Signed claims tokens
//! - [`cache`]: Ephemeral key/value store with TTL (Redis or in-memory)
//! - [`db`]: PostgreSQL pool, schema and repositories
//! - [`mail`]: Verification email delivery

/// Authentication flows and models.
pub mod auth;

/// Ephemeral key/value store.
pub mod cache;

/// Durable storage.
pub mod db;

/// Outbound email.
pub mod mail;

/// Claims tokens.
pub mod token;

pub use auth::{AuthError, AuthResult, RegistrationManager, SessionManager};
