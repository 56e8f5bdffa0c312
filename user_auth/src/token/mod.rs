//! Signed, self-contained, expiring claims tokens.
//!
//! Email-verification, access and refresh tokens share one HS256 signing
//! mechanism. The embedded `type` tag decides which validator applies.

pub mod claims;
pub mod codec;

pub use claims::{AccessClaims, Claims, EmailVerificationClaims, RefreshClaims, Tier, TokenPayload};
pub use codec::{TokenCodec, TokenError};
