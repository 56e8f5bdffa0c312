//! Claims carried by signed tokens.
//!
//! One signing mechanism serves three purposes. The `type` field selects the
//! variant and each variant has its own validator.

use serde::{Deserialize, Serialize};

use crate::auth::UserId;

/// Refresh session tier chosen at login
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Short,
    Long,
}

impl Tier {
    pub fn from_stay_login(stay_login: bool) -> Self {
        if stay_login { Tier::Long } else { Tier::Short }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Short => "short",
            Tier::Long => "long",
        }
    }
}

/// Payload of an email-verification token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailVerificationClaims {
    pub email: String,
    /// Milliseconds since the Unix epoch at signing time
    pub timestamp: i64,
}

impl EmailVerificationClaims {
    pub fn validate(&self) -> bool {
        !self.email.is_empty()
    }
}

/// Payload of an access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: UserId,
    pub email: String,
}

impl AccessClaims {
    pub fn validate(&self) -> bool {
        self.sub > 0 && !self.email.is_empty()
    }
}

/// Payload of a refresh token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: UserId,
    pub email: String,
    pub stay_login: bool,
    pub tier: Tier,
}

impl RefreshClaims {
    pub fn new(sub: UserId, email: impl Into<String>, tier: Tier) -> Self {
        Self {
            sub,
            email: email.into(),
            stay_login: tier == Tier::Long,
            tier,
        }
    }

    /// Subject and email must be present and the tier must agree with the flag.
    pub fn validate(&self) -> bool {
        self.sub > 0 && !self.email.is_empty() && Tier::from_stay_login(self.stay_login) == self.tier
    }
}

/// Purpose-specific token content, tagged by `type`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TokenPayload {
    EmailVerification(EmailVerificationClaims),
    Access(AccessClaims),
    Refresh(RefreshClaims),
}

impl TokenPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            TokenPayload::EmailVerification(_) => "email_verification",
            TokenPayload::Access(_) => "access",
            TokenPayload::Refresh(_) => "refresh",
        }
    }
}

/// Full claim set as encoded in the JWT
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(flatten)]
    pub payload: TokenPayload,
    /// Unique token id; keeps tokens minted in the same second distinct
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    /// Refresh payload, if this is a well-formed refresh token.
    pub fn into_refresh(self) -> Option<RefreshClaims> {
        match self.payload {
            TokenPayload::Refresh(claims) if claims.validate() => Some(claims),
            _ => None,
        }
    }

    /// Access payload, if this is a well-formed access token.
    pub fn into_access(self) -> Option<AccessClaims> {
        match self.payload {
            TokenPayload::Access(claims) if claims.validate() => Some(claims),
            _ => None,
        }
    }

    /// Email-verification payload, if this is a well-formed verification token.
    pub fn into_email_verification(self) -> Option<EmailVerificationClaims> {
        match self.payload {
            TokenPayload::EmailVerification(claims) if claims.validate() => Some(claims),
            _ => None,
        }
    }
}
