//! Session token issuance and verification
//!
//! Sessions are stateless: an HS256-signed JWT carries the claims and the
//! server keeps nothing. A token is valid until it expires; there is no
//! refresh and no revocation.

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use schoolhub_db::{Role, User};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::debug;

use crate::error::AuthError;

/// Fixed session lifetime
pub const SESSION_TTL_HOURS: i64 = 24;

/// Source of the current time for issuance and expiry checks
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to a settable instant (second precision)
#[derive(Debug)]
pub struct FixedClock(AtomicI64);

impl FixedClock {
    pub fn at(instant: DateTime<Utc>) -> Self {
        Self(AtomicI64::new(instant.timestamp()))
    }

    pub fn advance(&self, by: Duration) {
        self.0.fetch_add(by.num_seconds(), Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.0.load(Ordering::SeqCst), 0)
            .single()
            .unwrap_or_else(Utc::now)
    }
}

/// Claims carried by a session token. Frozen at issuance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionClaims {
    pub user_id: i64,
    pub email: String,
    pub username: Option<String>,
    /// Display name
    pub name: String,
    pub role: Role,
    pub school_id: Option<String>,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl SessionClaims {
    /// Where this session's owner lands after login
    pub fn dashboard_path(&self) -> String {
        self.role.dashboard_path(self.school_id.as_deref())
    }
}

/// A freshly minted session
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub claims: SessionClaims,
    pub expires_at: DateTime<Utc>,
}

/// Issues and verifies session tokens with a symmetric secret
#[derive(Clone)]
pub struct SessionManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetime: Duration,
    clock: Arc<dyn Clock>,
}

impl SessionManager {
    /// Create a manager with the standard 24-hour lifetime
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            lifetime: Duration::hours(SESSION_TTL_HOURS),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock used for `iat`/`exp` and expiry checks
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Mint a token for a verified user
    pub fn issue(&self, user: &User) -> Result<IssuedSession, AuthError> {
        let now = self.clock.now();
        let expires_at = now + self.lifetime;

        let claims = SessionClaims {
            user_id: user.id,
            email: user.email.clone(),
            username: user.username.clone(),
            name: user.display_name().to_string(),
            role: user.role,
            school_id: user.school_id.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        debug!("Issuing session for user {} ({})", user.id, user.role);

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenIssue(e.to_string()))?;

        Ok(IssuedSession {
            token,
            claims,
            expires_at,
        })
    }

    /// Check signature and expiry. Every failure is `InvalidSession`.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked below against the injected clock
        validation.validate_exp = false;
        validation.leeway = 0;

        let claims = decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| {
                debug!("Session token rejected: {}", e);
                AuthError::InvalidSession
            })?
            .claims;

        if self.clock.now().timestamp() >= claims.exp {
            debug!("Session token for user {} expired", claims.user_id);
            return Err(AuthError::InvalidSession);
        }

        Ok(claims)
    }
}
