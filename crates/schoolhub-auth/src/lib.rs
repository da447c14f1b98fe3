//! SchoolHub Authentication and Authorization
//!
//! Credential verification, stateless cookie sessions and the
//! path-based role gatekeeper.

pub mod cookie;
pub mod credentials;
pub mod error;
pub mod gatekeeper;
pub mod password;
pub mod policy;
pub mod session;

pub use cookie::{SESSION_COOKIE, clear_session_cookie, session_cookie, session_token};
pub use credentials::CredentialVerifier;
pub use error::AuthError;
pub use gatekeeper::{Access, Gatekeeper, gatekeeper_middleware};
pub use password::{hash_password, verify_password};
pub use policy::{PathMatch, RoutePolicy, RouteRule};
pub use session::{
    Clock, FixedClock, IssuedSession, SESSION_TTL_HOURS, SessionClaims, SessionManager,
    SystemClock,
};
