//! `labstock-auth`: the single authorization boundary of the ledger.
//!
//! Roles arrive as token claims, are resolved once per request into a
//! [`Principal`] holding a closed set of [`Capability`] values, and every
//! ledger operation asks the principal for exactly the capability it needs.
//! Decoupled from HTTP and storage.

pub mod authorize;
pub mod capabilities;
pub mod claims;
pub mod jwt;
pub mod principal;
pub mod roles;

pub use authorize::{AuthzError, authorize};
pub use capabilities::Capability;
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtValidator};
pub use principal::Principal;
pub use roles::Role;
