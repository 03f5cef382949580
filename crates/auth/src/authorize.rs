use thiserror::Error;

use crate::{Capability, Principal};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("principal holds no ledger roles")]
    NoRoles,

    #[error("forbidden: missing capability '{0}'")]
    Forbidden(Capability),
}

/// Authorize a principal for one capability.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn authorize(principal: &Principal, required: &Capability) -> Result<(), AuthzError> {
    if principal.roles().is_empty() {
        return Err(AuthzError::NoRoles);
    }

    if principal.has(required) {
        Ok(())
    } else {
        tracing::debug!(
            user_id = %principal.user_id(),
            capability = %required,
            "authorization denied"
        );
        Err(AuthzError::Forbidden(required.clone()))
    }
}

impl Principal {
    /// Shorthand for [`authorize`].
    pub fn require(&self, required: &Capability) -> Result<(), AuthzError> {
        authorize(self, required)
    }
}
