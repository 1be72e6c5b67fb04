//! Caller Context
//!
//! Identity of the authenticated caller, injected by upstream middleware and
//! trusted as-is.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Owner;

/// Role allowed to moderate exhibitions
pub const ADMIN_ROLE: &str = "admin";

/// Context for an operation, used for like state, ownership and tracing.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CallerContext {
    /// Authenticated user id, absent for anonymous reads
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Role claimed by the authentication layer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Display fields copied into `owner` on creation
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub profile_image: String,

    /// Correlation ID for request tracing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<Uuid>,
}

impl CallerContext {
    /// Create an anonymous context
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some(ADMIN_ROLE)
    }

    /// Owner descriptor for a new exhibition, if the caller is authenticated
    pub fn owner(&self) -> Option<Owner> {
        self.user_id.as_ref().map(|user_id| Owner {
            user_id: user_id.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            username: self.username.clone(),
            profile_image: self.profile_image.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_builder() {
        let correlation_id = Uuid::new_v4();
        let context = CallerContext::new()
            .with_user("65a1b2c3d4e5f60718293a4b")
            .with_role("admin")
            .with_correlation_id(correlation_id);

        assert!(context.is_admin());
        assert_eq!(context.correlation_id, Some(correlation_id));
        assert_eq!(
            context.owner().map(|o| o.user_id),
            Some("65a1b2c3d4e5f60718293a4b".to_string())
        );
    }

    #[test]
    fn test_anonymous_has_no_owner() {
        let context = CallerContext::new();
        assert!(context.owner().is_none());
        assert!(!context.is_admin());
        assert!(context.correlation_id.is_none());
    }
}
