//! Role-based access checks for content operations.

use crate::core::{CmsError, Result};
use crate::metadata::{ADMIN_ROLE, CollectionMetadata, Operation, PUBLIC_ROLE};

/// Who is performing an operation, as supplied by the auth layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caller {
    user_id: Option<String>,
    roles: Vec<String>,
}

impl Caller {
    /// Unauthenticated request
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(user_id: impl Into<String>, roles: Vec<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            roles,
        }
    }

    /// Authenticated caller holding the admin role.
    pub fn admin(user_id: impl Into<String>) -> Self {
        Self::authenticated(user_id, vec![ADMIN_ROLE.to_string()])
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    pub fn is_authenticated(&self) -> bool {
        self.user_id.is_some()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ADMIN_ROLE)
    }
}

/// Checks `caller` against the collection's allow-list for `operation`.
///
/// Anonymous callers may only read, and only collections whose read list
/// contains `public`. Admins pass every check. A missing list admits any
/// authenticated caller.
pub fn authorize(collection: &CollectionMetadata, operation: Operation, caller: &Caller) -> Result<()> {
    let allowed = collection.access.roles_for(operation);

    if !caller.is_authenticated() {
        let public_read = operation == Operation::Read
            && allowed.is_some_and(|roles| roles.iter().any(|r| r == PUBLIC_ROLE));
        if public_read {
            return Ok(());
        }
        return Err(CmsError::Unauthorized(format!(
            "authentication required to {} '{}'",
            operation, collection.slug
        )));
    }

    if caller.is_admin() {
        return Ok(());
    }
    match allowed {
        None => Ok(()),
        Some(roles) if roles.iter().any(|r| r == PUBLIC_ROLE || caller.has_role(r)) => Ok(()),
        Some(_) => Err(CmsError::Forbidden(format!(
            "roles {:?} may not {} '{}'",
            caller.roles(),
            operation,
            collection.slug
        ))),
    }
}
