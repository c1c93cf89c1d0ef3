//! Authentication user types.

use crate::db::UserRole;

/// Identity attached to a request by the `Auth` extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// Database user ID (the token subject)
    pub id: i64,
    /// Role carried by the access token
    pub role: UserRole,
}
