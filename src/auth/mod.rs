//! Bearer-token authentication with role-based access control.
//!
//! Access tokens are verified statelessly on every request; the extractor
//! never touches the database. Refresh tokens live in the database and are
//! handled by the `/auth` endpoints.

mod errors;
mod extractors;
mod ip;
mod state;
mod types;

pub use errors::{ApiAuthError, AuthErrorKind};
pub use extractors::{AdminOnly, AnyRole, Auth, RoleConstraint, bearer_token};
pub use ip::{ClientIpHeader, extract_client_ip};
pub use state::HasAuthBackend;
pub use types::AuthenticatedUser;
