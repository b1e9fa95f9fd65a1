//! Who is making the request: password hashing, the session-backed identity
//! and the extractors routes use to demand a signed-in user.

pub mod identity;
pub mod password;

pub use identity::{
    attach_identity, current_user_value, log_in, log_out, Identity, Locals, RequireUser,
    DEFAULT_RETURN_TO, RETURN_TO_KEY, USER_ID_KEY,
};

use yelpcamp_authz::OwnershipError;
use yelpcamp_http::AppError;

/// Render a failed ownership check as a 403
pub fn forbidden(error: OwnershipError) -> AppError {
    tracing::debug!(%error, "mutation refused");
    AppError::forbidden("You do not have permission to do that!")
}
