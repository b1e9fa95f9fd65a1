//! Ownership guards.
//!
//! A mutation on an owned resource is allowed only when the acting user's id
//! equals the id recorded as the resource's owner. A mismatch is an error,
//! never a silent no-op.

use thiserror::Error;

/// A resource with a single owning user
pub trait Owned {
    /// Resource kind used in messages, e.g. `"campground"`
    const KIND: &'static str;

    fn resource_id(&self) -> &str;

    fn owner_id(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("user {actor} does not own {kind} {resource}")]
pub struct OwnershipError {
    pub actor: String,
    pub kind: &'static str,
    pub resource: String,
}

/// Allow the mutation only if `actor_id` owns `resource`
pub fn ensure_owner<R: Owned>(actor_id: &str, resource: &R) -> Result<(), OwnershipError> {
    if resource.owner_id() == actor_id {
        return Ok(());
    }

    tracing::warn!(
        target: "yelpcamp-authz",
        actor = actor_id,
        kind = R::KIND,
        resource = resource.resource_id(),
        "ownership check failed"
    );
    Err(OwnershipError {
        actor: actor_id.to_string(),
        kind: R::KIND,
        resource: resource.resource_id().to_string(),
    })
}

/// Allow the mutation if `actor_id` owns `resource` or the resource's `parent`
pub fn ensure_owner_or_parent_owner<R: Owned, P: Owned>(
    actor_id: &str,
    resource: &R,
    parent: &P,
) -> Result<(), OwnershipError> {
    if parent.owner_id() == actor_id {
        return Ok(());
    }
    ensure_owner(actor_id, resource)
}
