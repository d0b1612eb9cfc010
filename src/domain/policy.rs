//! Access rules for catalog products and blog posts.
//!
//! The predicates are pure functions over immutable snapshots and never fail:
//! a missing owner or an unauthenticated actor simply yields `false`.
//! Handlers run an ordered list of [`Gate`]s through [`authorize`] before
//! touching storage; the first failing gate is reported back.

use thiserror::Error;
use uuid::Uuid;

use super::actor::{Actor, Permission};
use super::entities::{PostRecord, ProductRecord};

/// An entity with an optional owner and a publication flag.
pub trait Owned {
    fn owner_id(&self) -> Option<Uuid>;
    fn is_published(&self) -> bool;
}

impl Owned for ProductRecord {
    fn owner_id(&self) -> Option<Uuid> {
        self.owner_id
    }

    fn is_published(&self) -> bool {
        self.is_published
    }
}

impl Owned for PostRecord {
    fn owner_id(&self) -> Option<Uuid> {
        self.owner_id
    }

    fn is_published(&self) -> bool {
        self.is_published
    }
}

fn is_owner(actor: &Actor, entity: &impl Owned) -> bool {
    match (actor.id, entity.owner_id()) {
        (Some(actor_id), Some(owner_id)) => actor.is_authenticated && actor_id == owner_id,
        _ => false,
    }
}

pub fn can_view(actor: &Actor, entity: &impl Owned) -> bool {
    entity.is_published()
        || (actor.is_authenticated && (actor.is_staff || actor.is_superuser))
        || is_owner(actor, entity)
}

pub fn can_edit(actor: &Actor, entity: &impl Owned) -> bool {
    actor.is_authenticated && (actor.is_superuser || is_owner(actor, entity))
}

pub fn can_delete(actor: &Actor, entity: &impl Owned, delete_permission: Permission) -> bool {
    actor.is_authenticated
        && (actor.is_superuser
            || is_owner(actor, entity)
            || actor.has_permission(delete_permission))
}

pub fn can_unpublish(actor: &Actor, unpublish_permission: Permission) -> bool {
    actor.has_permission(unpublish_permission)
}

/// One pre-handler access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    LoginRequired,
    StaffRequired,
    Permission(Permission),
    CanEdit,
    CanDelete(Permission),
    CanUnpublish(Permission),
}

impl Gate {
    pub fn name(&self) -> &'static str {
        match self {
            Self::LoginRequired => "login_required",
            Self::StaffRequired => "staff_required",
            Self::Permission(_) => "permission",
            Self::CanEdit => "can_edit",
            Self::CanDelete(_) => "can_delete",
            Self::CanUnpublish(_) => "can_unpublish",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("access denied by {gate:?}")]
pub struct AccessDenied {
    pub gate: Gate,
}

impl AccessDenied {
    /// Failures of [`Gate::LoginRequired`] ask the caller to authenticate.
    pub fn requires_login(&self) -> bool {
        matches!(self.gate, Gate::LoginRequired)
    }
}

/// Run `gates` in order against `actor` and the optional target entity.
///
/// Entity-scoped gates fail when no entity is supplied.
pub fn authorize<E: Owned>(
    actor: &Actor,
    entity: Option<&E>,
    gates: &[Gate],
) -> Result<(), AccessDenied> {
    for gate in gates {
        let allowed = match *gate {
            Gate::LoginRequired => actor.is_authenticated,
            Gate::StaffRequired => actor.is_authenticated && actor.is_staff,
            Gate::Permission(permission) => actor.has_permission(permission),
            Gate::CanEdit => entity.is_some_and(|entity| can_edit(actor, entity)),
            Gate::CanDelete(permission) => {
                entity.is_some_and(|entity| can_delete(actor, entity, permission))
            }
            Gate::CanUnpublish(permission) => can_unpublish(actor, permission),
        };
        if !allowed {
            return Err(AccessDenied { gate: *gate });
        }
    }
    Ok(())
}

/// Gates for an edit that may flip the publication flag.
///
/// Taking a published entity back to draft needs the unpublish permission
/// on top of edit rights.
pub fn edit_gates(was_published: bool, is_published: bool, unpublish: Permission) -> Vec<Gate> {
    let mut gates = vec![Gate::CanEdit];
    if was_published && !is_published {
        gates.push(Gate::CanUnpublish(unpublish));
    }
    gates
}

/// [`authorize`] for gates that never look at an entity.
pub fn authorize_actor(actor: &Actor, gates: &[Gate]) -> Result<(), AccessDenied> {
    authorize::<ProductRecord>(actor, None, gates)
}
