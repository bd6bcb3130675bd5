//! Authorization collaborator: the kernel consults a policy predicate, nothing more.

use crate::router::RecordKey;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
    /// Hard delete of soft-deleted rows; privileged.
    Purge,
}

/// The requesting actor. Authentication backends are out of scope; hosts
/// populate this from their own session machinery.
#[derive(Clone, Debug)]
pub struct Actor {
    pub id: Option<i64>,
    pub anonymous: bool,
}

impl Actor {
    pub fn anonymous() -> Self {
        Actor {
            id: None,
            anonymous: true,
        }
    }

    pub fn user(id: i64) -> Self {
        Actor {
            id: Some(id),
            anonymous: false,
        }
    }
}

/// `(action, resource, record-key?, actor) -> permit | deny`.
pub trait Policy: Send + Sync {
    fn permits(
        &self,
        action: Action,
        resource: (&str, &str),
        record: Option<&RecordKey>,
        actor: &Actor,
    ) -> bool;
}

/// Default open policy.
pub struct PermitAll;

impl Policy for PermitAll {
    fn permits(&self, _: Action, _: (&str, &str), _: Option<&RecordKey>, _: &Actor) -> bool {
        true
    }
}

/// Deny-everything policy, used in tests.
pub struct DenyAll;

impl Policy for DenyAll {
    fn permits(&self, _: Action, _: (&str, &str), _: Option<&RecordKey>, _: &Actor) -> bool {
        false
    }
}
