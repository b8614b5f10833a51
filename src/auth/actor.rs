//! The authenticated caller of an engine operation

use std::collections::BTreeSet;

use super::permissions::{can, can_access_owned, Capability, Operation, Role};
use crate::types::{Result, WildwatchError};

/// Identity, role and capabilities of whoever is making a call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub role: Role,
    pub capabilities: BTreeSet<Capability>,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
            capabilities: BTreeSet::new(),
        }
    }

    pub fn with_capabilities(mut self, caps: impl IntoIterator<Item = Capability>) -> Self {
        self.capabilities.extend(caps);
        self
    }

    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }

    pub fn can(&self, operation: Operation) -> bool {
        can(self.role, &self.capabilities, operation)
    }

    /// Fail with `Forbidden` unless the policy allows `operation`
    pub fn require(&self, operation: Operation) -> Result<()> {
        if self.can(operation) {
            Ok(())
        } else {
            Err(self.denied(operation))
        }
    }

    /// Like [`Actor::require`] for an entity owned by `owner`
    pub fn require_owned(&self, any: Operation, own: Operation, owner: Option<&str>) -> Result<()> {
        let is_owner = owner == Some(self.id.as_str());
        if can_access_owned(self.role, &self.capabilities, any, own, is_owner) {
            Ok(())
        } else {
            Err(self.denied(any))
        }
    }

    fn denied(&self, operation: Operation) -> WildwatchError {
        WildwatchError::Forbidden(format!(
            "{} {} may not {}",
            self.role,
            self.id,
            operation.description()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_maps_denial_to_forbidden() {
        let citizen = Actor::new("c1", Role::Citizen);
        assert!(citizen.require(Operation::SubmitReport).is_ok());
        assert!(matches!(
            citizen.require(Operation::TransitionCase),
            Err(WildwatchError::Forbidden(_))
        ));
    }

    #[test]
    fn test_require_owned() {
        let citizen = Actor::new("c1", Role::Citizen);
        assert!(citizen
            .require_owned(Operation::ReadAllCases, Operation::ReadOwnCases, Some("c1"))
            .is_ok());
        assert!(citizen
            .require_owned(Operation::ReadAllCases, Operation::ReadOwnCases, Some("c2"))
            .is_err());
        assert!(citizen
            .require_owned(Operation::ReadAllCases, Operation::ReadOwnCases, None)
            .is_err());
    }
}
