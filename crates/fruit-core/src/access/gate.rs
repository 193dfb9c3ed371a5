//! ============================================================================
//! Operator Gate - Static allow-list of operator identities
//! ============================================================================
//! Membership is fixed when the bot starts. Non-members are not rejected;
//! their messages simply go through the ordinary command set.
//! ============================================================================

use anyhow::{anyhow, Result};
use std::collections::BTreeSet;
use tracing::debug;

/// Operators allowed to run grant/revoke/list commands
pub const DEFAULT_OPERATOR_IDS: [i64; 2] = [6097752198, 5173037460];

/// What the dispatcher should treat a sender as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Operator,
    Member,
}

impl Role {
    pub fn is_operator(&self) -> bool {
        matches!(self, Role::Operator)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorAllowList {
    operators: BTreeSet<i64>,
}

impl OperatorAllowList {
    pub fn new(operators: impl IntoIterator<Item = i64>) -> Self {
        Self {
            operators: operators.into_iter().collect(),
        }
    }

    /// Parse a comma/whitespace separated id list, e.g. "6097752198, 5173037460"
    pub fn parse(raw: &str) -> Result<Self> {
        let mut operators = BTreeSet::new();
        for part in raw.split(|c: char| c == ',' || c.is_whitespace()) {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let id = part
                .parse::<i64>()
                .map_err(|e| anyhow!("Invalid operator id '{}': {}", part, e))?;
            operators.insert(id);
        }
        Ok(Self { operators })
    }

    pub fn role_of(&self, user_id: i64) -> Role {
        if self.operators.contains(&user_id) {
            debug!("User {} is an operator", user_id);
            Role::Operator
        } else {
            Role::Member
        }
    }

    pub fn is_operator(&self, user_id: i64) -> bool {
        self.role_of(user_id).is_operator()
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.operators.iter().copied()
    }
}

impl Default for OperatorAllowList {
    fn default() -> Self {
        Self::new(DEFAULT_OPERATOR_IDS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_operators() {
        let gate = OperatorAllowList::default();
        assert!(gate.is_operator(6097752198));
        assert!(gate.is_operator(5173037460));
        assert!(!gate.is_operator(1));
        assert_eq!(gate.role_of(1), Role::Member);
    }

    #[test]
    fn test_parse_list() {
        let gate = OperatorAllowList::parse(" 10, 20 30,,").unwrap();
        assert_eq!(gate.ids().collect::<Vec<_>>(), vec![10, 20, 30]);
        assert!(OperatorAllowList::parse("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = OperatorAllowList::parse("10,abc").unwrap_err();
        assert!(err.to_string().contains("abc"));
    }
}
