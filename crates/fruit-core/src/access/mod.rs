//! ============================================================================
//! Access Module - Operator allow-list
//! ============================================================================
//! Decides whether a sender may use the operator command set.
//!
//! ## Usage
//! ```rust,ignore
//! use fruit_core::access::OperatorAllowList;
//!
//! let gate = OperatorAllowList::parse("6097752198,5173037460")?;
//! if gate.is_operator(sender_id) { /* grant, revoke, list */ }
//! ```
//! ============================================================================

mod gate;

pub use gate::{OperatorAllowList, Role, DEFAULT_OPERATOR_IDS};
