//! Default responder policy for IOUs.
//!
//! Role checks made from the receiving party's point of view. Contract
//! rules are already enforced by the engine before the policy runs.

use crate::ports::ResponderPolicy;
use shared_types::{Party, Proposal};

/// Endorses only IOUs in which this party holds a role, and never one
/// that would make it both lender and borrower.
#[derive(Clone, Copy, Debug, Default)]
pub struct IouResponderPolicy;

impl ResponderPolicy for IouResponderPolicy {
    fn check(&self, proposal: &Proposal, me: &Party) -> Result<(), String> {
        let mut states = proposal
            .inputs
            .iter()
            .map(|i| &i.state)
            .chain(proposal.outputs.iter());

        if proposal.outputs.iter().any(|o| {
            o.lender.owning_key == me.owning_key && o.borrower.owning_key == me.owning_key
        }) {
            return Err("Lender cannot be borrower".to_string());
        }
        if !states.any(|s| s.participant_keys().contains(&me.owning_key)) {
            return Err(format!("{} is neither lender nor borrower", me.name));
        }
        Ok(())
    }
}
