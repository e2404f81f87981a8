//! # Contract Rules
//!
//! Each command kind owns a fixed, ordered list of named predicates.
//!
//! Predicates whose structural precondition already failed (for example an
//! amount check when there is not exactly one output) pass vacuously, so
//! every defect is reported by exactly one rule in collect-all mode.

use shared_types::{Amount, Command, CommandKind, LedgerState, PartyKey, Proposal};
use std::collections::BTreeSet;

/// A predicate over the proposal and the command being verified.
pub type Predicate = fn(&Proposal, &Command) -> bool;

/// Category of a rule, which decides the error it raises.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuleKind {
    /// Shape or value constraint.
    Structure,
    /// Required signers constraint.
    SignerSet,
}

/// A named predicate.
#[derive(Clone, Copy, Debug)]
pub struct Rule {
    /// Human readable rule text, reported on failure.
    pub description: &'static str,
    /// Rule category.
    pub kind: RuleKind,
    /// Returns `true` when the rule holds.
    pub check: Predicate,
}

impl Rule {
    const fn structure(description: &'static str, check: Predicate) -> Self {
        Self {
            description,
            kind: RuleKind::Structure,
            check,
        }
    }

    const fn signers(description: &'static str, check: Predicate) -> Self {
        Self {
            description,
            kind: RuleKind::SignerSet,
            check,
        }
    }
}

// =============================================================================
// RULE TEXT
// =============================================================================

/// Issue: no inputs.
pub const ISSUE_NO_INPUTS: &str = "No inputs should be consumed when issuing an IOU.";
/// Issue: exactly one output.
pub const ISSUE_SINGLE_OUTPUT: &str =
    "Only one output state should be created when issuing an IOU.";
/// Issue: positive amount.
pub const ISSUE_POSITIVE_AMOUNT: &str = "A newly issued IOU must have a positive amount.";
/// Issue: paid within amount.
pub const ISSUE_PAID_WITHIN_AMOUNT: &str =
    "A newly issued IOU cannot have paid more than its amount.";
/// Issue: distinct parties.
pub const ISSUE_DISTINCT_PARTIES: &str = "The lender and borrower cannot have the same identity.";
/// Issue: signers.
pub const ISSUE_SIGNERS: &str =
    "Both lender and borrower together only may sign IOU issue transaction.";

/// Transfer: one input.
pub const TRANSFER_SINGLE_INPUT: &str =
    "An IOU transfer transaction should only consume one input state.";
/// Transfer: one output.
pub const TRANSFER_SINGLE_OUTPUT: &str =
    "An IOU transfer transaction should only create one output state.";
/// Transfer: only the lender may change.
pub const TRANSFER_ONLY_LENDER_CHANGES: &str = "Only the lender property may change.";
/// Transfer: lender must change.
pub const TRANSFER_LENDER_CHANGES: &str = "The lender property must change in a transfer.";
/// Transfer: distinct parties.
pub const TRANSFER_DISTINCT_PARTIES: &str =
    "The new lender and the borrower cannot have the same identity.";
/// Transfer: signers.
pub const TRANSFER_SIGNERS: &str =
    "The borrower, old lender and new lender only must sign an IOU transfer transaction.";

/// Settle: one input.
pub const SETTLE_SINGLE_INPUT: &str = "There must be one input IOU.";
/// Settle: positive payment.
pub const SETTLE_POSITIVE_PAYMENT: &str = "The payment must be a positive amount.";
/// Settle: payment currency.
pub const SETTLE_PAYMENT_CURRENCY: &str = "The payment must be in the currency of the IOU.";
/// Settle: no overpayment.
pub const SETTLE_NOT_OVERPAID: &str = "The payment cannot exceed the amount left unpaid.";
/// Settle: full settlement removes the IOU.
pub const SETTLE_FULL_NO_OUTPUT: &str =
    "There must be no output IOU as it has been fully settled.";
/// Settle: partial settlement keeps one IOU.
pub const SETTLE_PARTIAL_ONE_OUTPUT: &str = "There must be one output IOU.";
/// Settle: only paid changes.
pub const SETTLE_ONLY_PAID_CHANGES: &str =
    "Only the paid amount may change, and only by the payment.";
/// Settle: distinct parties.
pub const SETTLE_DISTINCT_PARTIES: &str =
    "The lender and borrower of a settled IOU cannot have the same identity.";
/// Settle: signers.
pub const SETTLE_SIGNERS: &str =
    "Both lender and borrower together only must sign IOU settle transaction.";

// =============================================================================
// RULE TABLES
// =============================================================================

const ISSUE_RULES: &[Rule] = &[
    Rule::structure(ISSUE_NO_INPUTS, |p, _| p.inputs.is_empty()),
    Rule::structure(ISSUE_SINGLE_OUTPUT, |p, _| p.outputs.len() == 1),
    Rule::structure(ISSUE_POSITIVE_AMOUNT, |p, _| {
        single_output(p).map_or(true, |o| o.amount.quantity > 0)
    }),
    Rule::structure(ISSUE_PAID_WITHIN_AMOUNT, |p, _| {
        single_output(p).map_or(true, |o| {
            o.paid.currency == o.amount.currency
                && o.paid.quantity >= 0
                && o.paid.quantity <= o.amount.quantity
        })
    }),
    Rule::structure(ISSUE_DISTINCT_PARTIES, |p, _| {
        single_output(p).map_or(true, distinct_parties)
    }),
    Rule::signers(ISSUE_SIGNERS, |p, c| {
        single_output(p).map_or(true, |o| c.signers == o.participant_keys())
    }),
];

const TRANSFER_RULES: &[Rule] = &[
    Rule::structure(TRANSFER_SINGLE_INPUT, |p, _| p.inputs.len() == 1),
    Rule::structure(TRANSFER_SINGLE_OUTPUT, |p, _| p.outputs.len() == 1),
    Rule::structure(TRANSFER_ONLY_LENDER_CHANGES, |p, _| {
        match (single_input(p), single_output(p)) {
            (Some(i), Some(o)) => i.with_new_lender(o.lender.clone()) == *o,
            _ => true,
        }
    }),
    Rule::structure(TRANSFER_LENDER_CHANGES, |p, _| {
        match (single_input(p), single_output(p)) {
            (Some(i), Some(o)) => i.lender.owning_key != o.lender.owning_key,
            _ => true,
        }
    }),
    Rule::structure(TRANSFER_DISTINCT_PARTIES, |p, _| {
        single_output(p).map_or(true, distinct_parties)
    }),
    Rule::signers(TRANSFER_SIGNERS, |p, c| {
        match (single_input(p), single_output(p)) {
            (Some(i), Some(o)) => {
                let expected: BTreeSet<PartyKey> = i
                    .participant_keys()
                    .union(&o.participant_keys())
                    .copied()
                    .collect();
                c.signers == expected
            }
            _ => true,
        }
    }),
];

const SETTLE_RULES: &[Rule] = &[
    Rule::structure(SETTLE_SINGLE_INPUT, |p, _| p.inputs.len() == 1),
    Rule::structure(SETTLE_POSITIVE_PAYMENT, |_, c| {
        payment(c).map_or(true, |pay| pay.quantity > 0)
    }),
    Rule::structure(SETTLE_PAYMENT_CURRENCY, |p, c| {
        match (single_input(p), payment(c)) {
            (Some(i), Some(pay)) => pay.currency == i.amount.currency,
            _ => true,
        }
    }),
    Rule::structure(SETTLE_NOT_OVERPAID, |p, c| {
        remaining_after_payment(p, c).map_or(true, |left| left >= 0)
    }),
    Rule::structure(SETTLE_FULL_NO_OUTPUT, |p, c| {
        match remaining_after_payment(p, c) {
            Some(0) => p.outputs.is_empty(),
            _ => true,
        }
    }),
    Rule::structure(SETTLE_PARTIAL_ONE_OUTPUT, |p, c| {
        match remaining_after_payment(p, c) {
            Some(left) if left > 0 => p.outputs.len() == 1,
            _ => true,
        }
    }),
    Rule::structure(SETTLE_ONLY_PAID_CHANGES, |p, c| {
        match (remaining_after_payment(p, c), single_input(p), single_output(p), payment(c)) {
            (Some(left), Some(i), Some(o), Some(pay)) if left > 0 => {
                i.pay(pay).map_or(false, |expected| expected == *o)
            }
            _ => true,
        }
    }),
    Rule::structure(SETTLE_DISTINCT_PARTIES, |p, _| {
        single_input(p).map_or(true, distinct_parties) && p.outputs.iter().all(distinct_parties)
    }),
    Rule::signers(SETTLE_SIGNERS, |p, c| {
        single_input(p).map_or(true, |i| c.signers == i.participant_keys())
    }),
];

/// Ordered rule list for a command kind.
pub fn rules_for(kind: &CommandKind) -> &'static [Rule] {
    match kind {
        CommandKind::Issue => ISSUE_RULES,
        CommandKind::Transfer => TRANSFER_RULES,
        CommandKind::Settle { .. } => SETTLE_RULES,
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn single_input(p: &Proposal) -> Option<&LedgerState> {
    match p.inputs.as_slice() {
        [only] => Some(&only.state),
        _ => None,
    }
}

fn single_output(p: &Proposal) -> Option<&LedgerState> {
    match p.outputs.as_slice() {
        [only] => Some(only),
        _ => None,
    }
}

fn distinct_parties(state: &LedgerState) -> bool {
    state.lender.owning_key != state.borrower.owning_key
}

fn payment(c: &Command) -> Option<&Amount> {
    match &c.kind {
        CommandKind::Settle { payment } => Some(payment),
        _ => None,
    }
}

/// Outstanding quantity after the payment, when it is well defined.
fn remaining_after_payment(p: &Proposal, c: &Command) -> Option<i64> {
    let input = single_input(p)?;
    let pay = payment(c)?;
    if pay.quantity <= 0 {
        return None;
    }
    let outstanding = input.outstanding().ok()?;
    outstanding.checked_sub(pay).ok().map(|left| left.quantity)
}
