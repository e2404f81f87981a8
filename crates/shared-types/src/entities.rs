//! # Core Domain Entities
//!
//! Parties, amounts and the ledger facts they share.
//!
//! ## Clusters
//!
//! - **Identity**: `Party`, `PartyKey`
//! - **Value**: `Amount`
//! - **Facts**: `LedgerState`, `UniqueIdentifier`, `StateRef`, `StateAndRef`

use crate::errors::AmountError;
use crate::transaction::TxId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// A 32-byte digest.
pub type Hash = [u8; 32];

// =============================================================================
// CLUSTER A: IDENTITY
// =============================================================================

/// A party's Ed25519 public key.
///
/// Ordered so that signer sets are `BTreeSet<PartyKey>` and iterate
/// identically on every machine.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PartyKey(pub [u8; 32]);

impl PartyKey {
    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for PartyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0[..4] {
            write!(f, "{:02x}", b)?;
        }
        write!(f, "..")
    }
}

impl fmt::Debug for PartyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PartyKey({})", self)
    }
}

/// A well-known legal identity on the network.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Party {
    /// Human readable legal name.
    pub name: String,
    /// Key that signs on behalf of this party.
    pub owning_key: PartyKey,
}

impl Party {
    /// Create a new party.
    pub fn new(name: impl Into<String>, owning_key: PartyKey) -> Self {
        Self {
            name: name.into(),
            owning_key,
        }
    }
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.owning_key)
    }
}

// =============================================================================
// CLUSTER B: VALUE
// =============================================================================

/// A quantity of a currency in minor units (e.g. cents).
///
/// The quantity is signed so that malformed proposals carrying zero or
/// negative amounts can be represented and rejected by the contract.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Amount {
    /// Number of minor units.
    pub quantity: i64,
    /// ISO currency code.
    pub currency: String,
}

impl Amount {
    /// Create a new amount.
    pub fn new(quantity: i64, currency: impl Into<String>) -> Self {
        Self {
            quantity,
            currency: currency.into(),
        }
    }

    /// Zero of the given currency.
    pub fn zero(currency: impl Into<String>) -> Self {
        Self::new(0, currency)
    }

    /// Add two amounts of the same currency.
    pub fn checked_add(&self, other: &Amount) -> Result<Amount, AmountError> {
        self.same_currency(other)?;
        let quantity = self
            .quantity
            .checked_add(other.quantity)
            .ok_or(AmountError::Overflow)?;
        Ok(Amount::new(quantity, self.currency.clone()))
    }

    /// Subtract an amount of the same currency.
    pub fn checked_sub(&self, other: &Amount) -> Result<Amount, AmountError> {
        self.same_currency(other)?;
        let quantity = self
            .quantity
            .checked_sub(other.quantity)
            .ok_or(AmountError::Overflow)?;
        Ok(Amount::new(quantity, self.currency.clone()))
    }

    fn same_currency(&self, other: &Amount) -> Result<(), AmountError> {
        if self.currency != other.currency {
            return Err(AmountError::CurrencyMismatch {
                left: self.currency.clone(),
                right: other.currency.clone(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.quantity, self.currency)
    }
}

// =============================================================================
// CLUSTER C: FACTS
// =============================================================================

/// Stable identifier shared by every version of one logical fact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UniqueIdentifier {
    /// Optional identifier meaningful outside the ledger.
    pub external_id: Option<String>,
    /// Random component.
    pub id: Uuid,
}

impl UniqueIdentifier {
    /// Generate a fresh identifier.
    pub fn new(external_id: Option<String>) -> Self {
        Self {
            external_id,
            id: Uuid::new_v4(),
        }
    }
}

impl Default for UniqueIdentifier {
    fn default() -> Self {
        Self::new(None)
    }
}

/// An IOU: `borrower` owes `amount` to `lender`, of which `paid` is settled.
///
/// Instances are immutable values. Use [`LedgerState::pay`] and
/// [`LedgerState::with_new_lender`] to derive the next version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LedgerState {
    /// Face value of the obligation.
    pub amount: Amount,
    /// Party owed the amount.
    pub lender: Party,
    /// Party owing the amount.
    pub borrower: Party,
    /// Amount settled so far.
    pub paid: Amount,
    /// Links all versions of this IOU.
    pub linear_id: UniqueIdentifier,
}

impl LedgerState {
    /// Create a new, unpaid IOU with a fresh linear id.
    pub fn new(amount: Amount, lender: Party, borrower: Party) -> Self {
        let paid = Amount::zero(amount.currency.clone());
        Self {
            amount,
            lender,
            borrower,
            paid,
            linear_id: UniqueIdentifier::default(),
        }
    }

    /// Parties that must be informed of, and agree to, changes to this fact.
    pub fn participants(&self) -> [&Party; 2] {
        [&self.lender, &self.borrower]
    }

    /// Keys of all participants.
    pub fn participant_keys(&self) -> BTreeSet<PartyKey> {
        self.participants().iter().map(|p| p.owning_key).collect()
    }

    /// Amount still owed.
    pub fn outstanding(&self) -> Result<Amount, AmountError> {
        self.amount.checked_sub(&self.paid)
    }

    /// Next version with `amount` added to `paid`.
    pub fn pay(&self, amount: &Amount) -> Result<LedgerState, AmountError> {
        Ok(Self {
            paid: self.paid.checked_add(amount)?,
            ..self.clone()
        })
    }

    /// Next version owed to a different lender.
    pub fn with_new_lender(&self, new_lender: Party) -> LedgerState {
        Self {
            lender: new_lender,
            ..self.clone()
        }
    }
}

/// Pointer to an output of a finalized transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateRef {
    /// Transaction that created the state.
    pub tx_id: TxId,
    /// Position in that transaction's outputs.
    pub index: u32,
}

impl fmt::Display for StateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.tx_id, self.index)
    }
}

/// A resolved input: the state together with where it was created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateAndRef {
    /// The consumed fact.
    pub state: LedgerState,
    /// Its location on the ledger.
    pub reference: StateRef,
}
