//! # Transactions
//!
//! Commands, proposals and the two signed forms a proposal passes through
//! on its way to the ledger.
//!
//! ```text
//! Proposal ──sign──→ EndorsedProposal ──(all signers)──→ FullyEndorsed
//!                                                            │
//!                                               arbiter token│
//!                                                            ↓
//!                                                 FinalizedTransaction
//! ```

use crate::entities::{Amount, Hash, LedgerState, Party, PartyKey, StateAndRef, StateRef};
use crate::errors::EndorsementError;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Domain separation tag for proposal ids.
const PROPOSAL_DOMAIN: &[u8] = b"accord/proposal/v1";

/// Content-derived transaction identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TxId(pub Hash);

impl TxId {
    /// Raw id bytes; this is the payload every signature covers.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0[..6] {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

impl fmt::Debug for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxId({})", self)
    }
}

// =============================================================================
// COMMANDS
// =============================================================================

/// Closed set of intents understood by the IOU contract.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandKind {
    /// Create a new IOU.
    Issue,
    /// Move an IOU to a new lender.
    Transfer,
    /// Record a payment against an IOU.
    Settle {
        /// Amount being paid.
        payment: Amount,
    },
}

impl CommandKind {
    /// Short name used in logs and rule reports.
    pub fn name(&self) -> &'static str {
        match self {
            CommandKind::Issue => "Issue",
            CommandKind::Transfer => "Transfer",
            CommandKind::Settle { .. } => "Settle",
        }
    }
}

/// A command and the keys that must sign for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// The intent.
    pub kind: CommandKind,
    /// Keys required to sign.
    pub signers: BTreeSet<PartyKey>,
}

impl Command {
    /// Create a command.
    pub fn new(kind: CommandKind, signers: impl IntoIterator<Item = PartyKey>) -> Self {
        Self {
            kind,
            signers: signers.into_iter().collect(),
        }
    }
}

/// Validity window checked by the arbiter, in Unix milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Inclusive lower bound.
    pub from_ms: Option<u64>,
    /// Exclusive upper bound.
    pub until_ms: Option<u64>,
}

impl TimeWindow {
    /// Window that closes at `until_ms`.
    pub fn until(until_ms: u64) -> Self {
        Self {
            from_ms: None,
            until_ms: Some(until_ms),
        }
    }

    /// Whether `now_ms` falls inside the window.
    pub fn contains(&self, now_ms: u64) -> bool {
        self.from_ms.map_or(true, |from| now_ms >= from)
            && self.until_ms.map_or(true, |until| now_ms < until)
    }
}

// =============================================================================
// PROPOSAL
// =============================================================================

/// A candidate ledger transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    /// Consumed states, in order. Empty for issuance.
    pub inputs: Vec<StateAndRef>,
    /// Created states, in order.
    pub outputs: Vec<LedgerState>,
    /// Commands declaring intent and required signers.
    pub commands: Vec<Command>,
    /// Arbiter responsible for uniqueness of the inputs.
    pub arbiter: Party,
    /// Optional validity window.
    pub time_window: Option<TimeWindow>,
    /// Random salt so equal drafts get distinct ids.
    pub salt: [u8; 16],
}

impl Proposal {
    /// Compute the content-derived id.
    pub fn id(&self) -> TxId {
        let mut hasher = Sha256::new();
        hasher.update(PROPOSAL_DOMAIN);

        hasher.update((self.inputs.len() as u32).to_le_bytes());
        for input in &self.inputs {
            hasher.update(input.reference.tx_id.as_bytes());
            hasher.update(input.reference.index.to_le_bytes());
            hash_state(&mut hasher, &input.state);
        }

        hasher.update((self.outputs.len() as u32).to_le_bytes());
        for output in &self.outputs {
            hash_state(&mut hasher, output);
        }

        hasher.update((self.commands.len() as u32).to_le_bytes());
        for command in &self.commands {
            hash_command(&mut hasher, command);
        }

        hash_party(&mut hasher, &self.arbiter);

        match &self.time_window {
            Some(window) => {
                hasher.update([1u8]);
                hash_opt_u64(&mut hasher, window.from_ms);
                hash_opt_u64(&mut hasher, window.until_ms);
            }
            None => hasher.update([0u8]),
        }

        hasher.update(self.salt);
        TxId(hasher.finalize().into())
    }

    /// Union of every command's signers.
    pub fn required_signers(&self) -> BTreeSet<PartyKey> {
        self.commands
            .iter()
            .flat_map(|c| c.signers.iter().copied())
            .collect()
    }

    /// References of every consumed state.
    pub fn input_refs(&self) -> Vec<StateRef> {
        self.inputs.iter().map(|i| i.reference).collect()
    }

    /// Find the well-known party behind a key among inputs and outputs.
    pub fn party_for_key(&self, key: &PartyKey) -> Option<&Party> {
        self.inputs
            .iter()
            .map(|i| &i.state)
            .chain(self.outputs.iter())
            .flat_map(|s| s.participants())
            .find(|p| p.owning_key == *key)
    }
}

fn hash_str(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u32).to_le_bytes());
    hasher.update(value.as_bytes());
}

fn hash_opt_u64(hasher: &mut Sha256, value: Option<u64>) {
    match value {
        Some(v) => {
            hasher.update([1u8]);
            hasher.update(v.to_le_bytes());
        }
        None => hasher.update([0u8]),
    }
}

fn hash_amount(hasher: &mut Sha256, amount: &Amount) {
    hasher.update(amount.quantity.to_le_bytes());
    hash_str(hasher, &amount.currency);
}

fn hash_party(hasher: &mut Sha256, party: &Party) {
    hash_str(hasher, &party.name);
    hasher.update(party.owning_key.as_bytes());
}

fn hash_state(hasher: &mut Sha256, state: &LedgerState) {
    hash_amount(hasher, &state.amount);
    hash_party(hasher, &state.lender);
    hash_party(hasher, &state.borrower);
    hash_amount(hasher, &state.paid);
    match &state.linear_id.external_id {
        Some(ext) => {
            hasher.update([1u8]);
            hash_str(hasher, ext);
        }
        None => hasher.update([0u8]),
    }
    hasher.update(state.linear_id.id.as_bytes());
}

fn hash_command(hasher: &mut Sha256, command: &Command) {
    match &command.kind {
        CommandKind::Issue => hasher.update([1u8]),
        CommandKind::Transfer => hasher.update([2u8]),
        CommandKind::Settle { payment } => {
            hasher.update([3u8]);
            hash_amount(hasher, payment);
        }
    }
    hasher.update((command.signers.len() as u32).to_le_bytes());
    for signer in &command.signers {
        hasher.update(signer.as_bytes());
    }
}

// =============================================================================
// SIGNATURES
// =============================================================================

/// A signature over a transaction id.
#[serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSignature {
    /// Signing key.
    pub by: PartyKey,
    /// Ed25519 signature bytes.
    #[serde_as(as = "Bytes")]
    pub bytes: [u8; 64],
}

/// A proposal plus the endorsements gathered so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndorsedProposal {
    /// The proposal being endorsed.
    pub proposal: Proposal,
    signatures: BTreeMap<PartyKey, TransactionSignature>,
}

impl EndorsedProposal {
    /// Start with no signatures.
    pub fn new(proposal: Proposal) -> Self {
        Self {
            proposal,
            signatures: BTreeMap::new(),
        }
    }

    /// Id of the underlying proposal.
    pub fn id(&self) -> TxId {
        self.proposal.id()
    }

    /// Record a signature.
    ///
    /// Rejects signers outside the required set and any addition once the
    /// proposal is fully endorsed. Replacing an existing signature from the
    /// same key before that point is allowed.
    pub fn add_signature(&mut self, signature: TransactionSignature) -> Result<(), EndorsementError> {
        if self.is_fully_endorsed() {
            return Err(EndorsementError::AlreadyFullyEndorsed);
        }
        if !self.proposal.required_signers().contains(&signature.by) {
            return Err(EndorsementError::NotARequiredSigner(signature.by));
        }
        self.signatures.insert(signature.by, signature);
        Ok(())
    }

    /// Signatures collected so far.
    pub fn signatures(&self) -> impl Iterator<Item = &TransactionSignature> {
        self.signatures.values()
    }

    /// Signature from a particular key, if present.
    pub fn signature_of(&self, key: &PartyKey) -> Option<&TransactionSignature> {
        self.signatures.get(key)
    }

    /// Required keys that have not signed yet.
    pub fn missing_signers(&self) -> BTreeSet<PartyKey> {
        self.proposal
            .required_signers()
            .into_iter()
            .filter(|k| !self.signatures.contains_key(k))
            .collect()
    }

    /// Whether every required signer has signed.
    pub fn is_fully_endorsed(&self) -> bool {
        self.missing_signers().is_empty()
    }

    /// Drop all signatures, keeping the proposal.
    pub fn clear_signatures(&mut self) {
        self.signatures.clear();
    }
}

/// The arbiter's signed acceptance of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArbiterToken {
    /// Accepted transaction.
    pub tx_id: TxId,
    /// Arbiter key.
    pub arbiter: PartyKey,
    /// Position in the arbiter's acceptance log.
    pub sequence: u64,
    /// Arbiter signature over `signing_payload(tx_id, sequence)`.
    pub signature: TransactionSignature,
}

impl ArbiterToken {
    /// Bytes the arbiter signs.
    pub fn signing_payload(tx_id: &TxId, sequence: u64) -> Vec<u8> {
        let mut payload = Vec::with_capacity(40);
        payload.extend_from_slice(tx_id.as_bytes());
        payload.extend_from_slice(&sequence.to_le_bytes());
        payload
    }
}

/// A committed transaction. Terminal and immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizedTransaction {
    /// Fully endorsed proposal.
    pub endorsed: EndorsedProposal,
    /// Arbiter acceptance.
    pub token: ArbiterToken,
}

impl FinalizedTransaction {
    /// Transaction id.
    pub fn id(&self) -> TxId {
        self.endorsed.id()
    }

    /// Outputs of this transaction as spendable references.
    pub fn output_refs(&self) -> Vec<StateAndRef> {
        let tx_id = self.id();
        self.endorsed
            .proposal
            .outputs
            .iter()
            .enumerate()
            .map(|(index, state)| StateAndRef {
                state: state.clone(),
                reference: StateRef {
                    tx_id,
                    index: index as u32,
                },
            })
            .collect()
    }
}
