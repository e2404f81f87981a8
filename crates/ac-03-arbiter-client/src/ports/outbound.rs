//! # Outbound Ports
//!
//! The arbiter is an external collaborator; only its request/response
//! contract is modelled here.

use crate::domain::{ArbiterError, NotarizationOutcome};
use async_trait::async_trait;
use shared_types::EndorsedProposal;
use std::sync::Arc;

/// Uniqueness and finality service - outbound port.
#[async_trait]
pub trait ArbiterClient: Send + Sync {
    /// Submit a fully endorsed transaction.
    ///
    /// Must be idempotent by transaction id.
    async fn notarize(
        &self,
        endorsed: &EndorsedProposal,
    ) -> Result<NotarizationOutcome, ArbiterError>;
}

#[async_trait]
impl<T: ArbiterClient + ?Sized> ArbiterClient for Arc<T> {
    async fn notarize(
        &self,
        endorsed: &EndorsedProposal,
    ) -> Result<NotarizationOutcome, ArbiterError> {
        (**self).notarize(endorsed).await
    }
}
