//! Payment status and type derivation
//!
//! Status is a pure function of the confidence classification, the depth in
//! blocks and the number of relaying peers.

use serde::{Deserialize, Serialize};

use crate::ledger::Classification;

/// Traffic-light severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RagStatus {
    /// Dead, double spent or never broadcast
    Red,
    /// Unconfirmed or unknown
    Amber,
    /// One or more confirmations
    Green,
}

/// Machine-readable reason behind a status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusKey {
    /// Confirmed by exactly one block
    ConfirmedByOneBlock,
    /// Confirmed by several blocks (context: depth)
    ConfirmedBySeveralBlocks,
    /// Relayed by peers but unconfirmed (context: peer count)
    Broadcast,
    /// Not seen on the network
    NotBroadcast,
    /// Dead
    Dead,
    /// Unknown
    Unknown,
    /// Payment request with nothing paid yet
    PaymentRequested,
    /// Payment request partially paid
    PaymentPartPaid,
}

/// Derived payment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaymentStatus {
    /// Severity
    pub rag: RagStatus,
    /// Reason code
    pub key: StatusKey,
    /// Optional numeric context for the reason
    pub context: Option<u32>,
    /// Depth in blocks (0 when unconfirmed)
    pub depth: u32,
}

impl PaymentStatus {
    /// Status without context or depth
    pub fn new(rag: RagStatus, key: StatusKey) -> Self {
        Self {
            rag,
            key,
            context: None,
            depth: 0,
        }
    }

    /// Attach numeric context
    pub fn with_context(mut self, context: u32) -> Self {
        self.context = Some(context);
        self
    }

    /// Attach depth
    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }
}

/// Payment direction and progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentType {
    /// Outgoing, unconfirmed
    Sending,
    /// Outgoing, confirmed
    Sent,
    /// Incoming, unconfirmed
    Receiving,
    /// Incoming, confirmed
    Received,
    /// Payment request with nothing paid
    Requested,
    /// Payment request partially paid
    PartPaid,
}

impl PaymentType {
    /// Whether this is an outgoing transaction
    pub fn is_outgoing(&self) -> bool {
        matches!(self, PaymentType::Sending | PaymentType::Sent)
    }

    /// Whether this is an incoming transaction
    pub fn is_incoming(&self) -> bool {
        matches!(self, PaymentType::Receiving | PaymentType::Received)
    }
}

/// Calculate the status of a transaction.
///
/// * RED: dead, or never left this wallet
/// * AMBER: unconfirmed or unknown
/// * GREEN: one or more confirmations
pub fn calculate_status(
    classification: Option<Classification>,
    depth: u32,
    broadcast_peers: u32,
) -> PaymentStatus {
    match classification {
        Some(Classification::Confirmed) => {
            let status = if depth == 1 {
                PaymentStatus::new(RagStatus::Green, StatusKey::ConfirmedByOneBlock)
            } else {
                PaymentStatus::new(RagStatus::Green, StatusKey::ConfirmedBySeveralBlocks)
                    .with_context(depth)
            };
            status.with_depth(depth)
        }
        Some(Classification::Pending) => {
            if broadcast_peers >= 1 {
                PaymentStatus::new(RagStatus::Amber, StatusKey::Broadcast)
                    .with_context(broadcast_peers)
            } else {
                PaymentStatus::new(RagStatus::Red, StatusKey::NotBroadcast)
            }
        }
        Some(Classification::Dead) => PaymentStatus::new(RagStatus::Red, StatusKey::Dead),
        Some(Classification::Unknown) | None => {
            PaymentStatus::new(RagStatus::Amber, StatusKey::Unknown)
        }
    }
}

/// Calculate the payment type from the net value and depth
pub fn calculate_payment_type(value: i64, depth: u32) -> PaymentType {
    match (value < 0, depth == 0) {
        (true, true) => PaymentType::Sending,
        (true, false) => PaymentType::Sent,
        (false, true) => PaymentType::Receiving,
        (false, false) => PaymentType::Received,
    }
}
