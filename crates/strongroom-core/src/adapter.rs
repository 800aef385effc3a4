//! Ledger adapter
//!
//! Turns a raw ledger transaction into a [`TransactionPayment`], merging in
//! the transaction's annotation and funding any payment requests it pays.

use crate::annotation::{AnnotationStore, TransactionAnnotation};
use crate::fiat::FiatPayment;
use crate::ledger::{
    AddressResolver, Classification, ExchangeRateSource, LedgerTransaction, WalletView,
};
use crate::payment::TransactionPayment;
use crate::request::PaymentRequestStore;
use crate::status::{calculate_payment_type, calculate_status, PaymentType};
use crate::Result;

/// Separator between the "To"/"By" prefix and the address list
pub const PREFIX_SEPARATOR: &str = ": ";

/// Adapter over the two stores and the ledger collaborators
pub struct LedgerAdapter<'a> {
    requests: &'a PaymentRequestStore,
    annotations: &'a AnnotationStore,
    resolver: &'a dyn AddressResolver,
    rates: &'a dyn ExchangeRateSource,
}

impl<'a> LedgerAdapter<'a> {
    /// Create an adapter
    pub fn new(
        requests: &'a PaymentRequestStore,
        annotations: &'a AnnotationStore,
        resolver: &'a dyn AddressResolver,
        rates: &'a dyn ExchangeRateSource,
    ) -> Self {
        Self {
            requests,
            annotations,
            resolver,
            rates,
        }
    }

    /// Adapt a ledger transaction.
    ///
    /// May fund payment requests and create the transaction's annotation.
    /// Fails if any relevant output script cannot be resolved to an address.
    pub fn adapt<W: WalletView + ?Sized>(
        &self,
        wallet: &W,
        transaction: &LedgerTransaction,
    ) -> Result<TransactionPayment> {
        let hash = transaction.hash.as_str();
        let amount = wallet.value_of(transaction);

        let classification = transaction.confidence.map(|c| c.classification);
        let (depth, broadcast_peers) = match transaction.confidence {
            Some(confidence) if confidence.classification == Classification::Confirmed => {
                (confidence.depth, confidence.broadcast_peers)
            }
            Some(confidence) => (0, confidence.broadcast_peers),
            None => (0, 0),
        };

        let status = calculate_status(classification, depth, broadcast_peers);
        let payment_type = calculate_payment_type(amount, depth);
        let amount_fiat = self.calculate_fiat_payment(hash, amount);
        let description = self.describe_and_fund(wallet, transaction, payment_type, amount)?;
        let output_addresses = self.output_addresses(transaction)?;

        let mut payment = TransactionPayment {
            hash: hash.to_string(),
            date: transaction.update_time,
            status,
            amount,
            amount_fiat,
            mining_fee: None,
            client_fee: None,
            classification,
            payment_type,
            description,
            note: String::new(),
            is_coinbase: transaction.is_coinbase,
            output_addresses,
            raw_transaction: hex::encode(&transaction.raw),
            size: transaction.raw.len(),
        };

        if let Some(annotation) = self.annotations.get(hash) {
            if payment_type.is_outgoing() {
                payment.mining_fee = annotation.miner_fee;
                payment.client_fee = annotation.client_fee;
            }
            if let Some(note) = annotation.note {
                if !note.is_empty() {
                    payment.description = note.clone();
                }
                payment.note = note;
            }
            payment.amount_fiat = annotation.amount_fiat;
        }

        Ok(payment)
    }

    /// Record a fiat snapshot for a transaction seen on the network.
    ///
    /// Returns `true` if this call created the annotation.
    pub fn note_transaction_seen(&self, hash: &str, amount: i64) -> bool {
        if self.annotations.contains(hash) {
            return false;
        }
        let fiat = FiatPayment::valued_at(amount, self.rates.latest_rate().as_ref());
        let (stored, inserted) = self
            .annotations
            .insert_if_absent(TransactionAnnotation::new(hash, fiat));
        if inserted {
            tracing::debug!("Created transaction annotation: {:?}", stored);
        } else {
            tracing::debug!(
                "Not adding annotation for {} - another caller already added one",
                hash
            );
        }
        inserted
    }

    /// Pinned fiat snapshot for the hash, creating it from the latest rate
    fn calculate_fiat_payment(&self, hash: &str, amount: i64) -> FiatPayment {
        if let Some(existing) = self.annotations.get(hash) {
            return existing.amount_fiat;
        }
        let fiat = FiatPayment::valued_at(amount, self.rates.latest_rate().as_ref());
        let (stored, _) = self
            .annotations
            .insert_if_absent(TransactionAnnotation::new(hash, fiat));
        stored.amount_fiat
    }

    fn describe_and_fund<W: WalletView + ?Sized>(
        &self,
        wallet: &W,
        transaction: &LedgerTransaction,
        payment_type: PaymentType,
        amount: i64,
    ) -> Result<String> {
        if !payment_type.is_incoming() {
            let addresses = self.output_addresses(transaction)?;
            return Ok(format!("To{}{}", PREFIX_SEPARATOR, addresses.join(" ")));
        }

        let funded_value = u64::try_from(amount).unwrap_or(0);
        let mut addresses = Vec::new();
        let mut descriptive = Vec::new();

        for output in transaction.outputs.iter().filter(|o| wallet.is_mine(o)) {
            let address = self.resolver.address_from_script(&output.script_pubkey)?;

            if let Some(request) =
                self.requests
                    .record_funding(&address, &transaction.hash, funded_value)
            {
                descriptive.extend(
                    [request.label, request.note]
                        .into_iter()
                        .flatten()
                        .filter(|text| !text.is_empty()),
                );
            }
            addresses.push(address);
        }

        if descriptive.is_empty() {
            Ok(format!("By{}{}", PREFIX_SEPARATOR, addresses.join(" ")))
        } else {
            Ok(descriptive.join(" "))
        }
    }

    fn output_addresses(&self, transaction: &LedgerTransaction) -> Result<Vec<String>> {
        transaction
            .outputs
            .iter()
            .map(|output| self.resolver.address_from_script(&output.script_pubkey))
            .collect()
    }
}
