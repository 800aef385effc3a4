//! Ordering, subsetting and text search over payment lists

use chrono::NaiveDate;
use std::cmp::Ordering;

use crate::payment::Payment;
use crate::status::PaymentType;

/// Date descending, then amount ascending
fn compare_payments(a: &Payment, b: &Payment) -> Ordering {
    b.date()
        .cmp(&a.date())
        .then_with(|| a.amount().cmp(&b.amount()))
}

/// Sort in place: newest first, ties broken by amount ascending
pub fn sort_payments(payments: &mut [Payment]) {
    payments.sort_by(compare_payments);
}

/// Payments of the filter's kind dated `today`, sorted.
///
/// `Sending` selects outgoing unconfirmed payments. `Receiving` selects
/// requests and incoming unconfirmed payments. Other filters yield nothing.
pub fn subset_payments_and_sort(
    payments: &[Payment],
    filter: PaymentType,
    today: NaiveDate,
) -> Vec<Payment> {
    let wanted: &[PaymentType] = match filter {
        PaymentType::Sending => &[PaymentType::Sending],
        PaymentType::Receiving => &[
            PaymentType::Requested,
            PaymentType::Receiving,
            PaymentType::PartPaid,
        ],
        _ => &[],
    };

    let mut subset: Vec<Payment> = payments
        .iter()
        .filter(|payment| wanted.contains(&payment.payment_type()))
        .filter(|payment| payment.date().date_naive() == today)
        .cloned()
        .collect();
    sort_payments(&mut subset);
    subset
}

/// Payments matching `query`, sorted.
///
/// Text fields match case-insensitively; a request address must equal
/// `query` exactly.
pub fn filter_payments_by_content(payments: &[Payment], query: &str) -> Vec<Payment> {
    let needle = query.to_lowercase();
    let mut matches: Vec<Payment> = payments
        .iter()
        .filter(|payment| payment_matches(payment, query, &needle))
        .cloned()
        .collect();
    sort_payments(&mut matches);
    matches
}

fn payment_matches(payment: &Payment, query: &str, needle: &str) -> bool {
    let contains = |text: &str| text.to_lowercase().contains(needle);

    if contains(payment.description()) || contains(payment.note()) {
        return true;
    }

    match payment {
        Payment::Request(request) => {
            request.label.as_deref().is_some_and(contains)
                || request.address == query
        }
        Payment::Transaction(tx) => {
            tx.output_addresses.iter().any(|address| contains(address))
                || contains(&tx.raw_transaction)
        }
    }
}
