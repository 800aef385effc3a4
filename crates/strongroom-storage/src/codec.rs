//! Payments snapshot codec
//!
//! Serializes payment requests and transaction annotations into a versioned
//! protobuf container. Messages are declared by hand with `prost`.

use chrono::{DateTime, Utc};
use prost::Message;
use rust_decimal::Decimal;
use std::str::FromStr;
use strongroom_core::{FiatPayment, PaymentRequest, TransactionAnnotation};

use crate::{Error, Result};

/// Container format version written by [`encode`]
pub const FORMAT_VERSION: u32 = 1;

/// Top-level container
#[derive(Clone, PartialEq, Message)]
pub struct PaymentsProto {
    /// Format version (0 means 1)
    #[prost(uint32, tag = "1")]
    pub format_version: u32,
    /// Payment requests
    #[prost(message, repeated, tag = "2")]
    pub payment_requests: Vec<PaymentRequestProto>,
    /// Transaction annotations
    #[prost(message, repeated, tag = "3")]
    pub transaction_annotations: Vec<TransactionAnnotationProto>,
}

/// Persisted payment request
#[allow(missing_docs)]
#[derive(Clone, PartialEq, Message)]
pub struct PaymentRequestProto {
    #[prost(string, optional, tag = "1")]
    pub address: Option<String>,
    #[prost(uint64, optional, tag = "2")]
    pub amount: Option<u64>,
    #[prost(uint64, optional, tag = "3")]
    pub paid_amount: Option<u64>,
    #[prost(string, optional, tag = "4")]
    pub label: Option<String>,
    #[prost(string, optional, tag = "5")]
    pub note: Option<String>,
    /// Creation time in milliseconds since the epoch
    #[prost(int64, optional, tag = "6")]
    pub date: Option<i64>,
    #[prost(message, optional, tag = "7")]
    pub amount_fiat: Option<FiatPaymentProto>,
    #[prost(string, repeated, tag = "8")]
    pub paying_transaction_hashes: Vec<String>,
    /// Nanoseconds within the second of `date`; absent in older files
    #[prost(uint32, optional, tag = "9")]
    pub date_subsec_nanos: Option<u32>,
}

/// Persisted transaction annotation
#[allow(missing_docs)]
#[derive(Clone, PartialEq, Message)]
pub struct TransactionAnnotationProto {
    #[prost(string, optional, tag = "1")]
    pub hash: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub note: Option<String>,
    #[prost(message, optional, tag = "3")]
    pub amount_fiat: Option<FiatPaymentProto>,
    #[prost(uint64, optional, tag = "4")]
    pub miner_fee: Option<u64>,
    #[prost(uint64, optional, tag = "5")]
    pub client_fee: Option<u64>,
}

/// Persisted fiat snapshot; decimals are kept as strings
#[allow(missing_docs)]
#[derive(Clone, PartialEq, Message)]
pub struct FiatPaymentProto {
    #[prost(string, optional, tag = "1")]
    pub exchange_name: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub rate: Option<String>,
    #[prost(string, optional, tag = "3")]
    pub currency: Option<String>,
    #[prost(string, optional, tag = "4")]
    pub amount: Option<String>,
}

/// Decoded store contents
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    /// Every payment request
    pub requests: Vec<PaymentRequest>,
    /// Every transaction annotation
    pub annotations: Vec<TransactionAnnotation>,
}

/// Encode the store contents
pub fn encode(requests: &[PaymentRequest], annotations: &[TransactionAnnotation]) -> Vec<u8> {
    PaymentsProto {
        format_version: FORMAT_VERSION,
        payment_requests: requests.iter().map(request_to_proto).collect(),
        transaction_annotations: annotations.iter().map(annotation_to_proto).collect(),
    }
    .encode_to_vec()
}

/// Decode store contents produced by [`encode`]
pub fn decode(bytes: &[u8]) -> Result<Snapshot> {
    let proto =
        PaymentsProto::decode(bytes).map_err(|e| Error::Malformed(e.to_string()))?;

    let version = match proto.format_version {
        0 => FORMAT_VERSION,
        v => v,
    };
    if version > FORMAT_VERSION {
        return Err(Error::Malformed(format!(
            "Unsupported payments format version: {}",
            version
        )));
    }

    Ok(Snapshot {
        requests: proto
            .payment_requests
            .into_iter()
            .map(request_from_proto)
            .collect::<Result<_>>()?,
        annotations: proto
            .transaction_annotations
            .into_iter()
            .map(annotation_from_proto)
            .collect::<Result<_>>()?,
    })
}

fn request_to_proto(request: &PaymentRequest) -> PaymentRequestProto {
    PaymentRequestProto {
        address: Some(request.address.clone()),
        amount: Some(request.amount),
        paid_amount: Some(request.paid_amount),
        label: request.label.clone(),
        note: request.note.clone(),
        date: Some(request.date.timestamp_millis()),
        amount_fiat: fiat_to_proto(&request.amount_fiat),
        paying_transaction_hashes: request.paying_transaction_hashes.clone(),
        date_subsec_nanos: Some(request.date.timestamp_subsec_nanos()),
    }
}

fn request_from_proto(proto: PaymentRequestProto) -> Result<PaymentRequest> {
    let address = proto
        .address
        .ok_or_else(|| Error::Malformed("Payment request without address".to_string()))?;
    let date = proto
        .date
        .and_then(|millis| date_from_parts(millis, proto.date_subsec_nanos))
        .ok_or_else(|| Error::Malformed(format!("Payment request {} without date", address)))?;

    Ok(PaymentRequest {
        address,
        amount: proto.amount.unwrap_or_default(),
        paid_amount: proto.paid_amount.unwrap_or_default(),
        label: proto.label,
        note: proto.note,
        date,
        amount_fiat: fiat_from_proto(proto.amount_fiat),
        paying_transaction_hashes: proto.paying_transaction_hashes,
    })
}

/// Millisecond timestamp refined by the sub-second nanoseconds when present
fn date_from_parts(millis: i64, subsec_nanos: Option<u32>) -> Option<DateTime<Utc>> {
    let secs = millis.div_euclid(1000);
    let nanos = match subsec_nanos {
        Some(nanos) => nanos,
        None => u32::try_from(millis.rem_euclid(1000)).ok()? * 1_000_000,
    };
    DateTime::<Utc>::from_timestamp(secs, nanos)
}

fn annotation_to_proto(annotation: &TransactionAnnotation) -> TransactionAnnotationProto {
    TransactionAnnotationProto {
        hash: Some(annotation.hash.clone()),
        note: annotation.note.clone(),
        amount_fiat: fiat_to_proto(&annotation.amount_fiat),
        miner_fee: annotation.miner_fee,
        client_fee: annotation.client_fee,
    }
}

fn annotation_from_proto(proto: TransactionAnnotationProto) -> Result<TransactionAnnotation> {
    let hash = proto
        .hash
        .ok_or_else(|| Error::Malformed("Transaction annotation without hash".to_string()))?;

    Ok(TransactionAnnotation {
        hash,
        note: proto.note,
        amount_fiat: fiat_from_proto(proto.amount_fiat),
        miner_fee: proto.miner_fee,
        client_fee: proto.client_fee,
    })
}

fn fiat_to_proto(fiat: &FiatPayment) -> Option<FiatPaymentProto> {
    if fiat.is_empty() {
        return None;
    }
    Some(FiatPaymentProto {
        exchange_name: fiat.exchange_name.clone(),
        rate: fiat.rate.map(|rate| rate.to_string()),
        currency: fiat.currency.clone(),
        amount: fiat.amount.map(|amount| amount.to_string()),
    })
}

/// Unparsable decimals decode to absent
fn fiat_from_proto(proto: Option<FiatPaymentProto>) -> FiatPayment {
    let Some(proto) = proto else {
        return FiatPayment::default();
    };
    let parse = |text: Option<String>| text.and_then(|t| Decimal::from_str(&t).ok());

    FiatPayment {
        exchange_name: proto.exchange_name,
        rate: parse(proto.rate),
        currency: proto.currency,
        amount: parse(proto.amount),
    }
}
