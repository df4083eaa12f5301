use serde::{Deserialize, Serialize};

use crate::db_types::{DiscountOffer, LedgerEntry, PttToken, ShippingDocument};

/// The outcome of an importer reviewing a shipping document. `promoted` is true when this review completed the
/// document set and moved the token to `redeemable`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentReviewResult {
    pub document: ShippingDocument,
    pub ptt: PttToken,
    pub promoted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferAcceptance {
    pub ptt: PttToken,
    pub offer: DiscountOffer,
    /// Competing offers on the same token that were closed as a result.
    pub rejected_offers: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementResult {
    pub ptt: PttToken,
    pub ledger: Vec<LedgerEntry>,
}
