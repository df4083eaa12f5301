//! Data types that are stored in, and returned from, the PTT database.
//!
//! Enums that are persisted as text use `snake_case` names both in the database and in their JSON representation.
use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
pub use ptt_common::Money;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Conversion error: {0}")]
pub struct ConversionError(String);

/// Implements `Display` and `FromStr` for a text enum using the given string table.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ConversionError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(ConversionError(format!("Invalid {}: {s}", stringify!($name)))),
                }
            }
        }
    };
}

//--------------------------------------   Organizations   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrgType {
    Importer,
    Exporter,
    Bank,
    Funder,
    /// The platform operator. Holds the bootstrap admin user.
    Operator,
}

text_enum!(OrgType { Importer => "importer", Exporter => "exporter", Bank => "bank", Funder => "funder", Operator => "operator" });

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Organization {
    pub id: i64,
    pub name: String,
    pub org_type: OrgType,
    pub treasury_balance: Money,
    pub credit_limit: Money,
    pub credit_used: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Organization {
    pub fn available_credit(&self) -> Money {
        self.credit_limit - self.credit_used
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrganization {
    pub name: String,
    pub org_type: OrgType,
    #[serde(default)]
    pub treasury_balance: Money,
    #[serde(default)]
    pub credit_limit: Money,
}

impl NewOrganization {
    pub fn new<S: Into<String>>(name: S, org_type: OrgType) -> Self {
        Self { name: name.into(), org_type, treasury_balance: Money::default(), credit_limit: Money::default() }
    }

    pub fn with_treasury(mut self, balance: Money) -> Self {
        self.treasury_balance = balance;
        self
    }

    pub fn with_credit_limit(mut self, limit: Money) -> Self {
        self.credit_limit = limit;
        self
    }
}

//--------------------------------------   Users & Roles   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Maker,
    Checker,
    ReadAll,
    Admin,
}

text_enum!(Role { User => "user", Maker => "maker", Checker => "checker", ReadAll => "read_all", Admin => "admin" });

pub type Roles = Vec<Role>;

#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: i64,
    pub org_id: i64,
    pub name: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub org_id: i64,
    pub name: String,
    pub email: Option<String>,
    #[serde(default)]
    pub roles: Roles,
}

/// A user together with the organization they act for and the roles they hold. This is what authentication resolves
/// an API key to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: i64,
    pub org_id: i64,
    pub roles: Roles,
}

impl Actor {
    pub fn new(user_id: i64, org_id: i64, roles: Roles) -> Self {
        Self { user_id, org_id, roles }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }
}

//--------------------------------------       Tokens        ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PttStatus {
    Requested,
    Issued,
    Locked,
    Transferred,
    Redeemable,
    Discounted,
    Settled,
    Cancelled,
}

text_enum!(PttStatus {
    Requested => "requested",
    Issued => "issued",
    Locked => "locked",
    Transferred => "transferred",
    Redeemable => "redeemable",
    Discounted => "discounted",
    Settled => "settled",
    Cancelled => "cancelled",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BackingType {
    /// The issuing bank reserves funds from its treasury.
    Treasury,
    /// The token is backed by the importer's credit line only.
    Credit,
}

text_enum!(BackingType { Treasury => "treasury", Credit => "credit" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    BillOfLading,
    CommercialInvoice,
    PackingList,
    CertificateOfOrigin,
    InsuranceCertificate,
    Other,
}

text_enum!(DocumentType {
    BillOfLading => "bill_of_lading",
    CommercialInvoice => "commercial_invoice",
    PackingList => "packing_list",
    CertificateOfOrigin => "certificate_of_origin",
    InsuranceCertificate => "insurance_certificate",
    Other => "other",
});

/// Conditions the importer attaches to a token when locking it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockConditions {
    #[serde(default)]
    pub required_documents: Vec<DocumentType>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl LockConditions {
    pub fn new(required_documents: Vec<DocumentType>) -> Self {
        Self { required_documents, notes: None }
    }

    pub fn with_notes<S: Into<String>>(mut self, notes: S) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct PttToken {
    pub id: i64,
    pub amount: Money,
    pub currency: String,
    pub status: PttStatus,
    pub maturity_date: NaiveDate,
    pub backing_type: BackingType,
    pub issuer_bank: i64,
    pub current_owner: i64,
    pub original_importer: i64,
    pub exporter: Option<i64>,
    pub conditions: Json<LockConditions>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PttToken {
    /// The organization that receives the settlement proceeds: whoever holds the token at settlement time.
    pub fn beneficiary(&self) -> i64 {
        self.current_owner
    }

    pub fn required_documents(&self) -> &[DocumentType] {
        &self.conditions.0.required_documents
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPttRequest {
    pub amount: Money,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub maturity_date: NaiveDate,
    pub backing_type: BackingType,
    pub issuer_bank: i64,
    #[serde(default)]
    pub exporter: Option<i64>,
}

fn default_currency() -> String {
    ptt_common::DEFAULT_CURRENCY.to_string()
}

impl NewPttRequest {
    pub fn new(amount: Money, maturity_date: NaiveDate, backing_type: BackingType, issuer_bank: i64) -> Self {
        Self { amount, currency: default_currency(), maturity_date, backing_type, issuer_bank, exporter: None }
    }

    pub fn with_currency<S: Into<String>>(mut self, currency: S) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn with_exporter(mut self, exporter: i64) -> Self {
        self.exporter = Some(exporter);
        self
    }
}

//--------------------------------------      Documents      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Pending,
    Approved,
    Rejected,
}

text_enum!(DocumentStatus { Pending => "pending", Approved => "approved", Rejected => "rejected" });

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct ShippingDocument {
    pub id: i64,
    pub ptt_id: i64,
    pub document_type: DocumentType,
    pub file_name: String,
    /// Opaque reference into the external object store. Only metadata is kept here.
    pub storage_ref: String,
    pub uploaded_by: i64,
    pub status: DocumentStatus,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDocument {
    pub document_type: DocumentType,
    pub file_name: String,
    pub storage_ref: String,
}

impl NewDocument {
    pub fn new<S: Into<String>>(document_type: DocumentType, file_name: S, storage_ref: S) -> Self {
        Self { document_type, file_name: file_name.into(), storage_ref: storage_ref.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentReview {
    Approve,
    Reject(String),
}

//--------------------------------------     Marketplace     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OfferStatus {
    Open,
    Accepted,
    Rejected,
    Withdrawn,
}

text_enum!(OfferStatus { Open => "open", Accepted => "accepted", Rejected => "rejected", Withdrawn => "withdrawn" });

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct DiscountOffer {
    pub id: i64,
    pub ptt_id: i64,
    pub funder_org: i64,
    pub offer_amount: Money,
    pub status: OfferStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DiscountOffer {
    /// The discount the funder earns, relative to the face value of the token.
    pub fn discount(&self, face_value: Money) -> Money {
        face_value - self.offer_amount
    }
}

//--------------------------------------       Ledger        ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LedgerKind {
    Issue,
    Transfer,
    Discount,
    Settlement,
    Cancellation,
    Deposit,
    Withdrawal,
}

text_enum!(LedgerKind {
    Issue => "issue",
    Transfer => "transfer",
    Discount => "discount",
    Settlement => "settlement",
    Cancellation => "cancellation",
    Deposit => "deposit",
    Withdrawal => "withdrawal",
});

/// An audit row. Every balance or ownership change writes one of these in the same transaction.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub ptt_id: Option<i64>,
    pub kind: LedgerKind,
    pub from_org: Option<i64>,
    pub to_org: Option<i64>,
    pub amount: Money,
    pub memo: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLedgerEntry {
    pub ptt_id: Option<i64>,
    pub kind: LedgerKind,
    pub from_org: Option<i64>,
    pub to_org: Option<i64>,
    pub amount: Money,
    pub memo: Option<String>,
}

//--------------------------------------  Maker / Checker    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    IssuePtt,
    AcceptOffer,
    SettlePtt,
}

text_enum!(ActionType { IssuePtt => "issue_ptt", AcceptOffer => "accept_offer", SettlePtt => "settle_ptt" });

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Pending,
    Approved,
    Rejected,
}

text_enum!(ActionStatus { Pending => "pending", Approved => "approved", Rejected => "rejected" });

/// A gated action waiting for a checker's decision.
///
/// `target_id` is the token id for `issue_ptt` and `settle_ptt`, and the offer id for `accept_offer`.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct PendingAction {
    pub id: i64,
    pub action_type: ActionType,
    pub target_id: i64,
    pub ptt_id: i64,
    pub org_id: i64,
    pub maker_id: i64,
    pub checker_id: Option<i64>,
    pub status: ActionStatus,
    pub memo: Option<String>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPendingAction {
    pub action_type: ActionType,
    pub target_id: i64,
    pub ptt_id: i64,
    pub org_id: i64,
    pub maker_id: i64,
    pub memo: Option<String>,
}
