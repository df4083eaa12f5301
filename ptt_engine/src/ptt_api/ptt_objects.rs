use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::FromRow;

use crate::{
    db_types::{BackingType, Money, Organization, PttStatus, PttToken},
    traits::AccountApiError,
};

/// One row of a token's status history. Written by a database trigger whenever the status column changes.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct StatusChange {
    pub ptt_id: i64,
    pub old_status: PttStatus,
    pub new_status: PttStatus,
    pub changed_at: DateTime<Utc>,
}

/// Filter for [`crate::AccountApi::search_ptts`]. Empty fields do not constrain the search.
///
/// In query strings, `status` is a comma-separated list, e.g. `?status=redeemable,discounted&org_id=4`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PttQueryFilter {
    /// Matches tokens in which the organization takes any part.
    pub org_id: Option<i64>,
    pub issuer_bank: Option<i64>,
    pub current_owner: Option<i64>,
    pub currency: Option<String>,
    pub backing_type: Option<BackingType>,
    #[serde(default, serialize_with = "statuses_to_csv", deserialize_with = "csv_to_statuses")]
    pub status: Option<Vec<PttStatus>>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

fn statuses_to_csv<S>(statuses: &Option<Vec<PttStatus>>, serializer: S) -> Result<S::Ok, S::Error>
where S: Serializer {
    match statuses {
        Some(v) => {
            let s = v.iter().map(|s| s.to_string()).collect::<Vec<String>>().join(",");
            serializer.serialize_some(&s)
        },
        None => serializer.serialize_none(),
    }
}

fn csv_to_statuses<'de, D>(deserializer: D) -> Result<Option<Vec<PttStatus>>, D::Error>
where D: Deserializer<'de> {
    let s = Option::<String>::deserialize(deserializer)?;
    match s {
        None => Ok(None),
        Some(s) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(PttStatus::from_str)
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

impl PttQueryFilter {
    pub fn with_org_id(mut self, org_id: i64) -> Self {
        self.org_id = Some(org_id);
        self
    }

    pub fn with_issuer_bank(mut self, bank: i64) -> Self {
        self.issuer_bank = Some(bank);
        self
    }

    pub fn with_current_owner(mut self, owner: i64) -> Self {
        self.current_owner = Some(owner);
        self
    }

    pub fn with_currency<S: Into<String>>(mut self, currency: S) -> Self {
        self.currency = Some(currency.into());
        self
    }

    pub fn with_backing_type(mut self, backing_type: BackingType) -> Self {
        self.backing_type = Some(backing_type);
        self
    }

    pub fn with_status(mut self, status: PttStatus) -> Self {
        self.status.get_or_insert_with(Vec::new).push(status);
        self
    }

    pub fn since<T>(mut self, since: T) -> Result<Self, AccountApiError>
    where
        T: TryInto<DateTime<Utc>>,
        T::Error: Display,
    {
        let dt = since.try_into().map_err(|e| AccountApiError::QueryError(e.to_string()))?;
        self.since = Some(dt);
        Ok(self)
    }

    pub fn until<T>(mut self, until: T) -> Result<Self, AccountApiError>
    where
        T: TryInto<DateTime<Utc>>,
        T::Error: Display,
    {
        let dt = until.try_into().map_err(|e| AccountApiError::QueryError(e.to_string()))?;
        self.until = Some(dt);
        Ok(self)
    }

    pub fn is_empty(&self) -> bool {
        self.org_id.is_none() &&
            self.issuer_bank.is_none() &&
            self.current_owner.is_none() &&
            self.currency.is_none() &&
            self.backing_type.is_none() &&
            self.status.as_ref().map(|s| s.is_empty()).unwrap_or(true) &&
            self.since.is_none() &&
            self.until.is_none()
    }
}

impl Display for PttQueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "No filters.");
        }
        if let Some(org_id) = &self.org_id {
            write!(f, "org_id: {org_id}. ")?;
        }
        if let Some(bank) = &self.issuer_bank {
            write!(f, "issuer_bank: {bank}. ")?;
        }
        if let Some(owner) = &self.current_owner {
            write!(f, "current_owner: {owner}. ")?;
        }
        if let Some(currency) = &self.currency {
            write!(f, "currency: {currency}. ")?;
        }
        if let Some(backing) = &self.backing_type {
            write!(f, "backing_type: {backing}. ")?;
        }
        if let Some(since) = &self.since {
            write!(f, "since {since}. ")?;
        }
        if let Some(until) = &self.until {
            write!(f, "until {until}. ")?;
        }
        if let Some(statuses) = &self.status {
            let statuses = statuses.iter().map(|s| s.to_string()).collect::<Vec<String>>().join(",");
            write!(f, "statuses: [{statuses}]. ")?;
        }
        Ok(())
    }
}

/// An organization's balances and a count of the tokens it takes part in, by status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgSummary {
    pub organization: Organization,
    pub available_credit: Money,
    pub token_counts: Vec<(PttStatus, usize)>,
    pub outstanding_issued: Money,
}

impl OrgSummary {
    pub fn new(organization: Organization, tokens: &[PttToken]) -> Self {
        let token_counts = PttStatus::ALL
            .iter()
            .map(|s| (*s, tokens.iter().filter(|t| t.status == *s).count()))
            .filter(|(_, n)| *n > 0)
            .collect();
        let outstanding_issued = tokens
            .iter()
            .filter(|t| t.issuer_bank == organization.id && t.status.holds_credit())
            .map(|t| t.amount)
            .sum();
        let available_credit = organization.available_credit();
        Self { organization, available_credit, token_counts, outstanding_issued }
    }
}
