use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use utoipa::ToSchema;

/// Registry ids are small integers assigned by the registry itself
/// (`max existing id + 1`), not database-generated keys.
pub type DiscountId = u64;

/// The full persisted mapping. A `BTreeMap` keeps iteration in ascending id
/// order, which is what makes code lookups deterministic: the first matching
/// id wins when codes are duplicated.
pub type DiscountRegistry = BTreeMap<DiscountId, DiscountRecord>;

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    ToSchema,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DiscountType {
    /// Fixed currency amount subtracted from the price
    Flat,
    /// Proportional reduction of the price (amount is 0-100)
    Percentage,
}

/// Discount lifecycle status.
///
/// The upstream system never defined a transition table and accepts any
/// string here, so this is an open wrapper rather than a closed enum. Only
/// the exact value `active` counts as active; everything else behaves as
/// inactive.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct DiscountStatus(String);

impl DiscountStatus {
    pub const ACTIVE: &'static str = "active";
    pub const INACTIVE: &'static str = "inactive";

    pub fn new(status: impl Into<String>) -> Self {
        Self(status.into())
    }

    pub fn active() -> Self {
        Self(Self::ACTIVE.to_string())
    }

    pub fn inactive() -> Self {
        Self(Self::INACTIVE.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_active(&self) -> bool {
        self.0 == Self::ACTIVE
    }
}

impl Default for DiscountStatus {
    fn default() -> Self {
        Self::active()
    }
}

impl fmt::Display for DiscountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DiscountStatus {
    fn from(status: &str) -> Self {
        Self::new(status)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DiscountRecord {
    pub code: String,
    pub discount_type: DiscountType,
    pub amount: Decimal,
    #[serde(default)]
    pub status: DiscountStatus,
    #[serde(default)]
    pub uses: u32,
    /// None = unbounded
    #[serde(default)]
    pub max_uses: Option<u32>,
    /// None = starts immediately
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
    /// None = never expires
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DiscountRecord {
    pub fn new(code: impl Into<String>, discount_type: DiscountType, amount: Decimal) -> Self {
        let now = Utc::now();
        Self {
            code: code.into(),
            discount_type,
            amount,
            status: DiscountStatus::active(),
            uses: 0,
            max_uses: None,
            starts_at: None,
            expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Expired only once the expiry is strictly more than 24 hours in the
    /// past. The one-day grace window is inherited behavior and kept as-is.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at < now - Duration::hours(24),
            None => false,
        }
    }

    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        match self.starts_at {
            Some(starts_at) => starts_at <= now,
            None => true,
        }
    }

    pub fn is_maxed_out(&self) -> bool {
        match self.max_uses {
            Some(max_uses) => self.uses >= max_uses,
            None => false,
        }
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.status.is_active() && !self.is_expired(now)
    }

    /// Apply this discount to a base price. Deliberately does not clamp at
    /// zero: a flat discount larger than the price goes negative, matching
    /// the upstream behavior.
    pub fn apply(&self, base_price: Decimal) -> Decimal {
        match self.discount_type {
            DiscountType::Flat => base_price - self.amount,
            DiscountType::Percentage => {
                base_price * (Decimal::ONE - self.amount / Decimal::ONE_HUNDRED)
            }
        }
    }
}
