//! Customer record and its rolling purchase/return statistics.

use chrono::{DateTime, Utc};
use common::CustomerId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::order::{Money, double_option};

/// Errors raised by the customer record's own rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CustomerError {
    /// Customers are looked up by name, so it may not be blank.
    #[error("Customer name must not be empty")]
    EmptyName,

    /// A statistics counter would leave the supported range.
    #[error("Customer statistics would overflow")]
    StatsOverflow,
}

impl CustomerError {
    /// Stable machine-readable key for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            CustomerError::EmptyName => "empty_customer_name",
            CustomerError::StatsOverflow => "stats_overflow",
        }
    }
}

/// Whether the customer is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CustomerStatus {
    #[default]
    Enabled,
    Disabled,
}

impl CustomerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerStatus::Enabled => "Enabled",
            CustomerStatus::Disabled => "Disabled",
        }
    }

    /// Parses a stored status name; unknown values read as `Enabled`.
    pub fn parse(s: &str) -> Self {
        match s {
            "Disabled" => CustomerStatus::Disabled,
            _ => CustomerStatus::Enabled,
        }
    }
}

/// Aggregate counters maintained by order transitions.
///
/// The counters are only ever moved by [`StatsAdjustment`]s and are never
/// recomputed from order history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerStats {
    pub last_purchase_date: Option<DateTime<Utc>>,
    pub total_purchase_amount: Money,
    pub purchase_times: i64,
    pub last_return_date: Option<DateTime<Utc>>,
    pub total_return_amount: Money,
    pub return_times: i64,
}

impl CustomerStats {
    /// Applies an adjustment to the purchase counters.
    ///
    /// On overflow the stats are left untouched.
    pub fn apply_purchase(&mut self, adjustment: &StatsAdjustment) -> Result<(), CustomerError> {
        let (amount, times) =
            adjusted_counters(self.total_purchase_amount, self.purchase_times, adjustment)?;
        self.total_purchase_amount = amount;
        self.purchase_times = times;
        if let Some(at) = adjustment.touched_at {
            self.last_purchase_date = Some(at);
        }
        Ok(())
    }

    /// Applies an adjustment to the return counters.
    ///
    /// On overflow the stats are left untouched.
    pub fn apply_return(&mut self, adjustment: &StatsAdjustment) -> Result<(), CustomerError> {
        let (amount, times) =
            adjusted_counters(self.total_return_amount, self.return_times, adjustment)?;
        self.total_return_amount = amount;
        self.return_times = times;
        if let Some(at) = adjustment.touched_at {
            self.last_return_date = Some(at);
        }
        Ok(())
    }
}

fn adjusted_counters(
    amount: Money,
    times: i64,
    adjustment: &StatsAdjustment,
) -> Result<(Money, i64), CustomerError> {
    let amount = amount
        .checked_add(adjustment.amount_delta)
        .ok_or(CustomerError::StatsOverflow)?;
    let times = times
        .checked_add(adjustment.count_delta)
        .ok_or(CustomerError::StatsOverflow)?;
    Ok((amount, times))
}

/// An incremental change to a pair of amount/count counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsAdjustment {
    pub amount_delta: Money,
    pub count_delta: i64,
    /// New value for the "last date" field; `None` leaves it unchanged.
    pub touched_at: Option<DateTime<Utc>>,
    /// Written to the customer's `updated_at`.
    pub at: DateTime<Utc>,
}

impl StatsAdjustment {
    /// Counts one more occurrence worth `amount` and stamps the date.
    pub fn accrue(amount: Money, at: DateTime<Utc>) -> Self {
        Self {
            amount_delta: amount,
            count_delta: 1,
            touched_at: Some(at),
            at,
        }
    }

    /// Exact inverse of [`StatsAdjustment::accrue`]; the date is left alone.
    pub fn reverse(amount: Money, at: DateTime<Utc>) -> Self {
        Self {
            amount_delta: -amount,
            count_delta: -1,
            touched_at: None,
            at,
        }
    }
}

/// A customer as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub status: CustomerStatus,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub remark: Option<String>,
    pub stats: CustomerStats,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Registration request for a customer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewCustomer {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub remark: Option<String>,
}

impl NewCustomer {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), CustomerError> {
        validate_name(&self.name)
    }
}

/// A partial update to a customer's descriptive fields.
///
/// Statistics are not patchable; only order transitions move them. Optional
/// fields distinguish "absent" from an explicit `null`, which clears them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CustomerStatus>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub phone: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub address: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub remark: Option<Option<String>>,
}

fn validate_name(name: &str) -> Result<(), CustomerError> {
    if name.trim().is_empty() {
        Err(CustomerError::EmptyName)
    } else {
        Ok(())
    }
}

impl Customer {
    /// Builds a fresh customer with zeroed stats.
    pub fn register(new: NewCustomer, now: DateTime<Utc>) -> Self {
        Self {
            id: CustomerId::new(),
            name: new.name,
            status: CustomerStatus::Enabled,
            phone: new.phone,
            address: new.address,
            remark: new.remark,
            stats: CustomerStats::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a patch and stamps `updated_at`.
    pub fn edit(&mut self, patch: CustomerPatch, now: DateTime<Utc>) -> Result<(), CustomerError> {
        if let Some(name) = &patch.name {
            validate_name(name)?;
        }

        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(phone) = patch.phone {
            self.phone = phone;
        }
        if let Some(address) = patch.address {
            self.address = address;
        }
        if let Some(remark) = patch.remark {
            self.remark = remark;
        }
        self.updated_at = now;
        Ok(())
    }
}
