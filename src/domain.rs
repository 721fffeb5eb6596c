//! Domain primitives for the rental subsystem.
//!
//! Pure types and laws shared by the booking engine, the lifecycle service
//! and the HTTP layer: size codes, inclusive day counting, line pricing,
//! shipment phases and carrier tracking statuses. Everything here is
//! side-effect free and unit tested in place.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Garment size code.
///
/// The catalog stores the per-item size set as a JSON array of these codes;
/// order lines must pick a member of that set. Codes never substitute for
/// each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SizeCode {
    #[serde(rename = "XS")]
    Xs,
    S,
    M,
    L,
    #[serde(rename = "XL")]
    Xl,
    #[serde(rename = "XXL")]
    Xxl,
    #[serde(rename = "XXXL")]
    Xxxl,
}

impl SizeCode {
    /// All codes in ascending garment order.
    pub const ALL: [Self; 7] = [
        Self::Xs,
        Self::S,
        Self::M,
        Self::L,
        Self::Xl,
        Self::Xxl,
        Self::Xxxl,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Xs => "XS",
            Self::S => "S",
            Self::M => "M",
            Self::L => "L",
            Self::Xl => "XL",
            Self::Xxl => "XXL",
            Self::Xxxl => "XXXL",
        }
    }
}

impl fmt::Display for SizeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SizeCode {
    type Err = UnknownSizeCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|code| code.as_str() == s)
            .ok_or_else(|| UnknownSizeCode(s.to_owned()))
    }
}

/// Error returned when a string is not one of the seven size codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSizeCode(pub String);

impl fmt::Display for UnknownSizeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown size code: {}", self.0)
    }
}

impl std::error::Error for UnknownSizeCode {}

/// Parses the JSON size array stored on a catalog item.
pub fn parse_size_list(raw: &str) -> serde_json::Result<Vec<SizeCode>> {
    serde_json::from_str(raw)
}

/// Encodes a size set for storage on a catalog item.
///
/// # Panics
///
/// Never panics: serializing a slice of unit variants is infallible.
#[must_use]
pub fn encode_size_list(sizes: &[SizeCode]) -> String {
    serde_json::to_string(sizes).unwrap_or_else(|_| "[]".to_owned())
}

/// Number of chargeable days for an inclusive rental window.
///
/// Picking up and returning on the same day counts as one day; every
/// extra calendar day adds one. Callers validate `end >= start` first.
///
/// # Examples
///
/// ```rust
/// use chrono::NaiveDate;
/// use vastra::domain::rental_days;
///
/// let d = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
/// assert_eq!(rental_days(d("2025-01-01"), d("2025-01-01")), 1);
/// assert_eq!(rental_days(d("2025-01-01"), d("2025-01-03")), 3);
/// ```
#[must_use]
pub fn rental_days(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days() + 1
}

/// Rental charge for one order line: `daily_rate * quantity * days`.
///
/// Security deposits are never part of this figure; they are summed
/// separately and only added when the payment order is created.
#[must_use]
pub fn rental_charge(daily_rate: Decimal, quantity: i32, days: i64) -> Decimal {
    daily_rate * Decimal::from(quantity) * Decimal::from(days)
}

/// Shipment progress attached to an order, derived from which provider ids
/// have been recorded. Not stored; always recomputed from the order row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentPhase {
    NotCreated,
    ForwardCreated,
    ReturnRequested,
}

impl ShipmentPhase {
    #[must_use]
    pub const fn derive(has_forward: bool, has_return: bool) -> Self {
        match (has_forward, has_return) {
            (_, true) => Self::ReturnRequested,
            (true, false) => Self::ForwardCreated,
            (false, false) => Self::NotCreated,
        }
    }
}

/// Carrier tracking status, translated from the logistics provider's
/// numeric shipment status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingStatus {
    PendingPickup,
    InTransit,
    Delivered,
    ReturnToOriginInitiated,
    ReturnToOriginDelivered,
    Unknown,
}

impl TrackingStatus {
    /// Maps a provider status code to a customer-facing status. Codes the
    /// provider adds later fall through to `Unknown` rather than erroring.
    #[must_use]
    pub const fn from_provider_code(code: i64) -> Self {
        match code {
            3 | 4 => Self::PendingPickup,
            6 | 18 | 19 => Self::InTransit,
            7 => Self::Delivered,
            15 => Self::ReturnToOriginInitiated,
            16 => Self::ReturnToOriginDelivered,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PendingPickup => "Pending Pickup",
            Self::InTransit => "In Transit",
            Self::Delivered => "Delivered",
            Self::ReturnToOriginInitiated => "Return to Origin Initiated",
            Self::ReturnToOriginDelivered => "Return to Origin Delivered",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for TrackingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TrackingStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn same_day_rental_is_one_day() {
        assert_eq!(rental_days(d("2025-01-01"), d("2025-01-01")), 1);
    }

    #[test]
    fn day_count_is_inclusive_of_both_ends() {
        assert_eq!(rental_days(d("2025-01-01"), d("2025-01-03")), 3);
        assert_eq!(rental_days(d("2025-01-01"), d("2025-01-08")), 8);
    }

    #[test]
    fn rental_charge_multiplies_rate_quantity_days() {
        let rate = Decimal::new(10000, 2); // 100.00
        assert_eq!(rental_charge(rate, 2, 3), Decimal::new(60000, 2));
    }

    #[test]
    fn size_codes_round_trip_through_strings() {
        for code in SizeCode::ALL {
            assert_eq!(code.as_str().parse::<SizeCode>().unwrap(), code);
        }
        assert!("XXS".parse::<SizeCode>().is_err());
    }

    #[test]
    fn size_list_parses_from_json() {
        let sizes = parse_size_list(r#"["S","M","XL"]"#).unwrap();
        assert_eq!(sizes, vec![SizeCode::S, SizeCode::M, SizeCode::Xl]);
        assert_eq!(encode_size_list(&sizes), r#"["S","M","XL"]"#);
    }

    #[test]
    fn tracking_codes_map_to_customer_statuses() {
        assert_eq!(
            TrackingStatus::from_provider_code(3),
            TrackingStatus::PendingPickup
        );
        assert_eq!(
            TrackingStatus::from_provider_code(4),
            TrackingStatus::PendingPickup
        );
        assert_eq!(
            TrackingStatus::from_provider_code(6),
            TrackingStatus::InTransit
        );
        assert_eq!(
            TrackingStatus::from_provider_code(19),
            TrackingStatus::InTransit
        );
        assert_eq!(
            TrackingStatus::from_provider_code(7),
            TrackingStatus::Delivered
        );
        assert_eq!(
            TrackingStatus::from_provider_code(15),
            TrackingStatus::ReturnToOriginInitiated
        );
        assert_eq!(
            TrackingStatus::from_provider_code(16),
            TrackingStatus::ReturnToOriginDelivered
        );
        assert_eq!(
            TrackingStatus::from_provider_code(99),
            TrackingStatus::Unknown
        );
    }

    #[test]
    fn shipment_phase_derivation() {
        assert_eq!(
            ShipmentPhase::derive(false, false),
            ShipmentPhase::NotCreated
        );
        assert_eq!(
            ShipmentPhase::derive(true, false),
            ShipmentPhase::ForwardCreated
        );
        assert_eq!(
            ShipmentPhase::derive(true, true),
            ShipmentPhase::ReturnRequested
        );
    }
}
