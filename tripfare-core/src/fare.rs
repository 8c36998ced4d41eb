//! Billable distance and fare computation.
//!
//! Pure functions over a [`FareRequest`] and the operator's
//! [`PricingSettings`]; no I/O and no clock access.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use thiserror::Error;

/// Per-day minimum billable distance in kilometres, once the rule applies.
pub const MIN_KM_PER_DAY: f64 = 300.0;

/// Kind of trip being priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum RideType {
    /// Single leg from pickup to drop.
    Oneway,
    /// Out and back, possibly spanning several days.
    Roundtrip,
    /// Transfer to or from an airport.
    Airport,
}

impl RideType {
    /// Lowercase name as accepted by [`FromStr`].
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Oneway => "oneway",
            Self::Roundtrip => "roundtrip",
            Self::Airport => "airport",
        }
    }

    /// Whether `settings` enable the minimum-distance rule for this ride.
    #[must_use]
    pub const fn minimum_enabled(self, settings: &PricingSettings) -> bool {
        match self {
            Self::Oneway => settings.min_km_oneway_apply,
            Self::Roundtrip => settings.min_km_roundtrip_apply,
            Self::Airport => settings.min_km_airport_apply,
        }
    }
}

impl fmt::Display for RideType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a ride type string is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown ride type {input:?}; expected oneway, roundtrip or airport")]
pub struct RideTypeParseError {
    /// The rejected input.
    pub input: String,
}

impl FromStr for RideType {
    type Err = RideTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "oneway" | "one-way" | "one_way" => Ok(Self::Oneway),
            "roundtrip" | "round-trip" | "round_trip" => Ok(Self::Roundtrip),
            "airport" => Ok(Self::Airport),
            _ => Err(RideTypeParseError {
                input: s.to_owned(),
            }),
        }
    }
}

/// Operator pricing configuration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PricingSettings {
    /// Distance a trip must exceed before the minimum applies, in kilometres.
    pub min_km_threshold: f64,
    /// Apply the minimum to airport transfers.
    pub min_km_airport_apply: bool,
    /// Apply the minimum to one-way trips.
    pub min_km_oneway_apply: bool,
    /// Apply the minimum to round trips.
    pub min_km_roundtrip_apply: bool,
    /// Rate used when the request carries no usable rate.
    pub price_per_km: f64,
}

impl Default for PricingSettings {
    fn default() -> Self {
        Self {
            min_km_threshold: 0.0,
            min_km_airport_apply: false,
            min_km_oneway_apply: false,
            min_km_roundtrip_apply: false,
            price_per_km: 0.0,
        }
    }
}

/// A trip to price.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FareRequest {
    /// Kind of trip.
    pub ride_type: RideType,
    /// Driving distance of one leg, in kilometres.
    pub distance_km: f64,
    /// Local calendar date of pickup.
    pub pickup_date: Option<NaiveDate>,
    /// Local calendar date of return, for round trips.
    pub return_date: Option<NaiveDate>,
    /// Rate in currency units per kilometre.
    pub price_per_km: f64,
}

impl FareRequest {
    /// A request without dates.
    #[must_use]
    pub const fn new(ride_type: RideType, distance_km: f64, price_per_km: f64) -> Self {
        Self {
            ride_type,
            distance_km,
            pickup_date: None,
            return_date: None,
            price_per_km,
        }
    }

    /// Attach pickup and return dates.
    #[must_use]
    pub const fn with_dates(
        mut self,
        pickup_date: Option<NaiveDate>,
        return_date: Option<NaiveDate>,
    ) -> Self {
        self.pickup_date = pickup_date;
        self.return_date = return_date;
        self
    }

    /// Calendar days covered by the trip, counting both ends.
    ///
    /// At least one; missing or reversed dates count as a single day.
    #[must_use]
    pub fn trip_days(&self) -> u32 {
        match (self.pickup_date, self.return_date) {
            (Some(pickup), Some(ret)) if ret >= pickup => {
                let span = (ret - pickup).num_days();
                u32::try_from(span).map_or(u32::MAX, |days| days.saturating_add(1))
            }
            _ => 1,
        }
    }
}

/// Result of pricing a trip.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FareQuote {
    /// Distance billed after applying minimums, in kilometres.
    pub billable_distance_km: f64,
    /// Fare rounded to whole currency units.
    pub total_fare: i64,
}

impl FareQuote {
    /// The quote for an unpriceable request.
    pub const ZERO: Self = Self {
        billable_distance_km: 0.0,
        total_fare: 0,
    };
}

/// Price `request` under `settings`.
///
/// The [`MIN_KM_PER_DAY`] floor applies when the ride type's flag is set and
/// the distance exceeds `min_km_threshold`. Returns [`FareQuote::ZERO`] when
/// settings are missing or the distance is not a positive finite number. A
/// non-positive request rate falls back to the configured rate.
///
/// # Examples
///
/// ```
/// use tripfare_core::{FareRequest, PricingSettings, RideType, compute_fare};
///
/// let settings = PricingSettings {
///     min_km_oneway_apply: true,
///     ..PricingSettings::default()
/// };
/// let quote = compute_fare(&FareRequest::new(RideType::Oneway, 120.0, 10.0), Some(&settings));
/// assert_eq!(quote.billable_distance_km, 300.0);
/// assert_eq!(quote.total_fare, 3000);
/// ```
#[must_use]
#[expect(
    clippy::float_arithmetic,
    clippy::cast_possible_truncation,
    reason = "fare arithmetic is floating point by definition; the final cast saturates"
)]
pub fn compute_fare(request: &FareRequest, settings: Option<&PricingSettings>) -> FareQuote {
    let Some(settings) = settings else {
        return FareQuote::ZERO;
    };
    if !request.distance_km.is_finite() || request.distance_km <= 0.0 {
        return FareQuote::ZERO;
    }

    let per_day_minimum = if minimum_applies(request, settings) {
        MIN_KM_PER_DAY
    } else {
        0.0
    };
    let billable = match request.ride_type {
        RideType::Oneway | RideType::Airport => per_day_minimum.max(request.distance_km),
        RideType::Roundtrip => {
            let days = f64::from(request.trip_days());
            (days * per_day_minimum).max(request.distance_km * 2.0)
        }
    };

    let rate = effective_rate(request.price_per_km, settings.price_per_km);
    FareQuote {
        billable_distance_km: billable,
        total_fare: (billable * rate).round() as i64,
    }
}

/// A non-finite threshold never lets the minimum apply.
fn minimum_applies(request: &FareRequest, settings: &PricingSettings) -> bool {
    request.ride_type.minimum_enabled(settings)
        && settings.min_km_threshold.is_finite()
        && request.distance_km > settings.min_km_threshold
}

fn effective_rate(requested: f64, configured: f64) -> f64 {
    if requested.is_finite() && requested > 0.0 {
        requested
    } else if configured.is_finite() && configured > 0.0 {
        configured
    } else {
        0.0
    }
}
