use std::collections::HashSet;

use crate::models::discount::{Discount, DiscountType};
use crate::models::pricing::{AddOns, BookingConfig, LegBreakdown, PassengerCounts, PriceBreakdown};

// Fixed fare policy: children fly at 90% of the adult fare, infants at 10%.
pub const CHILD_FARE_RATE: f64 = 0.9;
pub const INFANT_FARE_RATE: f64 = 0.1;

// Flat add-on prices in VND. Baggage is per unit, the other two per passenger,
// all charged once per leg.
pub const EXTRA_BAGGAGE_UNIT_PRICE: i64 = 200_000;
pub const INSURANCE_UNIT_PRICE: i64 = 150_000;
pub const PRIORITY_SEAT_UNIT_PRICE: i64 = 100_000;

// Caps on client-supplied figures. Every configuration that passes validation
// stays inside i64 through each step of the computation.
pub const MAX_PASSENGERS: u32 = 100;
pub const MAX_BASE_FARE: i64 = 1_000_000_000;

#[derive(Debug, PartialEq)]
pub enum PricingError {
    NoPassengers,
    TooManyPassengers(u32),
    NonPositiveFare(i64),
    FareTooLarge(i64),
    InvalidLegCount(usize),
    InvalidSeatCode(String),
}

impl std::fmt::Display for PricingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PricingError::NoPassengers => {
                write!(f, "At least one passenger is required")
            }
            PricingError::TooManyPassengers(count) => {
                write!(f, "At most {} passengers per booking, got {}", MAX_PASSENGERS, count)
            }
            PricingError::NonPositiveFare(fare) => {
                write!(f, "Base fare must be positive, got {}", fare)
            }
            PricingError::FareTooLarge(fare) => {
                write!(f, "Base fare must not exceed {} VND, got {}", MAX_BASE_FARE, fare)
            }
            PricingError::InvalidLegCount(count) => {
                write!(f, "A trip must have 1 leg (one-way) or 2 legs (round trip), got {}", count)
            }
            PricingError::InvalidSeatCode(code) => {
                write!(f, "Invalid seat code: {}", code)
            }
        }
    }
}

impl std::error::Error for PricingError {}

pub struct PricingService;

impl PricingService {
    /// Price one seat by its code, e.g. "12F". Digits are the row, the
    /// trailing letter the column. Row rules win over column rules.
    pub fn seat_price(code: &str) -> Result<i64, PricingError> {
        let normalized = code.trim().to_uppercase();
        let re = regex::Regex::new(r"^([0-9]{1,3})([A-Z])$").unwrap();
        let captures = re
            .captures(&normalized)
            .ok_or_else(|| PricingError::InvalidSeatCode(code.to_string()))?;

        let row: u32 = captures[1]
            .parse()
            .map_err(|_| PricingError::InvalidSeatCode(code.to_string()))?;
        if row == 0 {
            return Err(PricingError::InvalidSeatCode(code.to_string()));
        }
        let column = captures[2].chars().next().unwrap_or('_');

        let price = if row == 1 || row == 12 || row == 13 {
            300_000
        } else if row <= 5 {
            200_000
        } else if matches!(column, 'A' | 'F' | 'K') {
            150_000
        } else if matches!(column, 'C' | 'D' | 'H' | 'J') {
            120_000
        } else {
            100_000
        };
        Ok(price)
    }

    /// Ticket cost for one leg: adults at full fare, children and infants at
    /// their fixed rates.
    pub fn leg_passenger_subtotal(passengers: &PassengerCounts, base_fare: i64) -> i64 {
        let child_fare = (base_fare as f64 * CHILD_FARE_RATE).round() as i64;
        let infant_fare = (base_fare as f64 * INFANT_FARE_RATE).round() as i64;

        passengers.adults as i64 * base_fare
            + passengers.children as i64 * child_fare
            + passengers.infants as i64 * infant_fare
    }

    fn leg_add_ons(passengers: &PassengerCounts, add_ons: &AddOns) -> Result<(i64, i64, i64, i64), PricingError> {
        let total_passengers = passengers.total() as i64;

        let baggage_total = add_ons.extra_baggage_units as i64 * EXTRA_BAGGAGE_UNIT_PRICE;
        let insurance_total = if add_ons.insurance_selected {
            total_passengers * INSURANCE_UNIT_PRICE
        } else {
            0
        };
        let priority_seat_total = if add_ons.priority_seat_selected {
            total_passengers * PRIORITY_SEAT_UNIT_PRICE
        } else {
            0
        };

        // Selected seats are a set; the same code submitted twice is one seat.
        let mut seat_total = 0;
        let mut seen = HashSet::new();
        for code in &add_ons.selected_seat_codes {
            if !seen.insert(code.trim().to_uppercase()) {
                continue;
            }
            seat_total += Self::seat_price(code)?;
        }

        Ok((baggage_total, insurance_total, priority_seat_total, seat_total))
    }

    fn price_leg(passengers: &PassengerCounts, base_fare: i64, add_ons: &AddOns) -> Result<LegBreakdown, PricingError> {
        let (baggage_total, insurance_total, priority_seat_total, seat_total) =
            Self::leg_add_ons(passengers, add_ons)?;

        Ok(LegBreakdown {
            passenger_total: Self::leg_passenger_subtotal(passengers, base_fare),
            baggage_total,
            insurance_total,
            priority_seat_total,
            seat_total,
        })
    }

    fn validate(config: &BookingConfig) -> Result<(), PricingError> {
        if config.legs.is_empty() || config.legs.len() > 2 {
            return Err(PricingError::InvalidLegCount(config.legs.len()));
        }
        let total_passengers = config.passengers.total();
        if total_passengers == 0 {
            return Err(PricingError::NoPassengers);
        }
        if total_passengers > MAX_PASSENGERS {
            return Err(PricingError::TooManyPassengers(total_passengers));
        }
        for leg in &config.legs {
            if leg.base_fare_per_adult <= 0 {
                return Err(PricingError::NonPositiveFare(leg.base_fare_per_adult));
            }
            if leg.base_fare_per_adult > MAX_BASE_FARE {
                return Err(PricingError::FareTooLarge(leg.base_fare_per_adult));
            }
        }
        Ok(())
    }

    /// How much a discount takes off a given subtotal. Fixed amounts never
    /// exceed the subtotal.
    pub fn discount_amount(subtotal: i64, discount: &Discount) -> i64 {
        match discount.discount_type {
            DiscountType::Percentage => (subtotal as f64 * discount.value / 100.0).round() as i64,
            DiscountType::Fixed => (discount.value.round() as i64).min(subtotal),
        }
    }

    /// Compute the full price breakdown for a booking configuration. Pure:
    /// same inputs, same answer, no side effects. The discount must already
    /// have been resolved by the caller; unresolved or inactive codes are
    /// simply not applied.
    pub fn quote(config: &BookingConfig, discount: Option<&Discount>) -> Result<PriceBreakdown, PricingError> {
        Self::validate(config)?;

        let mut legs = Vec::with_capacity(config.legs.len());
        for leg in &config.legs {
            legs.push(Self::price_leg(&config.passengers, leg.base_fare_per_adult, &leg.add_ons)?);
        }
        let subtotal: i64 = legs.iter().map(|leg| leg.leg_total()).sum();

        let (discount_code, discount_amount) = match discount {
            Some(d) if d.active => (Some(d.code.clone()), Self::discount_amount(subtotal, d)),
            _ => (None, 0),
        };
        // Floor at zero so an oversized discount can never produce a
        // negative total.
        let total = (subtotal - discount_amount).max(0);

        Ok(PriceBreakdown {
            legs,
            subtotal,
            discount_code,
            discount_amount,
            total,
        })
    }
}
