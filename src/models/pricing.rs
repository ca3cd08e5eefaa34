use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default)]
pub struct PassengerCounts {
    pub adults: u32,
    pub children: u32,
    pub infants: u32,
}

impl PassengerCounts {
    /// Saturating sum; the calculator's own cap rejects anything this large
    /// long before the number is used.
    pub fn total(&self) -> u32 {
        self.adults
            .saturating_add(self.children)
            .saturating_add(self.infants)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AddOns {
    #[serde(default)]
    pub extra_baggage_units: u32,
    #[serde(default)]
    pub insurance_selected: bool,
    #[serde(default)]
    pub priority_seat_selected: bool,
    #[serde(default)]
    pub selected_seat_codes: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TripLeg {
    pub base_fare_per_adult: i64,
    // Add-ons are bought per leg: insurance for only the outbound leg of a
    // round trip is a valid configuration.
    #[serde(default)]
    pub add_ons: AddOns,
}

/// Everything the fare calculation needs. One leg is a one-way trip, two
/// legs a round trip; the same passengers fly every leg.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BookingConfig {
    pub passengers: PassengerCounts,
    pub legs: Vec<TripLeg>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LegBreakdown {
    pub passenger_total: i64,
    pub baggage_total: i64,
    pub insurance_total: i64,
    pub priority_seat_total: i64,
    pub seat_total: i64,
}

impl LegBreakdown {
    pub fn leg_total(&self) -> i64 {
        self.passenger_total
            + self.baggage_total
            + self.insurance_total
            + self.priority_seat_total
            + self.seat_total
    }
}

/// Output of the fare calculation, persisted on the booking so customer
/// service can see how a total came to be.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PriceBreakdown {
    pub legs: Vec<LegBreakdown>,
    pub subtotal: i64,
    pub discount_code: Option<String>,
    pub discount_amount: i64,
    pub total: i64,
}
