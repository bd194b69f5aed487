use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

/// Hours in a billing day.
pub const HOURS_PER_DAY: i64 = 24;
/// Hours in a billing month (a flat 30 days).
pub const HOURS_PER_MONTH: i64 = HOURS_PER_DAY * 30;

/// DurationType
///
/// The rate plan a renter asks for when booking. Anything the client sends that
/// is not one of the named plans falls back to `Optimal`.
///
/// The exported TypeScript union lists the four plans only. ts-rs warns that it
/// ignores the `other` serde attribute; the warning is expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum DurationType {
    Hourly,
    Daily,
    Monthly,
    #[default]
    #[serde(other)]
    Optimal,
}

impl DurationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DurationType::Hourly => "hourly",
            DurationType::Daily => "daily",
            DurationType::Monthly => "monthly",
            DurationType::Optimal => "optimal",
        }
    }
}

impl From<String> for DurationType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "hourly" => DurationType::Hourly,
            "daily" => DurationType::Daily,
            "monthly" => DurationType::Monthly,
            _ => DurationType::Optimal,
        }
    }
}

/// PriceTiers
///
/// The three rates a listing is offered at. A rate of zero is a real price of
/// zero, so a strategy built on it always wins the comparison.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PriceTiers {
    pub hourly: f64,
    pub daily: f64,
    pub monthly: f64,
}

impl PriceTiers {
    pub fn new(hourly: f64, daily: f64, monthly: f64) -> Self {
        Self {
            hourly,
            daily,
            monthly,
        }
    }

    pub fn hourly_only(&self, hours: i64) -> f64 {
        self.hourly * hours as f64
    }

    /// Whole days at the daily rate, the leftover hours at the hourly rate.
    pub fn daily_plus_hourly(&self, hours: i64) -> f64 {
        let days = hours / HOURS_PER_DAY;
        let leftover = hours % HOURS_PER_DAY;
        self.daily * days as f64 + self.hourly * leftover as f64
    }

    /// Every started month is charged in full, at least one.
    pub fn monthly_only(&self, hours: i64) -> f64 {
        self.monthly * ceil_div(hours, HOURS_PER_MONTH).max(1) as f64
    }

    pub fn monthly_daily_hourly(&self, hours: i64) -> f64 {
        let months = hours / HOURS_PER_MONTH;
        let rest = hours % HOURS_PER_MONTH;
        let days = rest / HOURS_PER_DAY;
        let leftover = rest % HOURS_PER_DAY;
        self.monthly * months as f64 + self.daily * days as f64 + self.hourly * leftover as f64
    }

    /// Cheapest of the four fixed rate combinations.
    pub fn optimal(&self, hours: i64) -> f64 {
        [
            self.hourly_only(hours),
            self.daily_plus_hourly(hours),
            self.monthly_only(hours),
            self.monthly_daily_hourly(hours),
        ]
        .into_iter()
        .fold(f64::INFINITY, f64::min)
    }

    pub fn price(&self, duration_type: DurationType, hours: i64) -> f64 {
        match duration_type {
            DurationType::Hourly => self.hourly_only(hours),
            DurationType::Daily => self.daily * ceil_div(hours, HOURS_PER_DAY).max(1) as f64,
            DurationType::Monthly => self.monthly_only(hours),
            DurationType::Optimal => self.optimal(hours),
        }
    }
}

/// Quote
///
/// A price estimate for renting a listing over a span (GET /listings/{id}/quote).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Quote {
    pub hours: i64,
    pub duration_type: DurationType,
    pub price: f64,
}

/// Number of hours billed for a span: started hours count in full, and even an
/// empty or inverted span bills one hour.
pub fn billable_hours(start: NaiveDateTime, end: NaiveDateTime) -> i64 {
    let seconds = (end - start).num_seconds();
    ceil_div(seconds, 3600).max(1)
}

pub fn quote(
    tiers: &PriceTiers,
    duration_type: DurationType,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Quote {
    let hours = billable_hours(start, end);
    Quote {
        hours,
        duration_type,
        price: tiers.price(duration_type, hours),
    }
}

// Ceiling division for a non-negative divisor; negative numerators round toward zero.
fn ceil_div(value: i64, divisor: i64) -> i64 {
    if value <= 0 {
        return value / divisor;
    }
    (value + divisor - 1) / divisor
}
