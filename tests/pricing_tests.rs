use chrono::{NaiveDate, NaiveDateTime};
use parkeasy::pricing::{
    DurationType, HOURS_PER_MONTH, PriceTiers, billable_hours, quote,
};

fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, day)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

fn tiers() -> PriceTiers {
    PriceTiers::new(2.0, 20.0, 300.0)
}

// --- Billable hours ---

#[test]
fn test_billable_hours_rounds_started_hours_up() {
    assert_eq!(billable_hours(at(1, 9, 0), at(1, 10, 0)), 1);
    assert_eq!(billable_hours(at(1, 9, 0), at(1, 10, 30)), 2);
    assert_eq!(billable_hours(at(1, 9, 0), at(1, 9, 1)), 1);
    assert_eq!(billable_hours(at(1, 9, 0), at(2, 9, 0)), 24);
}

#[test]
fn test_billable_hours_minimum_is_one() {
    assert_eq!(billable_hours(at(1, 9, 0), at(1, 9, 0)), 1);
    assert_eq!(billable_hours(at(1, 10, 0), at(1, 9, 0)), 1);
}

// --- Strategies ---

#[test]
fn test_short_stay_is_charged_hourly() {
    let t = tiers();
    assert_eq!(t.hourly_only(5), 10.0);
    assert_eq!(t.optimal(5), 10.0);
}

#[test]
fn test_day_and_a_bit_mixes_daily_and_hourly() {
    let t = tiers();
    assert_eq!(t.hourly_only(30), 60.0);
    assert_eq!(t.daily_plus_hourly(30), 32.0);
    assert_eq!(t.optimal(30), 32.0);
}

#[test]
fn test_full_month_uses_monthly_rate() {
    let t = tiers();
    assert_eq!(t.monthly_only(HOURS_PER_MONTH), 300.0);
    assert_eq!(t.daily_plus_hourly(HOURS_PER_MONTH), 600.0);
    assert_eq!(t.optimal(HOURS_PER_MONTH), 300.0);
}

#[test]
fn test_month_plus_remainder_prefers_combination() {
    let t = tiers();
    // 750h = 1 month + 1 day + 6h
    assert_eq!(t.monthly_daily_hourly(750), 332.0);
    // two started months
    assert_eq!(t.monthly_only(750), 600.0);
    assert_eq!(t.optimal(750), 332.0);
}

#[test]
fn test_monthly_only_charges_at_least_one_month() {
    assert_eq!(tiers().monthly_only(1), 300.0);
}

#[test]
fn test_zero_rate_is_a_real_price() {
    let free_hourly = PriceTiers::new(0.0, 20.0, 300.0);
    assert_eq!(free_hourly.optimal(48), 0.0);
}

// --- Named plans ---

#[test]
fn test_explicit_plans() {
    let t = tiers();
    assert_eq!(t.price(DurationType::Hourly, 30), 60.0);
    // 25h is two started days
    assert_eq!(t.price(DurationType::Daily, 25), 40.0);
    assert_eq!(t.price(DurationType::Daily, 3), 20.0);
    assert_eq!(t.price(DurationType::Monthly, HOURS_PER_MONTH + 1), 600.0);
    assert_eq!(t.price(DurationType::Optimal, 30), 32.0);
}

#[test]
fn test_optimal_never_exceeds_any_strategy() {
    let t = PriceTiers::new(3.5, 25.0, 400.0);
    for hours in [1, 7, 23, 24, 25, 71, 200, 719, 720, 721, 1500] {
        let best = t.optimal(hours);
        assert!(best <= t.hourly_only(hours));
        assert!(best <= t.daily_plus_hourly(hours));
        assert!(best <= t.monthly_only(hours));
        assert!(best <= t.monthly_daily_hourly(hours));
    }
}

#[test]
fn test_quote_combines_hours_and_plan() {
    let q = quote(&tiers(), DurationType::Optimal, at(1, 8, 0), at(2, 13, 15));
    // 29h15m bills as 30h
    assert_eq!(q.hours, 30);
    assert_eq!(q.duration_type, DurationType::Optimal);
    assert_eq!(q.price, 32.0);
}

#[test]
fn test_duration_type_fallback() {
    assert_eq!(DurationType::from("daily".to_string()), DurationType::Daily);
    assert_eq!(DurationType::from("weekly".to_string()), DurationType::Optimal);

    let parsed: DurationType = serde_json::from_str(r#""fortnightly""#).unwrap();
    assert_eq!(parsed, DurationType::Optimal);
    assert_eq!(DurationType::default(), DurationType::Optimal);
    assert_eq!(
        serde_json::to_string(&DurationType::Monthly).unwrap(),
        r#""monthly""#
    );
}
