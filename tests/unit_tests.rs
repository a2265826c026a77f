// Unit tests for the swipe engine's public building blocks

use chrono::NaiveDate;
use swipe_engine::core::filters::{dob_range, DiscoveryPreferences, FilterBuilder, RadiusPolicy};
use swipe_engine::core::geo::{decode, decode_hex, distance_km, encode, encode_hex, haversine_distance};
use swipe_engine::core::calculate_age;
use swipe_engine::models::{Gender, Point};
use swipe_engine::EngineError;

fn point(lat: f64, lng: f64) -> Point {
    Point::new(lat, lng).unwrap()
}

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn test_haversine_distance_zero() {
    let distance = haversine_distance(40.7128, -74.0060, 40.7128, -74.0060);
    assert!(distance < 0.01);
}

#[test]
fn test_haversine_distance_manhattan_to_brooklyn() {
    // Manhattan to Brooklyn is approximately 5-10 km
    let distance = haversine_distance(40.7580, -73.9855, 40.6782, -73.9442);
    assert!(distance > 5.0 && distance < 15.0);
}

#[test]
fn test_distance_km_reference_values() {
    let la = point(34.0522, -118.2437);
    let nyc = point(40.7128, -74.0060);
    assert_eq!(distance_km(&la, &nyc), 3935);
    assert_eq!(distance_km(&nyc, &la), 3935);
    assert_eq!(distance_km(&point(51.5074, -0.1278), &point(48.8566, 2.3522)), 343);
}

#[test]
fn test_codec_round_trip_across_the_globe() {
    for (lat, lng) in [(40.7128, -74.0060), (-33.8688, 151.2093), (89.9, 179.9), (-89.9, -179.9)] {
        let p = point(lat, lng);
        assert_eq!(decode(&encode(&p).unwrap()).unwrap(), p);
        assert_eq!(decode_hex(&encode_hex(&p).unwrap()).unwrap(), p);
    }
}

#[test]
fn test_decode_rejects_garbage() {
    assert!(decode(&[]).is_err());
    assert!(decode(b"not a point").is_err());
    assert!(decode_hex("zz").is_err());
}

#[test]
fn test_radius_policy_threshold() {
    let policy = RadiusPolicy::default();
    assert_eq!(policy.apply(0.0), 5000.0);
    assert_eq!(policy.apply(3999.9), 5000.0);
    assert_eq!(policy.apply(4000.0), 4000.0);
    assert_eq!(policy.apply(25000.0), 25000.0);
}

#[test]
fn test_dob_range_is_january_anchored() {
    let range = dob_range(25, 30, 2024).unwrap();
    assert_eq!(range.min_dob, ymd(1994, 1, 1));
    assert_eq!(range.max_dob, ymd(2000, 1, 1));
    assert!(range.contains(ymd(1994, 1, 1)));
    assert!(range.contains(ymd(2000, 1, 1)));
    assert!(!range.contains(ymd(2000, 1, 2)));
}

#[test]
fn test_filter_builder_rejects_inverted_ages() {
    let prefs = DiscoveryPreferences::new().with_age_range(40, 20);
    let result = FilterBuilder::default().build_at(&prefs, ymd(2024, 6, 15));
    assert!(matches!(result, Err(EngineError::Validation(_))));
}

#[test]
fn test_filter_builder_carries_preferences() {
    let prefs = DiscoveryPreferences::new()
        .with_location(34.0522, -118.2437)
        .with_distance(12000.0)
        .with_gender(Gender::Female)
        .with_age_range(21, 35);
    let filter = FilterBuilder::default().build_at(&prefs, ymd(2024, 6, 15)).unwrap();

    assert_eq!(filter.origin, point(34.0522, -118.2437));
    assert_eq!(filter.radius, 12000.0);
    assert_eq!(filter.gender, Some(Gender::Female));
    assert!(filter.has_radius());
}

#[test]
fn test_age_around_birthday() {
    let dob = ymd(1990, 6, 15);
    assert_eq!(calculate_age(dob, ymd(2024, 6, 14)), 33);
    assert_eq!(calculate_age(dob, ymd(2024, 6, 15)), 34);
    assert_eq!(calculate_age(dob, ymd(2024, 6, 16)), 34);
}
