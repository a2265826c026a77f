use chrono::{Datelike, NaiveDate, Utc};

use crate::error::EngineError;
use crate::models::{DiscoveryFilter, DobRange, Gender, Point};

/// Radii below this are replaced by [`DEFAULT_DISCOVERY_RADIUS`]
pub const MIN_DISCOVERY_RADIUS: f64 = 4000.0;

/// Radius used when the requested one is missing or too small
pub const DEFAULT_DISCOVERY_RADIUS: f64 = 5000.0;

/// Discovery preferences as supplied by the requester
///
/// Every field is optional. Missing fields take the zero value: no origin,
/// radius 0 (which becomes the default radius), any gender and an age
/// range of `(0, 0)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscoveryPreferences {
    pub location: Option<(f64, f64)>,
    pub distance: Option<f64>,
    pub gender: Option<Gender>,
    pub age_range: Option<(i32, i32)>,
}

impl DiscoveryPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_location(mut self, lat: f64, lng: f64) -> Self {
        self.location = Some((lat, lng));
        self
    }

    pub fn with_distance(mut self, distance: f64) -> Self {
        self.distance = Some(distance);
        self
    }

    pub fn with_gender(mut self, gender: Gender) -> Self {
        self.gender = Some(gender);
        self
    }

    pub fn with_age_range(mut self, min_age: i32, max_age: i32) -> Self {
        self.age_range = Some((min_age, max_age));
        self
    }
}

/// Silent radius correction policy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadiusPolicy {
    pub min_radius: f64,
    pub default_radius: f64,
}

impl Default for RadiusPolicy {
    fn default() -> Self {
        Self {
            min_radius: MIN_DISCOVERY_RADIUS,
            default_radius: DEFAULT_DISCOVERY_RADIUS,
        }
    }
}

impl RadiusPolicy {
    #[inline]
    pub fn apply(&self, radius: f64) -> f64 {
        if radius < self.min_radius {
            self.default_radius
        } else {
            radius
        }
    }
}

/// Builds a [`DiscoveryFilter`] from [`DiscoveryPreferences`]
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterBuilder {
    policy: RadiusPolicy,
}

impl FilterBuilder {
    pub fn new(policy: RadiusPolicy) -> Self {
        Self { policy }
    }

    /// Build a filter relative to today's UTC date
    pub fn build(&self, preferences: &DiscoveryPreferences) -> Result<DiscoveryFilter, EngineError> {
        self.build_at(preferences, Utc::now().date_naive())
    }

    /// Build a filter relative to `today`
    pub fn build_at(
        &self,
        preferences: &DiscoveryPreferences,
        today: NaiveDate,
    ) -> Result<DiscoveryFilter, EngineError> {
        let origin = match preferences.location {
            Some((lat, lng)) => Point::new(lat, lng).ok_or_else(|| {
                EngineError::Validation(format!("invalid location ({}, {})", lat, lng))
            })?,
            None => Point::default(),
        };

        let distance = preferences.distance.unwrap_or(0.0);
        if !distance.is_finite() || distance < 0.0 {
            return Err(EngineError::Validation(format!(
                "distance must be a non-negative number, got {}",
                distance
            )));
        }

        let (min_age, max_age) = preferences.age_range.unwrap_or((0, 0));
        let dob_range = dob_range(min_age, max_age, today.year())?;

        Ok(DiscoveryFilter {
            origin,
            radius: self.policy.apply(distance),
            gender: preferences.gender,
            min_age,
            max_age,
            dob_range,
        })
    }
}

/// Convert an age range to a January-1-anchored date-of-birth interval
///
/// `min_dob = Jan 1 (year - max_age)`, `max_dob = Jan 1 (year - min_age + 1)`.
/// Bucketing is by calendar year, so the upper bound admits people born on
/// January 1 of the following year.
pub fn dob_range(min_age: i32, max_age: i32, current_year: i32) -> Result<DobRange, EngineError> {
    if min_age < 0 || max_age < 0 {
        return Err(EngineError::Validation(format!(
            "ages must be non-negative, got {}..{}",
            min_age, max_age
        )));
    }
    if min_age > max_age {
        return Err(EngineError::Validation(format!(
            "min age {} exceeds max age {}",
            min_age, max_age
        )));
    }

    let jan_first = |year: Option<i32>| {
        year.and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1))
            .ok_or_else(|| EngineError::Validation(format!("age range {}..{} out of bounds", min_age, max_age)))
    };

    Ok(DobRange {
        min_dob: jan_first(current_year.checked_sub(max_age))?,
        max_dob: jan_first(current_year.checked_sub(min_age).and_then(|y| y.checked_add(1)))?,
    })
}
