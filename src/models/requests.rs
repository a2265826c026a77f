use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::domain::{Gender, NewUser, Point, SwipeDirection, UserId};

/// Query parameters for the discover endpoint
///
/// Both coordinates are required to be non-zero.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_discover_origin"))]
pub struct DiscoverRequest {
    #[serde(rename = "lat")]
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[serde(rename = "lng")]
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub distance: f64,
    #[serde(default, rename = "minAge")]
    #[validate(range(min = 0))]
    pub min_age: i32,
    #[serde(default, rename = "maxAge")]
    #[validate(range(min = 0))]
    pub max_age: i32,
    #[validate(custom(function = "validate_gender"))]
    pub gender: String,
}

impl DiscoverRequest {
    /// Gender as the engine type; only meaningful after validation
    pub fn gender(&self) -> Option<Gender> {
        self.gender.parse().ok()
    }
}

/// Body of the swipe endpoint
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SwipeRequest {
    #[serde(rename = "targetUserId")]
    #[validate(range(min = 1))]
    pub target_user_id: UserId,
    #[validate(custom(function = "validate_preference"))]
    pub preference: String,
}

impl SwipeRequest {
    pub fn direction(&self) -> SwipeDirection {
        if self.preference == "YES" {
            SwipeDirection::Right
        } else {
            SwipeDirection::Left
        }
    }
}

/// Body of the user creation endpoint
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_birth_date"))]
pub struct CreateUserRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(custom(function = "validate_gender"))]
    pub gender: String,
    #[serde(rename = "dateOfBirth")]
    pub date_of_birth: NaiveDate,
    #[serde(rename = "lat")]
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[serde(rename = "lng")]
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
}

impl CreateUserRequest {
    /// The user to insert; `None` when the request has not passed validation
    pub fn to_new_user(&self) -> Option<NewUser> {
        Some(NewUser {
            email: self.email.clone(),
            name: self.name.clone(),
            gender: self.gender.parse().ok()?,
            date_of_birth: self.date_of_birth,
            location: Point::new(self.latitude, self.longitude)?,
        })
    }
}

fn validate_discover_origin(req: &DiscoverRequest) -> Result<(), ValidationError> {
    if req.latitude == 0.0 || req.longitude == 0.0 {
        return Err(ValidationError::new("origin_required"));
    }
    Ok(())
}

fn validate_birth_date(req: &CreateUserRequest) -> Result<(), ValidationError> {
    if req.date_of_birth > chrono::Utc::now().date_naive() {
        return Err(ValidationError::new("date_of_birth_in_future"));
    }
    Ok(())
}

fn validate_gender(gender: &str) -> Result<(), ValidationError> {
    gender
        .parse::<Gender>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("gender"))
}

fn validate_preference(preference: &str) -> Result<(), ValidationError> {
    match preference {
        "YES" | "NO" => Ok(()),
        _ => Err(ValidationError::new("preference")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn discover_request(distance: f64, gender: &str) -> DiscoverRequest {
        DiscoverRequest {
            latitude: 34.0522,
            longitude: -118.2437,
            distance,
            min_age: 18,
            max_age: 30,
            gender: gender.to_string(),
        }
    }

    #[test]
    fn test_discover_request_validation() {
        assert!(discover_request(10.0, "MALE").validate().is_ok());
        assert!(discover_request(-10.0, "MALE").validate().is_err());
        assert!(discover_request(10.0, "OTHER").validate().is_err());
    }

    #[test]
    fn test_discover_request_rejects_zero_coordinates() {
        let mut req = discover_request(10.0, "FEMALE");
        req.latitude = 0.0;
        assert!(req.validate().is_err());

        let mut req = discover_request(10.0, "FEMALE");
        req.longitude = 0.0;
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_create_user_request() {
        let body: CreateUserRequest = serde_json::from_str(
            r#"{"email": "ana@example.com", "name": "Ana", "gender": "FEMALE",
                "dateOfBirth": "1995-04-02", "lat": 40.7128, "lng": -74.0060}"#,
        )
        .unwrap();
        assert!(body.validate().is_ok());

        let user = body.to_new_user().unwrap();
        assert_eq!(user.gender, Gender::Female);
        assert_eq!(user.location, Point::new(40.7128, -74.0060).unwrap());

        let mut bad = body.clone();
        bad.email = "not-an-email".to_string();
        assert!(bad.validate().is_err());

        let mut bad = body;
        bad.date_of_birth = NaiveDate::from_ymd_opt(2999, 1, 1).unwrap();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_swipe_request_direction() {
        let body: SwipeRequest =
            serde_json::from_str(r#"{"targetUserId": 2, "preference": "YES"}"#).unwrap();
        assert!(body.validate().is_ok());
        assert_eq!(body.direction(), SwipeDirection::Right);

        let body: SwipeRequest =
            serde_json::from_str(r#"{"targetUserId": 2, "preference": "MAYBE"}"#).unwrap();
        assert!(body.validate().is_err());
    }
}
