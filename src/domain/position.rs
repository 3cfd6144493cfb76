//! Geographic positions pushed by drivers, and the arrival estimate shown on
//! the tracking page.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Mean earth radius in metres.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Average courier speed used for arrival estimates.
pub const DEFAULT_COURIER_SPEED_KMH: f64 = 25.0;

/// A validated latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    lat: f64,
    lng: f64,
}

impl Coordinates {
    /// Create coordinates, rejecting values outside `[-90, 90] x [-180, 180]`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCoordinates`] for out-of-range or non-finite values.
    pub fn try_new(lat: f64, lng: f64) -> Result<Self, Error> {
        let valid = lat.is_finite()
            && lng.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lng);
        if !valid {
            return Err(Error::InvalidCoordinates { lat, lng });
        }
        Ok(Self { lat, lng })
    }

    #[must_use]
    pub const fn lat(&self) -> f64 {
        self.lat
    }

    #[must_use]
    pub const fn lng(&self) -> f64 {
        self.lng
    }

    /// Great-circle distance in metres (haversine).
    #[must_use]
    pub fn distance_to(&self, other: &Coordinates) -> f64 {
        let phi1 = self.lat.to_radians();
        let phi2 = other.lat.to_radians();
        let d_phi = (other.lat - self.lat).to_radians();
        let d_lambda = (other.lng - self.lng).to_radians();

        let a = (d_phi / 2.0).sin().powi(2)
            + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_M * c
    }
}

/// Last known driver position for a tracked delivery.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub lat: f64,
    pub lng: f64,
    pub updated_at: DateTime<Utc>,
}

impl Position {
    #[must_use]
    pub const fn new(lat: f64, lng: f64, updated_at: DateTime<Utc>) -> Self {
        Self {
            lat,
            lng,
            updated_at,
        }
    }

    /// Distance in metres from this position to `destination`.
    #[must_use]
    pub fn distance_to(&self, destination: &Coordinates) -> f64 {
        let here = Coordinates {
            lat: self.lat,
            lng: self.lng,
        };
        here.distance_to(destination)
    }

    /// Estimate the remaining travel to `destination` at `speed_kmh`.
    ///
    /// Minutes are rounded up; a non-positive speed falls back to
    /// [`DEFAULT_COURIER_SPEED_KMH`].
    #[must_use]
    pub fn estimate_arrival(&self, destination: &Coordinates, speed_kmh: f64) -> ArrivalEstimate {
        let speed = if speed_kmh > 0.0 {
            speed_kmh
        } else {
            DEFAULT_COURIER_SPEED_KMH
        };
        let distance_m = self.distance_to(destination);
        let hours = distance_m / 1000.0 / speed;
        let minutes = (hours * 60.0).ceil() as u32;

        ArrivalEstimate {
            distance_m: distance_m.round() as u64,
            minutes,
            arrives_at: self.updated_at.max(Utc::now())
                + chrono::Duration::minutes(i64::from(minutes)),
        }
    }
}

/// Result of [`Position::estimate_arrival`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrivalEstimate {
    pub distance_m: u64,
    pub minutes: u32,
    pub arrives_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_coordinates() {
        assert!(Coordinates::try_new(91.0, 0.0).is_err());
        assert!(Coordinates::try_new(0.0, -180.5).is_err());
        assert!(Coordinates::try_new(f64::NAN, 0.0).is_err());
        assert!(Coordinates::try_new(-90.0, 180.0).is_ok());
    }

    #[test]
    fn distance_between_identical_points_is_zero() {
        let p = Coordinates::try_new(43.61, 3.877).unwrap();
        assert!(p.distance_to(&p).abs() < 1e-6);
    }

    #[test]
    fn distance_montpellier_to_nimes() {
        // Roughly 45 km as the crow flies.
        let montpellier = Coordinates::try_new(43.6108, 3.8767).unwrap();
        let nimes = Coordinates::try_new(43.8367, 4.3601).unwrap();
        let d = montpellier.distance_to(&nimes);
        assert!((44_000.0..47_000.0).contains(&d), "distance was {d}");
    }

    #[test]
    fn estimate_rounds_minutes_up() {
        let pos = Position::new(43.6108, 3.8767, Utc::now());
        // About 1.1 km north.
        let dest = Coordinates::try_new(43.6208, 3.8767).unwrap();
        let eta = pos.estimate_arrival(&dest, DEFAULT_COURIER_SPEED_KMH);
        assert_eq!(eta.minutes, 3);
        assert!((1_000..1_200).contains(&eta.distance_m));
    }

    #[test]
    fn estimate_with_invalid_speed_uses_default() {
        let pos = Position::new(43.6108, 3.8767, Utc::now());
        let dest = Coordinates::try_new(43.6208, 3.8767).unwrap();
        let a = pos.estimate_arrival(&dest, 0.0);
        let b = pos.estimate_arrival(&dest, DEFAULT_COURIER_SPEED_KMH);
        assert_eq!(a.minutes, b.minutes);
    }
}
