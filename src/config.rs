use std::error::Error;
use std::fs;
use std::path::Path;

use nalgebra::{SMatrix, SVector};
use serde::{Deserialize, Serialize};

use crate::error::FilterError;
use crate::filter::ExtendedKalmanFilter;
use crate::models::{MeasurementModel, ProcessModel};
use crate::utils::state::GaussianState;

/// Initial estimate and noise covariances of a filter.
///
/// Matrices are flat row-major lists. An empty list selects the default:
/// zero state, identity covariance, zero process noise, identity measurement noise.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub initial_state: Vec<f64>,
    pub initial_covariance: Vec<f64>,
    pub process_noise: Vec<f64>,
    pub measurement_noise: Vec<f64>,
}

impl FilterConfig {
    pub fn initial_estimate<const S: usize>(&self) -> Result<GaussianState<f64, S>, FilterError> {
        let x = if self.initial_state.is_empty() {
            SVector::zeros()
        } else {
            check_len("initial_state", &self.initial_state, S)?;
            SVector::from_column_slice(&self.initial_state)
        };
        let cov = square("initial_covariance", &self.initial_covariance, SMatrix::identity())?;
        Ok(GaussianState { x, cov })
    }

    pub fn process_noise<const S: usize>(&self) -> Result<SMatrix<f64, S, S>, FilterError> {
        square("process_noise", &self.process_noise, SMatrix::zeros())
    }

    pub fn measurement_noise<const Z: usize>(&self) -> Result<SMatrix<f64, Z, Z>, FilterError> {
        square("measurement_noise", &self.measurement_noise, SMatrix::identity())
    }

    /// Builds a filter, checking every list against the `S`/`Z` sizes.
    pub fn build<const S: usize, const Z: usize>(
        &self,
        process_model: Box<dyn ProcessModel<f64, S>>,
        measurement_model: Box<dyn MeasurementModel<f64, S, Z>>,
    ) -> Result<ExtendedKalmanFilter<f64, S, Z>, FilterError> {
        Ok(ExtendedKalmanFilter::new(
            self.initial_estimate()?,
            self.process_noise()?,
            self.measurement_noise()?,
            process_model,
            measurement_model,
        ))
    }
}

/// Model choice for the replay binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelConfig {
    /// One scalar state observed directly
    RandomWalk,
    /// [px, py, vx, vy] observed as range and bearing to `beacon`
    ConstantVelocityRangeBearing { dt: f64, beacon: [f64; 2] },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayConfig {
    pub model: ModelConfig,
    #[serde(default)]
    pub filter: FilterConfig,
}

impl ReplayConfig {
    pub fn from_json(json: &str) -> Result<ReplayConfig, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<ReplayConfig, Box<dyn Error>> {
        let json = fs::read_to_string(path)?;
        Ok(ReplayConfig::from_json(&json)?)
    }
}

fn check_len(what: &str, values: &[f64], expected: usize) -> Result<(), FilterError> {
    if values.len() != expected {
        return Err(FilterError::dimension_mismatch(what, expected, values.len()));
    }
    Ok(())
}

fn square<const K: usize>(
    what: &str,
    values: &[f64],
    default: SMatrix<f64, K, K>,
) -> Result<SMatrix<f64, K, K>, FilterError> {
    if values.is_empty() {
        return Ok(default);
    }
    check_len(what, values, K * K)?;
    Ok(SMatrix::from_row_slice(values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LinearMeasurement, LinearProcess};
    use nalgebra::{Matrix2, Vector2};

    #[test]
    fn defaults_for_empty_lists() {
        let config = FilterConfig::default();
        let estimate = config.initial_estimate::<2>().unwrap();
        assert_eq!(estimate.x, Vector2::zeros());
        assert_eq!(estimate.cov, Matrix2::identity());
        assert_eq!(config.process_noise::<2>().unwrap(), Matrix2::zeros());
        assert_eq!(config.measurement_noise::<3>().unwrap(), SMatrix::<f64, 3, 3>::identity());
    }

    #[test]
    fn matrices_are_row_major() {
        let config = FilterConfig {
            process_noise: vec![1., 2., 3., 4.],
            ..Default::default()
        };
        assert_eq!(config.process_noise::<2>().unwrap(), Matrix2::new(1., 2., 3., 4.));
    }

    #[test]
    fn wrong_length_is_dimension_mismatch() {
        let config = FilterConfig {
            initial_state: vec![1., 2., 3.],
            ..Default::default()
        };
        let err = config
            .build::<2, 2>(
                Box::new(LinearProcess::<f64, 2>::identity()),
                Box::new(LinearMeasurement::<f64, 2, 2>::identity()),
            )
            .err();
        assert_eq!(
            err,
            Some(FilterError::DimensionMismatch {
                what: "initial_state".to_owned(),
                expected: 2,
                actual: 3
            })
        );
    }

    #[test]
    fn parse_replay_config() {
        let json = r#"{
            "model": { "kind": "constant_velocity_range_bearing", "dt": 0.1, "beacon": [50.0, -30.0] },
            "filter": { "initial_state": [0, 0, 1, 0.5], "measurement_noise": [0.25, 0, 0, 0.0003] }
        }"#;
        let config = ReplayConfig::from_json(json).unwrap();
        assert_eq!(
            config.model,
            ModelConfig::ConstantVelocityRangeBearing {
                dt: 0.1,
                beacon: [50.0, -30.0]
            }
        );
        assert_eq!(config.filter.initial_state, vec![0., 0., 1., 0.5]);
        assert!(config.filter.process_noise.is_empty());
    }

    #[test]
    fn filter_section_is_optional() {
        let config = ReplayConfig::from_json(r#"{ "model": { "kind": "random_walk" } }"#).unwrap();
        assert_eq!(config.model, ModelConfig::RandomWalk);
        assert_eq!(config.filter, FilterConfig::default());
    }
}
