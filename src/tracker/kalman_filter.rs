//! Kalman filter for bounding box tracking using ndarray and a nalgebra-based inverse.
//!
//! The 8-dimensional state is `(cx, cy, a, h, vcx, vcy, va, vh)`: box center,
//! aspect ratio (w/h), height, and their velocities. Observations are the
//! first four components. Motion is constant-velocity; position and velocity
//! noise are proportional to the current height.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Noise weights of the motion model, relative to the box height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct KalmanConfig {
    pub std_weight_position: f64,
    pub std_weight_velocity: f64,
}

impl Default for KalmanConfig {
    fn default() -> Self {
        Self {
            std_weight_position: 1.0 / 20.0,
            std_weight_velocity: 1.0 / 160.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum KalmanError {
    #[error("innovation covariance is singular")]
    SingularInnovation,
    #[error("correction produced a non-finite state")]
    NonFinite,
}

#[derive(Debug, Clone)]
pub struct KalmanFilter {
    motion_mat: Array2<f64>,
    update_mat: Array2<f64>,
    std_weight_position: f64,
    std_weight_velocity: f64,
}

impl Default for KalmanFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl KalmanFilter {
    pub fn new() -> Self {
        Self::with_config(KalmanConfig::default())
    }

    pub fn with_config(config: KalmanConfig) -> Self {
        let ndim = 4;
        let mut motion_mat = Array2::eye(2 * ndim);
        for i in 0..ndim {
            motion_mat[[i, ndim + i]] = 1.0;
        }

        let mut update_mat = Array2::zeros((ndim, 2 * ndim));
        for i in 0..ndim {
            update_mat[[i, i]] = 1.0;
        }

        Self {
            motion_mat,
            update_mat,
            std_weight_position: config.std_weight_position,
            std_weight_velocity: config.std_weight_velocity,
        }
    }

    /// Create a track state from an unassociated XYAH measurement.
    pub fn initiate(&self, measurement: [f64; 4]) -> (Array1<f64>, Array2<f64>) {
        let mut mean = Array1::zeros(8);
        for i in 0..4 {
            mean[i] = measurement[i];
        }

        let h = measurement[3];
        let std = [
            2.0 * self.std_weight_position * h,
            2.0 * self.std_weight_position * h,
            1e-2,
            2.0 * self.std_weight_position * h,
            10.0 * self.std_weight_velocity * h,
            10.0 * self.std_weight_velocity * h,
            1e-5,
            10.0 * self.std_weight_velocity * h,
        ];

        (mean, diag_squared(&std))
    }

    pub fn predict(
        &self,
        mean: &Array1<f64>,
        covariance: &Array2<f64>,
    ) -> (Array1<f64>, Array2<f64>) {
        let h = mean[3];
        let std = [
            self.std_weight_position * h,
            self.std_weight_position * h,
            1e-2,
            self.std_weight_position * h,
            self.std_weight_velocity * h,
            self.std_weight_velocity * h,
            1e-5,
            self.std_weight_velocity * h,
        ];
        let motion_cov = diag_squared(&std);

        let new_mean = self.motion_mat.dot(mean);
        let new_covariance = self.motion_mat.dot(covariance).dot(&self.motion_mat.t()) + motion_cov;

        (new_mean, new_covariance)
    }

    /// Project the state distribution to measurement space.
    pub fn project(
        &self,
        mean: &Array1<f64>,
        covariance: &Array2<f64>,
    ) -> (Array1<f64>, Array2<f64>) {
        let h = mean[3];
        let std = [
            self.std_weight_position * h,
            self.std_weight_position * h,
            1e-1,
            self.std_weight_position * h,
        ];
        let innovation_cov = diag_squared(&std);

        let mean_proj = self.update_mat.dot(mean);
        let covariance_proj =
            self.update_mat.dot(covariance).dot(&self.update_mat.t()) + innovation_cov;

        (mean_proj, covariance_proj)
    }

    /// Correct the state with an XYAH measurement.
    ///
    /// Fails without touching the inputs when the innovation covariance
    /// cannot be inverted or the corrected state is not finite.
    pub fn update(
        &self,
        mean: &Array1<f64>,
        covariance: &Array2<f64>,
        measurement: [f64; 4],
    ) -> Result<(Array1<f64>, Array2<f64>), KalmanError> {
        let (projected_mean, projected_cov) = self.project(mean, covariance);

        let measurement_arr = Array1::from_vec(measurement.to_vec());
        let innovation = measurement_arr - projected_mean;

        // K = P * H^T * S^-1, with S = H * P * H^T + R.
        let s_inv = invert_4x4(&projected_cov).ok_or(KalmanError::SingularInnovation)?;

        let pht = covariance.dot(&self.update_mat.t()); // 8x4
        let kalman_gain = pht.dot(&s_inv); // 8x4

        let new_mean = mean + &kalman_gain.dot(&innovation);
        // (I - K * H) * P
        let identity = Array2::<f64>::eye(8);
        let new_covariance = (identity - kalman_gain.dot(&self.update_mat)).dot(covariance);

        if new_mean.iter().chain(new_covariance.iter()).any(|v| !v.is_finite()) {
            return Err(KalmanError::NonFinite);
        }

        Ok((new_mean, new_covariance))
    }
}

fn diag_squared(std: &[f64]) -> Array2<f64> {
    let mut cov = Array2::zeros((std.len(), std.len()));
    for (i, s) in std.iter().enumerate() {
        cov[[i, i]] = s * s;
    }
    cov
}

/// Invert a 4x4 matrix using nalgebra (pure Rust).
fn invert_4x4(m: &Array2<f64>) -> Option<Array2<f64>> {
    let nm = nalgebra::Matrix4::from_fn(|i, j| m[[i, j]]);
    if !nm.iter().all(|v| v.is_finite()) {
        return None;
    }
    let inv = nm.try_inverse()?;
    if !inv.iter().all(|v| v.is_finite()) {
        return None;
    }
    Some(Array2::from_shape_fn((4, 4), |(i, j)| inv[(i, j)]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_initiate() {
        let kf = KalmanFilter::new();
        let (mean, cov) = kf.initiate([100.0, 200.0, 0.5, 50.0]);
        assert_eq!(mean[0], 100.0);
        assert_eq!(mean[3], 50.0);
        assert_eq!(mean[4], 0.0);
        // 2 * (1/20) * 50 = 5
        assert_relative_eq!(cov[[0, 0]], 25.0, epsilon = 1e-9);
        assert_eq!(cov[[0, 1]], 0.0);
    }

    #[test]
    fn test_predict_applies_velocity() {
        let kf = KalmanFilter::new();
        let (mut mean, cov) = kf.initiate([100.0, 100.0, 1.0, 50.0]);
        mean[4] = 2.0;
        let (predicted, predicted_cov) = kf.predict(&mean, &cov);
        assert_relative_eq!(predicted[0], 102.0, epsilon = 1e-9);
        assert_relative_eq!(predicted[1], 100.0, epsilon = 1e-9);
        assert!(predicted_cov[[0, 0]] > cov[[0, 0]]);
    }

    #[test]
    fn test_update_moves_toward_measurement() {
        let kf = KalmanFilter::new();
        let (mean, cov) = kf.initiate([100.0, 100.0, 1.0, 50.0]);
        let (mean, cov) = kf.predict(&mean, &cov);
        let (updated, updated_cov) = kf.update(&mean, &cov, [110.0, 100.0, 1.0, 50.0]).unwrap();
        assert!(updated[0] > 100.0 && updated[0] < 110.0);
        assert!(updated[4] > 0.0);
        assert!(updated_cov[[0, 0]] < cov[[0, 0]]);
    }

    #[test]
    fn test_update_rejects_singular_innovation() {
        let kf = KalmanFilter::new();
        let mean = Array1::zeros(8);
        let cov = Array2::zeros((8, 8));
        // Zero height zeroes the position noise; the aspect entry alone
        // cannot make S invertible.
        assert_eq!(
            kf.update(&mean, &cov, [1.0, 1.0, 1.0, 0.0]),
            Err(KalmanError::SingularInnovation)
        );
    }

    #[test]
    fn test_update_rejects_non_finite_measurement() {
        let kf = KalmanFilter::new();
        let (mean, cov) = kf.initiate([100.0, 100.0, 1.0, 50.0]);
        assert_eq!(
            kf.update(&mean, &cov, [f64::NAN, 100.0, 1.0, 50.0]),
            Err(KalmanError::NonFinite)
        );
    }

    #[test]
    fn test_project_adds_measurement_noise() {
        let kf = KalmanFilter::new();
        let (mean, cov) = kf.initiate([0.0, 0.0, 1.0, 20.0]);
        let (proj_mean, proj_cov) = kf.project(&mean, &cov);
        assert_eq!(proj_mean.len(), 4);
        assert_relative_eq!(proj_cov[[2, 2]], 1e-4 + 1e-2, epsilon = 1e-12);
    }
}
