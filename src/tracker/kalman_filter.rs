//! Constant-velocity Kalman filter over `[cx, cy, area, aspect, vx, vy, varea]`
//! using ndarray and a nalgebra-based 4x4 inverse.
//!
//! Aspect ratio is treated as constant, so it carries no velocity term.

use ndarray::{Array1, Array2};

const STATE_DIM: usize = 7;
const MEASUREMENT_DIM: usize = 4;

#[derive(Debug, Clone)]
pub struct KalmanFilter {
    motion_mat: Array2<f64>,
    update_mat: Array2<f64>,
    process_noise: Array2<f64>,
    measurement_noise: Array2<f64>,
    initial_covariance: Array2<f64>,
}

impl Default for KalmanFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl KalmanFilter {
    pub fn new() -> Self {
        let mut motion_mat = Array2::eye(STATE_DIM);
        for i in 0..3 {
            motion_mat[[i, MEASUREMENT_DIM + i]] = 1.0;
        }

        let mut update_mat = Array2::zeros((MEASUREMENT_DIM, STATE_DIM));
        for i in 0..MEASUREMENT_DIM {
            update_mat[[i, i]] = 1.0;
        }

        let measurement_noise = Array2::from_diag(&Array1::from(vec![1.0, 1.0, 10.0, 10.0]));

        // Velocities are unobserved at birth, so start them highly uncertain.
        let initial_covariance = Array2::from_diag(&Array1::from(vec![
            10.0, 10.0, 10.0, 10.0, 1e4, 1e4, 1e4,
        ]));

        let process_noise = Array2::from_diag(&Array1::from(vec![
            1.0, 1.0, 1.0, 1.0, 1e-2, 1e-2, 1e-4,
        ]));

        Self {
            motion_mat,
            update_mat,
            process_noise,
            measurement_noise,
            initial_covariance,
        }
    }

    pub fn initiate(&self, measurement: [f64; 4]) -> (Array1<f64>, Array2<f64>) {
        let mut mean = Array1::zeros(STATE_DIM);
        for i in 0..MEASUREMENT_DIM {
            mean[i] = measurement[i];
        }
        (mean, self.initial_covariance.clone())
    }

    pub fn predict(
        &self,
        mean: &Array1<f64>,
        covariance: &Array2<f64>,
    ) -> (Array1<f64>, Array2<f64>) {
        let mut mean = mean.clone();
        // Keep the predicted area from collapsing below zero.
        if mean[6] + mean[2] <= 0.0 {
            mean[6] = 0.0;
        }

        let new_mean = self.motion_mat.dot(&mean);
        let new_covariance =
            self.motion_mat.dot(covariance).dot(&self.motion_mat.t()) + &self.process_noise;

        (new_mean, new_covariance)
    }

    /// Correct the state with a measurement.
    ///
    /// Returns `None` when the innovation covariance cannot be inverted; the
    /// caller treats the track as invalid.
    pub fn update(
        &self,
        mean: &Array1<f64>,
        covariance: &Array2<f64>,
        measurement: [f64; 4],
    ) -> Option<(Array1<f64>, Array2<f64>)> {
        let projected_mean = self.update_mat.dot(mean);
        let projected_cov =
            self.update_mat.dot(covariance).dot(&self.update_mat.t()) + &self.measurement_noise;

        let measurement_arr = Array1::from_vec(measurement.to_vec());
        let innovation = measurement_arr - projected_mean;

        // K = P * H^T * S^-1
        let s_inv = invert_4x4(&projected_cov)?;
        let pht = covariance.dot(&self.update_mat.t()); // 7x4
        let kalman_gain = pht.dot(&s_inv); // 7x4

        let new_mean = mean + &kalman_gain.dot(&innovation);
        let identity = Array2::<f64>::eye(STATE_DIM);
        let new_covariance = (identity - kalman_gain.dot(&self.update_mat)).dot(covariance);

        Some((new_mean, new_covariance))
    }
}

/// Invert a 4x4 matrix using nalgebra (pure Rust).
fn invert_4x4(m: &Array2<f64>) -> Option<Array2<f64>> {
    let mut nm = nalgebra::Matrix4::zeros();
    for i in 0..4 {
        for j in 0..4 {
            nm[(i, j)] = m[[i, j]];
        }
    }
    let inv = nm.try_inverse()?;
    let mut res = Array2::zeros((4, 4));
    for i in 0..4 {
        for j in 0..4 {
            res[[i, j]] = inv[(i, j)];
        }
    }
    Some(res)
}
