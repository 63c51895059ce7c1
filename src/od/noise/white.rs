/*
    Nyx, blazing fast astrodynamics
    Copyright (C) 2018-onwards Christopher Rabotin <christopher.rabotin@gmail.com>

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use std::ops::{Mul, MulAssign};

use hifitime::Epoch;
use rand::Rng;
use rand_distr::Normal;
use serde_derive::{Deserialize, Serialize};

use super::Stochastics;
use crate::io::ConfigRepr;

/// Maximum number of draws when a noisy sample must keep the sign of its noiseless value.
pub const MAX_RESAMPLES: usize = 64;

/// White noise is an uncorrelated random variable.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WhiteNoise {
    /// Mean value of this white noise
    pub mean: f64,
    /// Process noise as a one-sigma of the Normal distribution.
    pub sigma: f64,
}

impl WhiteNoise {
    /// Initializes a new zero mean white noise, assuming that the noise level is fixed.
    pub fn constant_white_noise(sigma: f64) -> Self {
        Self {
            sigma,
            ..Default::default()
        }
    }

    /// Returns the noiseless value plus a sample of this noise, re-drawing the sample until the noisy value keeps the sign of the noiseless one.
    ///
    /// Range observables cannot be negative: if no suitable sample is found after [MAX_RESAMPLES] draws, the noiseless value is returned.
    pub fn apply_preserving_sign<R: Rng>(&mut self, value: f64, epoch: Epoch, rng: &mut R) -> f64 {
        if self.sigma <= 0.0 && self.mean == 0.0 {
            return value;
        }

        for _ in 0..MAX_RESAMPLES {
            let noisy = value + self.sample(epoch, rng);
            if noisy.signum() == value.signum() || value == 0.0 {
                return noisy;
            }
        }

        warn!(
            "could not sample noise (mean = {}, sigma = {}) preserving the sign of {value} after {MAX_RESAMPLES} attempts, keeping noiseless value",
            self.mean, self.sigma
        );
        value
    }
}

impl ConfigRepr for WhiteNoise {}

impl Stochastics for WhiteNoise {
    fn covariance(&self, _epoch: Epoch) -> f64 {
        self.sigma.powi(2)
    }

    fn sample<R: Rng>(&mut self, _epoch: Epoch, rng: &mut R) -> f64 {
        match Normal::new(self.mean, self.sigma) {
            Ok(normal) => rng.sample(normal),
            Err(_) => self.mean,
        }
    }
}

impl Mul<f64> for WhiteNoise {
    type Output = Self;

    /// Scale the white noise sigmas by a constant.
    fn mul(mut self, rhs: f64) -> Self::Output {
        self.sigma *= rhs;
        self
    }
}

impl MulAssign<f64> for WhiteNoise {
    fn mul_assign(&mut self, rhs: f64) {
        *self = *self * rhs;
    }
}
