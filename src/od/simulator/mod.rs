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

use crate::cosmic::{Cosm, SpacePoint};
use crate::linalg::DMatrix;
use crate::od::models::{MeasurementConfig, MeasurementModel, ModelState};
use crate::od::msr::{MeasurementData, MeasurementType};
use crate::od::noise::{Stochastics, WhiteNoise};
use crate::od::{InvalidSettingSnafu, MeasurementError};
use crate::time::{Duration, Epoch, TimeSeries};
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;
use rayon::prelude::*;
use snafu::ensure;
use std::fmt;
use std::sync::Arc;

/// Simulates the measurements of one model over many epochs, in parallel.
///
/// Each epoch is evaluated on its own clone of the model, with its own random number generator seeded from the seed of
/// this simulator and the index of the epoch, so the output does not depend on the thread scheduling.
///
/// # Choice of the random number generator
/// The Pcg64Mcg is chosen because it is fast, space efficient, and has a good statistical distribution.
#[derive(Clone, Debug)]
pub struct TrackingSimulator {
    model: MeasurementModel,
    noise: Option<WhiteNoise>,
    seed: u64,
}

impl TrackingSimulator {
    /// Builds a simulator from a model, initializing it if needed. Without noise, the simulated measurements are exact.
    pub fn with_seed(
        mut model: MeasurementModel,
        noise: Option<WhiteNoise>,
        seed: u64,
    ) -> Result<Self, MeasurementError> {
        if model.state() == ModelState::Uninitialized {
            ensure!(
                model.initialize()?,
                InvalidSettingSnafu {
                    msg: format!("{model} cannot be initialized")
                }
            );
        }
        Ok(Self { model, noise, seed })
    }

    /// Builds a simulator seeded from system entropy.
    pub fn new(model: MeasurementModel, noise: Option<WhiteNoise>) -> Result<Self, MeasurementError> {
        Self::with_seed(model, noise, rand::random())
    }

    /// Builds the model of the configuration from the available participants, with the noise of the configuration.
    pub fn from_config(
        cfg: &MeasurementConfig,
        available: &[Arc<dyn SpacePoint>],
        seed: u64,
    ) -> Result<Self, MeasurementError> {
        Self::with_seed(cfg.build(available)?, cfg.noise, seed)
    }

    pub fn model(&self) -> &MeasurementModel {
        &self.model
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Returns the feasible measurements at the provided epochs, in the same order.
    pub fn generate(
        &self,
        epochs: &[Epoch],
        cosm: &dyn Cosm,
    ) -> Result<Vec<MeasurementData>, MeasurementError> {
        let start = std::time::Instant::now();

        let measurements = epochs
            .par_iter()
            .enumerate()
            .map(|(index, epoch)| self.measure(index as u64, *epoch, cosm))
            .collect::<Result<Vec<Option<MeasurementData>>, MeasurementError>>()?
            .into_iter()
            .flatten()
            .collect::<Vec<MeasurementData>>();

        info!(
            "[{}] simulated {} feasible measurements out of {} epochs in {:?}",
            self.model.name(),
            measurements.len(),
            epochs.len(),
            start.elapsed()
        );
        Ok(measurements)
    }

    /// Returns the feasible measurements every `step` from `start` to `end` included.
    pub fn generate_over(
        &self,
        start: Epoch,
        end: Epoch,
        step: Duration,
        cosm: &dyn Cosm,
    ) -> Result<Vec<MeasurementData>, MeasurementError> {
        let epochs = TimeSeries::inclusive(start, end, step).collect::<Vec<Epoch>>();
        self.generate(&epochs, cosm)
    }

    fn measure(
        &self,
        index: u64,
        epoch: Epoch,
        cosm: &dyn Cosm,
    ) -> Result<Option<MeasurementData>, MeasurementError> {
        let mut model = self.model.clone();
        if !model.evaluate(epoch, false, cosm)? || !model.evaluate(epoch, true, cosm)? {
            return Ok(None);
        }

        let mut msr = model.measurement().clone();
        if let Some(mut noise) = self.noise {
            let mut rng = Pcg64Mcg::seed_from_u64(self.seed.wrapping_add(index));
            for value in msr.value.iter_mut() {
                *value = match msr.msr_type {
                    MeasurementType::OpticalAzEl => *value + noise.sample(epoch, &mut rng),
                    _ => noise.apply_preserving_sign(*value, epoch, &mut rng),
                };
            }
            let n = msr.value.len();
            msr.covariance = DMatrix::identity(n, n) * noise.covariance(epoch);
        }
        Ok(Some(msr))
    }
}

impl fmt::Display for TrackingSimulator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.noise {
            Some(noise) => write!(f, "{} with noise sigma {}", self.model, noise.sigma),
            None => write!(f, "{} without noise", self.model),
        }
    }
}
