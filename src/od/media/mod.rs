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
use crate::linalg::Vector3;
use crate::time::Epoch;
use crate::utils::unit_or_zero;
use serde_derive::{Deserialize, Serialize};
use std::fmt;
use std::ops::AddAssign;
use std::sync::Arc;

mod troposphere;
pub use troposphere::Troposphere;

/// Troposphere corrections outside of [0, 60] m are reported as suspicious.
pub const TROPOSPHERE_MAX_M: f64 = 60.0;
/// Ionosphere corrections outside of [0, 20] m are reported as suspicious.
pub const IONOSPHERE_MAX_M: f64 = 20.0;

/// Surface meteorological conditions at a ground station.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Weather {
    pub temperature_k: f64,
    pub pressure_hpa: f64,
    /// Relative humidity, in percent
    pub humidity_pct: f64,
}

impl Default for Weather {
    fn default() -> Self {
        Self {
            temperature_k: 295.1,
            pressure_hpa: 1013.5,
            humidity_pct: 55.0,
        }
    }
}

/// Which layer of the atmosphere a media correction models.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MediaKind {
    Troposphere,
    Ionosphere,
}

/// The geometry and signal of one leg, as needed to compute its media correction.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SignalPath {
    pub frequency_mhz: f64,
    pub ground_position_km: Vector3<f64>,
    pub space_position_km: Vector3<f64>,
    pub ground_epoch: Epoch,
    pub space_epoch: Epoch,
    /// Elevation of the signal at the ground end, in radians
    pub elevation_rad: f64,
    pub range_km: f64,
    pub weather: Weather,
}

/// Range, elevation and time corrections of a signal path.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct MediaCorrectionValue {
    pub range_m: f64,
    pub elevation_rad: f64,
    pub delay_s: f64,
}

impl AddAssign for MediaCorrectionValue {
    fn add_assign(&mut self, rhs: Self) {
        self.range_m += rhs.range_m;
        self.elevation_rad += rhs.elevation_rad;
        self.delay_s += rhs.delay_s;
    }
}

/// A signal path media correction model (troposphere or ionosphere).
pub trait MediaCorrection: Send + Sync + fmt::Debug {
    fn kind(&self) -> MediaKind;

    fn correction(&self, path: &SignalPath, cosm: &dyn Cosm) -> MediaCorrectionValue;
}

/// Applies all of the configured media corrections to a signal leg, provided the signal is above the elevation mask of the ground end.
#[derive(Clone, Debug, Default)]
pub struct MediaCorrector {
    models: Vec<Arc<dyn MediaCorrection>>,
    troposphere_warned: bool,
    ionosphere_warned: bool,
}

impl MediaCorrector {
    pub fn add(&mut self, model: Arc<dyn MediaCorrection>) {
        self.models.push(model);
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Computes the total media correction between a ground participant and a space participant.
    /// Returns a zero correction if the ground participant has no local horizon or if the signal is below its elevation mask.
    #[allow(clippy::too_many_arguments)]
    pub fn correct(
        &mut self,
        frequency_mhz: f64,
        ground: &dyn SpacePoint,
        ground_position_km: Vector3<f64>,
        space_position_km: Vector3<f64>,
        ground_epoch: Epoch,
        space_epoch: Epoch,
        cosm: &dyn Cosm,
    ) -> MediaCorrectionValue {
        let mut total = MediaCorrectionValue::default();
        if self.models.is_empty() {
            return total;
        }

        let topo = match ground.topocentric_dcm(ground_epoch, cosm) {
            Some(dcm) => dcm,
            None => return total,
        };

        let range_vec = space_position_km - ground_position_km;
        let elevation_rad = (topo * unit_or_zero(&range_vec))[2].clamp(-1.0, 1.0).asin();
        if elevation_rad <= ground.elevation_mask_deg().to_radians() {
            return total;
        }

        let path = SignalPath {
            frequency_mhz,
            ground_position_km,
            space_position_km,
            ground_epoch,
            space_epoch,
            elevation_rad,
            range_km: range_vec.norm(),
            weather: ground.weather().unwrap_or_default(),
        };

        for model in &self.models {
            let corr = model.correction(&path, cosm);
            match model.kind() {
                MediaKind::Troposphere => {
                    if !(0.0..=TROPOSPHERE_MAX_M).contains(&corr.range_m) && !self.troposphere_warned {
                        warn!(
                            "troposphere correction of {:.3} m at {} is outside of [0, {TROPOSPHERE_MAX_M}] m",
                            corr.range_m, ground_epoch
                        );
                        self.troposphere_warned = true;
                    }
                }
                MediaKind::Ionosphere => {
                    if !(0.0..=IONOSPHERE_MAX_M).contains(&corr.range_m) && !self.ionosphere_warned {
                        warn!(
                            "ionosphere correction of {:.3} m at {} is outside of [0, {IONOSPHERE_MAX_M}] m",
                            corr.range_m, ground_epoch
                        );
                        self.ionosphere_warned = true;
                    }
                }
            }
            total += corr;
        }

        total
    }
}
