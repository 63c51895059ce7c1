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

use crate::io::ConfigRepr;
use crate::linalg::{Matrix3, Matrix6, Vector3};
use crate::time::Epoch;
use serde_derive::{Deserialize, Serialize};
use std::fmt;
use typed_builder::TypedBuilder;

mod light_time;
mod locator;

pub use light_time::LightTimeEvent;
pub use locator::{locate_events, EventChain};

fn default_tolerance_km() -> f64 {
    1e-6
}

fn default_max_iterations() -> usize {
    10
}

/// Convergence settings of the light-time solver.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[builder(doc)]
pub struct LightTimeConfig {
    /// Convergence tolerance on the light distance between two iterations, in km
    #[builder(default = 1e-6)]
    #[serde(default = "default_tolerance_km")]
    pub tolerance_km: f64,
    /// Iteration cap, reaching it marks the event as diverged
    #[builder(default = 10)]
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// Whether to include the relativistic range correction in the light time
    #[builder(default)]
    #[serde(default)]
    pub relativity: bool,
}

impl Default for LightTimeConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ConfigRepr for LightTimeConfig {}

/// Outcome of the last solve of a light-time event.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum EventStatus {
    #[default]
    Unsolved,
    Converged,
    /// The iteration cap was reached, the geometry is deemed infeasible
    Diverged,
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Unsolved => write!(f, "unsolved"),
            Self::Converged => write!(f, "converged"),
            Self::Diverged => write!(f, "diverged"),
        }
    }
}

/// State of one participant at its solved epoch.
#[derive(Clone, Debug, PartialEq)]
pub struct ParticipantData {
    pub name: String,
    pub id: String,
    pub epoch: Epoch,
    /// Inertial position, in km
    pub position_km: Vector3<f64>,
    /// Inertial velocity, in km/s
    pub velocity_km_s: Vector3<f64>,
    /// State transition matrix from the reference epoch of the participant, if it has one
    pub stm: Option<Matrix6<f64>>,
    /// Rotation from the inertial frame into the frame of this participant at its epoch
    pub frame_dcm: Matrix3<f64>,
}

impl ParticipantData {
    /// State transition matrix at the solved epoch, or the identity for participants without one.
    pub fn stm_or_identity(&self) -> Matrix6<f64> {
        self.stm.unwrap_or_else(Matrix6::identity)
    }
}

/// Inverts the provided state transition matrix, or returns the identity if there is none or if it is singular.
pub fn inverse_stm(stm: Option<Matrix6<f64>>) -> Matrix6<f64> {
    match stm {
        Some(stm) => stm.try_inverse().unwrap_or_else(|| {
            warn!("singular state transition matrix, using identity instead");
            Matrix6::identity()
        }),
        None => Matrix6::identity(),
    }
}
