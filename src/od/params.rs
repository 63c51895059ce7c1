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

use crate::cosmic::SpacePoint;
use core::fmt;
use serde_derive::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

use super::{InvalidSettingSnafu, MeasurementError};

/// Solve-for parameters whose partials may be requested from a measurement model.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SolveFor {
    /// Inertial position (km), three elements
    Position,
    /// Inertial velocity (km/s), three elements
    Velocity,
    /// Position then velocity, six elements, tagged `CartesianX`
    CartesianState,
    /// Measurement bias, one element per measurement component
    Bias,
    /// Any other estimated quantity, which measurements are insensitive to
    Other { name: String, size: usize },
}

impl SolveFor {
    /// Number of columns of the partial derivative matrix w.r.t. this parameter
    pub fn cardinality(&self) -> usize {
        match self {
            Self::Position | Self::Velocity => 3,
            Self::CartesianState => 6,
            Self::Bias => 1,
            Self::Other { size, .. } => *size,
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            Self::Position => "Position",
            Self::Velocity => "Velocity",
            Self::CartesianState => "CartesianX",
            Self::Bias => "Bias",
            Self::Other { name, .. } => name,
        }
    }
}

impl FromStr for SolveFor {
    type Err = MeasurementError;

    /// Parses one of the known tags, unknown ones must be built as [SolveFor::Other] with their size.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Position" => Ok(Self::Position),
            "Velocity" => Ok(Self::Velocity),
            "CartesianX" | "CartesianState" => Ok(Self::CartesianState),
            "Bias" => Ok(Self::Bias),
            _ => InvalidSettingSnafu {
                msg: format!("unknown solve-for parameter `{s}`"),
            }
            .fail(),
        }
    }
}

impl fmt::Display for SolveFor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// The object owning the solve-for parameter of a derivative request.
#[derive(Clone, Debug)]
pub enum WrtObject {
    /// A participant (ground station, relay or spacecraft)
    Participant(Arc<dyn SpacePoint>),
    /// A measurement model, identified by its unique id
    Model(u64),
}

impl fmt::Display for WrtObject {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Participant(p) => write!(f, "{}", p.name()),
            Self::Model(id) => write!(f, "measurement model #{id}"),
        }
    }
}
