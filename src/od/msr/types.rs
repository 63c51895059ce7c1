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

use enum_iterator::Sequence;
use serde_derive::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::od::{InvalidSettingSnafu, MeasurementError};

/// All of the measurement types which the factory can build.
#[derive(Copy, Clone, Debug, Hash, Serialize, Deserialize, PartialEq, Eq, Sequence)]
pub enum MeasurementType {
    #[serde(rename = "USNTwoWayRange")]
    UsnTwoWayRange,
    #[serde(rename = "DSNTwoWayRange")]
    DsnTwoWayRange,
    #[serde(rename = "TDRSSTwoWayRange")]
    TdrssTwoWayRange,
    #[serde(rename = "SNTwoWayRange")]
    SnTwoWayRange,
    #[serde(rename = "OpticalAzEl")]
    OpticalAzEl,
}

impl MeasurementType {
    /// Name of this type, as accepted by the factory
    pub fn type_name(self) -> &'static str {
        match self {
            Self::UsnTwoWayRange => "USNTwoWayRange",
            Self::DsnTwoWayRange => "DSNTwoWayRange",
            Self::TdrssTwoWayRange => "TDRSSTwoWayRange",
            Self::SnTwoWayRange => "SNTwoWayRange",
            Self::OpticalAzEl => "OpticalAzEl",
        }
    }

    /// Number of components of a measurement of this type
    pub fn component_count(self) -> usize {
        match self {
            Self::OpticalAzEl => 2,
            _ => 1,
        }
    }

    /// Returns the expected unit of this measurement type
    pub fn unit(self) -> &'static str {
        match self {
            Self::DsnTwoWayRange => "RU",
            Self::OpticalAzEl => "deg",
            _ => "km",
        }
    }

    /// Number of light-time events of this type
    pub fn event_count(self) -> usize {
        match self {
            Self::OpticalAzEl => 1,
            Self::TdrssTwoWayRange => 4,
            _ => 2,
        }
    }

    /// Number of participants of this type
    pub fn participant_count(self) -> usize {
        match self {
            Self::TdrssTwoWayRange => 3,
            _ => 2,
        }
    }
}

impl FromStr for MeasurementType {
    type Err = MeasurementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        enum_iterator::all::<Self>()
            .find(|msr_type| msr_type.type_name() == s)
            .ok_or_else(|| {
                InvalidSettingSnafu {
                    msg: format!("unknown measurement type `{s}`"),
                }
                .build()
            })
    }
}

impl fmt::Display for MeasurementType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}
