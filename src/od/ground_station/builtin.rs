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
use super::*;
use crate::od::hardware::{Receiver, Transmitter};

/// S band uplink and downlink chain of the Deep Space Network antennas.
fn dsn_s_band() -> [Hardware; 2] {
    [
        Hardware::Transmitter(Transmitter {
            name: "DSN S-band uplink".to_string(),
            delay_s: 0.0,
            frequency_mhz: 2_110.0,
        }),
        Hardware::Receiver(Receiver {
            name: "DSN S-band downlink".to_string(),
            delay_s: 0.0,
            center_frequency_mhz: 2_290.0,
            bandwidth_mhz: 20.0,
        }),
    ]
}

impl GroundStation {
    /// DSS-65 at the Madrid complex, with its S band transmitter and receiver.
    pub fn dss65_madrid(elevation_mask_deg: f64) -> Self {
        Self {
            id: "DSS-65".to_string(),
            elevation_mask_deg,
            hardware: dsn_s_band().to_vec(),
            ..Self::from_point("Madrid".to_string(), 40.427_222, 4.250_556, 0.834_939)
        }
    }

    /// DSS-34 at the Canberra complex, with its S band transmitter and receiver.
    pub fn dss34_canberra(elevation_mask_deg: f64) -> Self {
        Self {
            id: "DSS-34".to_string(),
            elevation_mask_deg,
            hardware: dsn_s_band().to_vec(),
            ..Self::from_point("Canberra".to_string(), -35.398_333, 148.981_944, 0.691_750)
        }
    }
}
