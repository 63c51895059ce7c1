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

use super::MeasurementType;
use crate::linalg::DMatrix;
use hifitime::Epoch;
use std::fmt;

/// Why a measurement is not feasible.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum UnfeasibleReason {
    /// Feasible, or not evaluated yet
    #[default]
    Normal,
    /// The signal is blocked on the uplink
    UplinkBlocked,
    /// The signal is blocked on the downlink
    DownlinkBlocked,
    /// The signal path is blocked or the light time did not converge
    Blocked,
    /// The ramp table does not cover the signal path
    RampTable,
}

impl fmt::Display for UnfeasibleReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let code = match self {
            Self::Normal => "N",
            Self::UplinkBlocked => "B1",
            Self::DownlinkBlocked => "B2",
            Self::Blocked => "B",
            Self::RampTable => "R",
        };
        write!(f, "{code}")
    }
}

/// The observable computed by a measurement model at one epoch.
///
/// The value is only meaningful when the measurement is feasible.
#[derive(Clone, Debug, PartialEq)]
pub struct MeasurementData {
    pub msr_type: MeasurementType,
    /// Unique identifier of the model which computed this measurement
    pub unique_id: u64,
    pub epoch: Epoch,
    /// One value per component (range, or azimuth and elevation)
    pub value: Vec<f64>,
    pub is_feasible: bool,
    /// Signed geometric feasibility, e.g. the elevation or the topocentric height of the target
    pub feasibility_value: f64,
    pub unfeasible_reason: UnfeasibleReason,
    pub participant_ids: Vec<String>,
    /// Number of light-time events used by this measurement, zero if infeasible
    pub event_count: usize,
    pub covariance: DMatrix<f64>,
    pub uplink_frequency_hz: f64,
    /// 1 for S band, 2 for X band, 0 if unknown
    pub uplink_band: u8,
    pub range_modulo: f64,
}

impl MeasurementData {
    pub fn new(msr_type: MeasurementType, unique_id: u64) -> Self {
        let n = msr_type.component_count();
        Self {
            msr_type,
            unique_id,
            epoch: Epoch::from_tai_seconds(0.0),
            value: vec![0.0; n],
            is_feasible: false,
            feasibility_value: 0.0,
            unfeasible_reason: UnfeasibleReason::Normal,
            participant_ids: Vec::new(),
            event_count: 0,
            covariance: DMatrix::identity(n, n),
            uplink_frequency_hz: 0.0,
            uplink_band: 0,
            range_modulo: 0.0,
        }
    }

    /// Marks this measurement as infeasible: zero value and no events.
    pub(crate) fn set_infeasible(&mut self, reason: UnfeasibleReason) {
        self.is_feasible = false;
        self.unfeasible_reason = reason;
        self.value.iter_mut().for_each(|v| *v = 0.0);
        self.event_count = 0;
    }

    pub(crate) fn set_feasible(&mut self, value: &[f64], event_count: usize) {
        self.is_feasible = true;
        self.unfeasible_reason = UnfeasibleReason::Normal;
        self.value.copy_from_slice(value);
        self.event_count = event_count;
    }
}

impl fmt::Display for MeasurementData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let values = self
            .value
            .iter()
            .map(|v| format!("{v:.9}"))
            .collect::<Vec<String>>()
            .join(", ");
        if self.is_feasible {
            write!(
                f,
                "{} @ {}: [{values}] {} ({})",
                self.msr_type,
                self.epoch,
                self.msr_type.unit(),
                self.participant_ids.join(", ")
            )
        } else {
            write!(
                f,
                "{} @ {}: infeasible ({})",
                self.msr_type, self.epoch, self.unfeasible_reason
            )
        }
    }
}
