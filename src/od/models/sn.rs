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

use super::LegDelays;
use crate::od::msr::{MeasurementData, UnfeasibleReason};
use crate::od::MeasurementError;

// Space Network two-way range: the topology is declared so that the model can be configured, but it is never feasible.

pub(crate) fn initialize() -> LegDelays {
    LegDelays {
        receive_s: 0.0,
        turnaround_s: vec![0.0],
    }
}

pub(crate) fn evaluate(name: &str, measurement: &mut MeasurementData) -> bool {
    warn!("[{name}] SN two-way range is not implemented, the measurement is infeasible");
    measurement.feasibility_value = 0.0;
    measurement.set_infeasible(UnfeasibleReason::Blocked);
    false
}

pub(crate) fn not_implemented(name: &str) -> MeasurementError {
    MeasurementError::NotImplemented {
        model: name.to_string(),
        action: "state derivatives",
    }
}
