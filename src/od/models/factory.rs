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

use super::MeasurementModel;
use crate::od::msr::MeasurementType;
use std::str::FromStr;

/// Builds an uninitialized measurement model from its type name, e.g. `USNTwoWayRange`.
///
/// Returns `None` for an unknown type name.
pub fn create_measurement(type_name: &str, name: &str) -> Option<MeasurementModel> {
    match MeasurementType::from_str(type_name) {
        Ok(msr_type) => Some(MeasurementModel::new(name, msr_type)),
        Err(e) => {
            debug!("{e}");
            None
        }
    }
}

/// Type names of all the measurement models this factory builds.
pub fn supported_measurements() -> Vec<&'static str> {
    enum_iterator::all::<MeasurementType>()
        .map(MeasurementType::type_name)
        .collect()
}
