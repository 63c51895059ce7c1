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

use crate::linalg::{DMatrix, Matrix3, Matrix6, RowVector3};
use crate::od::event::LightTimeEvent;
use crate::od::params::SolveFor;
use crate::od::{EventSetupSnafu, MeasurementError};
use crate::utils::unit_or_zero;
use snafu::OptionExt;

/// Partials of the range vector (receiver minus transmitter) of a solved event w.r.t. the position and velocity of one of its participants.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct RangeVectorPartials {
    pub position: Matrix3<f64>,
    pub velocity: Matrix3<f64>,
}

/// Maps the state transition matrix of the participant at its solved epoch back to the epoch of the measurement,
/// then rotates the result from the participant frame into the inertial frame.
///
/// The transmitter (index 0 of the event) picks up a minus sign.
pub(crate) fn range_vector_partials(
    event: &LightTimeEvent,
    index: usize,
    stm_inv: &Matrix6<f64>,
) -> Result<RangeVectorPartials, MeasurementError> {
    let data = event.participant_data(index).context(EventSetupSnafu {
        event: event.name().to_string(),
        reason: format!("no solved data for participant #{index}"),
    })?;

    let sign = if index == 0 { -1.0 } else { 1.0 };
    let phi = data.stm_or_identity() * stm_inv;
    let to_inertial = data.frame_dcm.transpose();

    Ok(RangeVectorPartials {
        position: sign * (to_inertial * phi.fixed_view::<3, 3>(0, 0)),
        velocity: sign * (to_inertial * phi.fixed_view::<3, 3>(0, 3)),
    })
}

/// Partials of the range of a solved event w.r.t. the position and velocity of one of its participants.
pub(crate) fn range_partials(
    event: &LightTimeEvent,
    index: usize,
    stm_inv: &Matrix6<f64>,
) -> Result<(RowVector3<f64>, RowVector3<f64>), MeasurementError> {
    let unit_range = unit_or_zero(&event.range_vector_km()).transpose();
    let partials = range_vector_partials(event, index, stm_inv)?;
    Ok((unit_range * partials.position, unit_range * partials.velocity))
}

/// Assembles the derivative matrix from per-component position and velocity partials, per the requested parameter.
pub(crate) fn assemble(
    param: &SolveFor,
    position_rows: &[RowVector3<f64>],
    velocity_rows: &[RowVector3<f64>],
) -> DMatrix<f64> {
    let rows = position_rows.len();
    let mut deriv = DMatrix::zeros(rows, param.cardinality());
    for (row, (pos, vel)) in position_rows.iter().zip(velocity_rows).enumerate() {
        match param {
            SolveFor::Position => deriv.fixed_view_mut::<1, 3>(row, 0).copy_from(pos),
            SolveFor::Velocity => deriv.fixed_view_mut::<1, 3>(row, 0).copy_from(vel),
            SolveFor::CartesianState => {
                deriv.fixed_view_mut::<1, 3>(row, 0).copy_from(pos);
                deriv.fixed_view_mut::<1, 3>(row, 3).copy_from(vel);
            }
            _ => {}
        }
    }
    deriv
}

/// A derivative matrix filled with ones, as for a measurement bias.
pub(crate) fn ones(rows: usize, param: &SolveFor) -> DMatrix<f64> {
    DMatrix::from_element(rows, param.cardinality(), 1.0)
}
