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

use super::derivatives::{assemble, range_vector_partials};
use super::two_way::SolvedLeg;
use super::{topocentric, LegDelays};
use crate::cosmic::{Cosm, SpacePoint, DEG_PER_RAD};
use crate::linalg::{DMatrix, Matrix3, Matrix6, RowVector3, Vector3};
use crate::od::event::LightTimeEvent;
use crate::od::hardware::Hardware;
use crate::od::msr::{MeasurementData, UnfeasibleReason};
use crate::od::params::SolveFor;
use crate::od::{DerivativeNotImplementedSnafu, InvalidSettingSnafu, MeasurementError};
use crate::time::Epoch;
use crate::utils::between_pm_180;
use snafu::OptionExt;
use std::sync::Arc;

/// Optical azimuth and elevation of a spacecraft seen from a ground observer, in degrees.
///
/// The azimuth is measured from North towards East and wrapped in (-180, 180].
#[derive(Clone, Debug, Default)]
pub struct OpticalAzEl {
    pub receive_delay_s: f64,
    /// Rotation from inertial to the topocentric frame of the observer at the receive epoch
    sez_dcm: Matrix3<f64>,
    /// Observer to spacecraft vector in the topocentric frame, from the last evaluation
    observation_km: Vector3<f64>,
}

/// Azimuth and elevation in degrees of a topocentric South-East-Zenith vector.
pub fn azimuth_elevation_deg(sez_km: &Vector3<f64>) -> (f64, f64) {
    let norm = sez_km.norm();
    let azimuth = between_pm_180(sez_km[1].atan2(-sez_km[0]) * DEG_PER_RAD);
    let elevation = if norm > 0.0 {
        (sez_km[2] / norm).clamp(-1.0, 1.0).asin() * DEG_PER_RAD
    } else {
        90.0
    };
    (azimuth, elevation)
}

impl OpticalAzEl {
    pub(crate) fn initialize(
        &mut self,
        participants: &[Arc<dyn SpacePoint>],
    ) -> Result<LegDelays, MeasurementError> {
        self.receive_delay_s = participants[0]
            .hardware()
            .iter()
            .find_map(Hardware::as_receiver)
            .map_or(0.0, |rx| rx.delay_s);
        Ok(LegDelays {
            receive_s: self.receive_delay_s,
            turnaround_s: Vec::new(),
        })
    }

    fn observe(
        &mut self,
        observer: &dyn SpacePoint,
        range_vector_km: &Vector3<f64>,
        measurement: &mut MeasurementData,
        epoch: Epoch,
        cosm: &dyn Cosm,
    ) -> Result<bool, MeasurementError> {
        let (dcm, sez) =
            topocentric(observer, range_vector_km, epoch, cosm).context(InvalidSettingSnafu {
                msg: format!("optical observer {} has no local horizon", observer.name()),
            })?;
        self.sez_dcm = dcm;
        self.observation_km = sez;
        measurement.feasibility_value = sez[2];

        if sez[2] > 0.0 {
            let (azimuth, elevation) = azimuth_elevation_deg(&sez);
            measurement.set_feasible(&[azimuth, elevation], 1);
            Ok(true)
        } else {
            measurement.set_infeasible(UnfeasibleReason::Blocked);
            Ok(false)
        }
    }

    pub(crate) fn evaluate_geometry(
        &mut self,
        participants: &[Arc<dyn SpacePoint>],
        measurement: &mut MeasurementData,
        epoch: Epoch,
        cosm: &dyn Cosm,
    ) -> Result<bool, MeasurementError> {
        let observer = participants[0].state(epoch, cosm)?;
        let target = participants[1].state(epoch, cosm)?;
        let range_vector_km = target.position_km - observer.position_km;
        self.observe(participants[0].as_ref(), &range_vector_km, measurement, epoch, cosm)
    }

    /// Same angles from the light-time corrected positions, rotated into the topocentric frame of the observer when it
    /// receives the light, i.e. the measurement epoch minus the receive delay.
    pub(crate) fn evaluate(
        &mut self,
        participants: &[Arc<dyn SpacePoint>],
        events: &[LightTimeEvent],
        measurement: &mut MeasurementData,
        cosm: &dyn Cosm,
    ) -> Result<bool, MeasurementError> {
        let light_path = SolvedLeg::from_event(&events[0])?;
        let range_vector_km = light_path.tx.position_km - light_path.rx.position_km;
        self.observe(
            participants[0].as_ref(),
            &range_vector_km,
            measurement,
            light_path.rx.epoch,
            cosm,
        )
    }

    /// Partials of the azimuth and of the elevation w.r.t. the spacecraft state.
    ///
    /// Position partials are in degrees per km, velocity partials are left in radians per km/s.
    pub(crate) fn derivatives(
        &self,
        participant: &dyn SpacePoint,
        index: usize,
        events: &[LightTimeEvent],
        stm_inv: &Matrix6<f64>,
        param: &SolveFor,
    ) -> Result<DMatrix<f64>, MeasurementError> {
        if index != 1 {
            return DerivativeNotImplementedSnafu {
                participant: participant.name().to_string(),
                parameter: param.tag().to_string(),
            }
            .fail();
        }

        let range_km = self.observation_km.norm();
        let unit = self.observation_km / range_km;
        let x_t = unit[0];
        let azimuth_rad = unit[1].atan2(-unit[0]);
        let elevation_rad = unit[2].clamp(-1.0, 1.0).asin();

        let az_part = unit * Vector3::x().transpose() / x_t - Matrix3::identity();
        let el_part = Matrix3::identity() - unit * unit.transpose();
        let az_pref = azimuth_rad.cos().powi(2) / (range_km * x_t);
        let el_pref = 1.0 / (elevation_rad.cos() * range_km);

        // The light path goes from the spacecraft to the observer, the observation vector is its opposite.
        let partials = range_vector_partials(&events[0], 0, stm_inv)?;
        let d_rho_pos = -self.sez_dcm * partials.position;
        let d_rho_vel = -self.sez_dcm * partials.velocity;

        let angles = |d_rho: Matrix3<f64>, scale: f64| -> [RowVector3<f64>; 2] {
            [
                scale * az_pref * (az_part * d_rho).row(1),
                scale * el_pref * (el_part * d_rho).row(2),
            ]
        };

        Ok(assemble(
            param,
            &angles(d_rho_pos, DEG_PER_RAD),
            &angles(d_rho_vel, 1.0),
        ))
    }
}
