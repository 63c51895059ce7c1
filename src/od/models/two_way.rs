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

use super::derivatives::{assemble, range_partials};
use super::{line_of_sight, topocentric};
use crate::cosmic::{Cosm, SpacePoint, DEG_PER_RAD, SPEED_OF_LIGHT_KM_S};
use crate::linalg::{DMatrix, Matrix6, RowVector3, Vector3};
use crate::od::event::{LightTimeEvent, ParticipantData};
use crate::od::hardware::TwoWayHardware;
use crate::od::media::MediaCorrector;
use crate::od::msr::{MeasurementData, UnfeasibleReason};
use crate::od::params::SolveFor;
use crate::od::{
    DerivativeNotImplementedSnafu, EventSetupSnafu, HardwareInfeasibleSnafu, MeasurementError,
};
use crate::time::Epoch;
use snafu::{ensure, OptionExt};
use std::sync::Arc;

/// A solved signal leg.
#[derive(Clone, Debug)]
pub(crate) struct SolvedLeg {
    pub tx: ParticipantData,
    pub rx: ParticipantData,
    pub range_km: f64,
    pub range_rate_km_s: f64,
    pub relativity_km: f64,
}

impl SolvedLeg {
    pub fn from_event(event: &LightTimeEvent) -> Result<Self, MeasurementError> {
        let data = |index: usize| {
            event
                .participant_data(index)
                .cloned()
                .context(EventSetupSnafu {
                    event: event.name().to_string(),
                    reason: format!("participant #{index} was not solved"),
                })
        };
        Ok(Self {
            tx: data(0)?,
            rx: data(1)?,
            range_km: event.range_km(),
            range_rate_km_s: event.range_rate_km_s(),
            relativity_km: event.relativity_correction_km(),
        })
    }
}

/// Frequency received at the end of a leg, shifted by the range rate along that leg.
pub(crate) fn doppler_shifted_mhz(frequency_mhz: f64, range_rate_km_s: f64) -> f64 {
    (1.0 - range_rate_km_s / SPEED_OF_LIGHT_KM_S) * frequency_mhz
}

/// Instantaneous feasibility of a two participant measurement: the target must be above the local horizon of the observer,
/// or in line of sight if the observer has no horizon.
///
/// The value is the geometric range multiplied by `scale`.
pub(crate) fn evaluate_geometry(
    participants: &[Arc<dyn SpacePoint>],
    scale: f64,
    measurement: &mut MeasurementData,
    epoch: Epoch,
    cosm: &dyn Cosm,
) -> Result<bool, MeasurementError> {
    let observer = participants[0].state(epoch, cosm)?;
    let target = participants[1].state(epoch, cosm)?;
    let range_vector_km = target.position_km - observer.position_km;

    measurement.feasibility_value =
        match topocentric(participants[0].as_ref(), &range_vector_km, epoch, cosm) {
            Some((_, sez)) => sez[2],
            None if line_of_sight(
                &observer.position_km,
                &target.position_km,
                cosm.equatorial_radius_km(),
            ) =>
            {
                1.0
            }
            None => -1.0,
        };

    if measurement.feasibility_value > 0.0 {
        measurement.set_feasible(&[scale * range_vector_km.norm()], 2);
        Ok(true)
    } else {
        measurement.set_infeasible(UnfeasibleReason::Blocked);
        Ok(false)
    }
}

/// Elevation in degrees of a space position seen from a ground position, `None` if the ground participant has no horizon.
fn elevation_deg(
    ground: &dyn SpacePoint,
    ground_km: &Vector3<f64>,
    space_km: &Vector3<f64>,
    epoch: Epoch,
    cosm: &dyn Cosm,
) -> Option<f64> {
    let range_vector_km = space_km - ground_km;
    topocentric(ground, &range_vector_km, epoch, cosm).map(|(_, sez)| {
        let norm = sez.norm();
        if norm > 0.0 {
            (sez[2] / norm).clamp(-1.0, 1.0).asin() * DEG_PER_RAD
        } else {
            90.0
        }
    })
}

/// Checks that both legs of a solved two-way measurement clear the elevation mask of the ground participant,
/// at the uplink transmission and the downlink reception epochs respectively.
pub(crate) fn check_elevations(
    ground: &dyn SpacePoint,
    downlink: &SolvedLeg,
    uplink: &SolvedLeg,
    measurement: &mut MeasurementData,
    cosm: &dyn Cosm,
) -> bool {
    let mask = ground.elevation_mask_deg();
    let radius_km = cosm.equatorial_radius_km();

    for (leg, reason, ground_data, space_data) in [
        (uplink, UnfeasibleReason::UplinkBlocked, &uplink.tx, &uplink.rx),
        (downlink, UnfeasibleReason::DownlinkBlocked, &downlink.rx, &downlink.tx),
    ] {
        let visible = match elevation_deg(
            ground,
            &ground_data.position_km,
            &space_data.position_km,
            ground_data.epoch,
            cosm,
        ) {
            Some(elevation) => {
                measurement.feasibility_value = elevation;
                elevation > mask
            }
            None => {
                let los = line_of_sight(&leg.tx.position_km, &leg.rx.position_km, radius_km);
                measurement.feasibility_value = if los { 1.0 } else { -1.0 };
                los
            }
        };
        if !visible {
            debug!(
                "{} blocked at {} ({:.3})",
                ground.name(),
                ground_data.epoch,
                measurement.feasibility_value
            );
            measurement.set_infeasible(reason);
            return false;
        }
    }
    true
}

/// Uplink and downlink ranges corrected for the media, the relativistic delay and, with hardware, the frequencies
/// the transponder and the receiver must accept.
pub(crate) struct CorrectedLegs {
    pub uplink_km: f64,
    pub downlink_km: f64,
}

pub(crate) fn correct_legs(
    hardware: Option<&TwoWayHardware>,
    uplink_frequency_mhz: f64,
    participants: &[Arc<dyn SpacePoint>],
    downlink: &SolvedLeg,
    uplink: &SolvedLeg,
    media: &mut MediaCorrector,
    cosm: &dyn Cosm,
) -> Result<CorrectedLegs, MeasurementError> {
    let ground = participants[0].as_ref();

    let uplink_media = media.correct(
        uplink_frequency_mhz,
        ground,
        uplink.tx.position_km,
        uplink.rx.position_km,
        uplink.tx.epoch,
        uplink.rx.epoch,
        cosm,
    );
    let uplink_km = uplink.range_km + uplink_media.range_m * 1e-3 + uplink.relativity_km;

    let received_mhz = doppler_shifted_mhz(uplink_frequency_mhz, uplink.range_rate_km_s);
    let downlink_frequency_mhz = match hardware {
        Some(hw) => {
            ensure!(
                hw.transponder.is_feasible(received_mhz),
                HardwareInfeasibleSnafu {
                    device: "transponder",
                    participant: participants[1].name().to_string(),
                    frequency_mhz: received_mhz,
                }
            );
            hw.transponder.output_frequency_mhz(received_mhz)?
        }
        None => received_mhz,
    };

    let downlink_media = media.correct(
        downlink_frequency_mhz,
        ground,
        downlink.rx.position_km,
        downlink.tx.position_km,
        downlink.rx.epoch,
        downlink.tx.epoch,
        cosm,
    );
    if let Some(hw) = hardware {
        let received_mhz = doppler_shifted_mhz(downlink_frequency_mhz, downlink.range_rate_km_s);
        ensure!(
            hw.receiver.is_feasible(received_mhz),
            HardwareInfeasibleSnafu {
                device: "receiver",
                participant: ground.name().to_string(),
                frequency_mhz: received_mhz,
            }
        );
    }
    let downlink_km = downlink.range_km + downlink_media.range_m * 1e-3 + downlink.relativity_km;

    trace!(
        "uplink {:.6} km (media {:.3} m) downlink {:.6} km (media {:.3} m)",
        uplink_km,
        uplink_media.range_m,
        downlink_km,
        downlink_media.range_m
    );

    Ok(CorrectedLegs {
        uplink_km,
        downlink_km,
    })
}

/// Partials of a two-way range w.r.t. the spacecraft, as `scale` times the sum of the partials of both legs.
pub(crate) fn range_derivatives(
    participant: &dyn SpacePoint,
    index: usize,
    events: &[LightTimeEvent],
    stm_inv: &Matrix6<f64>,
    param: &SolveFor,
    scale: f64,
) -> Result<DMatrix<f64>, MeasurementError> {
    if index != 1 {
        return DerivativeNotImplementedSnafu {
            participant: participant.name().to_string(),
            parameter: param.tag().to_string(),
        }
        .fail();
    }
    legs_derivatives(participant, events, stm_inv, param, scale)
}

/// Sums the range partials of every leg in which the participant appears, scaled.
pub(crate) fn legs_derivatives<'a>(
    participant: &dyn SpacePoint,
    events: impl IntoIterator<Item = &'a LightTimeEvent>,
    stm_inv: &Matrix6<f64>,
    param: &SolveFor,
    scale: f64,
) -> Result<DMatrix<f64>, MeasurementError> {
    let mut position = RowVector3::zeros();
    let mut velocity = RowVector3::zeros();
    for event in events {
        if let Some(leg_index) = event.index_of(participant.id()) {
            let (dpos, dvel) = range_partials(event, leg_index, stm_inv)?;
            position += dpos;
            velocity += dvel;
        }
    }
    Ok(assemble(param, &[scale * position], &[scale * velocity]))
}
