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

use super::two_way::{legs_derivatives, SolvedLeg};
use super::{line_of_sight, topocentric, LegDelays};
use crate::cosmic::{Cosm, SpacePoint, SPEED_OF_LIGHT_KM_S};
use crate::linalg::{DMatrix, Matrix6};
use crate::od::event::LightTimeEvent;
use crate::od::hardware::Hardware;
use crate::od::msr::{MeasurementData, UnfeasibleReason};
use crate::od::params::SolveFor;
use crate::od::{DerivativeNotImplementedSnafu, MeasurementError};
use crate::time::Epoch;
use std::sync::Arc;

/// Electronics delays of a relayed two-way measurement, all in seconds.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct TdrssDelays {
    pub transmit_s: f64,
    /// Delay of the relay between the ground uplink and the forward link
    pub relay_uplink_s: f64,
    /// Delay of the relay between the return link and the ground downlink
    pub relay_downlink_s: f64,
    pub target_s: f64,
    pub receive_s: f64,
}

/// Two-way range through a relay satellite, in km: ground -> relay -> target -> relay -> ground.
///
/// The value is half of the sum of the four legs and of the distance light travels during the target transponder delay.
#[derive(Clone, Debug, Default)]
pub struct TdrssTwoWayRange {
    pub delays: TdrssDelays,
}

impl TdrssTwoWayRange {
    pub(crate) fn initialize(
        &mut self,
        participants: &[Arc<dyn SpacePoint>],
    ) -> Result<LegDelays, MeasurementError> {
        let ground = participants[0].hardware();
        let relay: Vec<_> = participants[1]
            .hardware()
            .iter()
            .filter_map(Hardware::as_transponder)
            .collect();

        self.delays = TdrssDelays {
            transmit_s: ground
                .iter()
                .find_map(Hardware::as_transmitter)
                .map_or(0.0, |tx| tx.delay_s),
            relay_uplink_s: relay.first().map_or(0.0, |xpdr| xpdr.delay_s),
            relay_downlink_s: relay.last().map_or(0.0, |xpdr| xpdr.delay_s),
            target_s: participants[2]
                .hardware()
                .iter()
                .find_map(Hardware::as_transponder)
                .map_or(0.0, |xpdr| xpdr.delay_s),
            receive_s: ground
                .iter()
                .find_map(Hardware::as_receiver)
                .map_or(0.0, |rx| rx.delay_s),
        };

        // Legs are solved backward in time: downlink, backlink, forwardlink, uplink.
        Ok(LegDelays {
            receive_s: self.delays.receive_s,
            turnaround_s: vec![
                self.delays.relay_downlink_s,
                self.delays.target_s,
                self.delays.relay_uplink_s,
            ],
        })
    }

    /// The relay must be above the horizon of the ground station and in line of sight of the target.
    /// The value is the ground to relay range.
    pub(crate) fn evaluate_geometry(
        &self,
        participants: &[Arc<dyn SpacePoint>],
        measurement: &mut MeasurementData,
        epoch: Epoch,
        cosm: &dyn Cosm,
    ) -> Result<bool, MeasurementError> {
        let ground = participants[0].state(epoch, cosm)?;
        let relay = participants[1].state(epoch, cosm)?;
        let target = participants[2].state(epoch, cosm)?;
        let radius_km = cosm.equatorial_radius_km();

        let range_vector_km = relay.position_km - ground.position_km;
        measurement.feasibility_value =
            match topocentric(participants[0].as_ref(), &range_vector_km, epoch, cosm) {
                Some((_, sez)) => sez[2],
                None if line_of_sight(&ground.position_km, &relay.position_km, radius_km) => 1.0,
                None => -1.0,
            };

        if measurement.feasibility_value > 0.0
            && line_of_sight(&relay.position_km, &target.position_km, radius_km)
        {
            measurement.set_feasible(&[range_vector_km.norm()], 4);
            Ok(true)
        } else {
            measurement.set_infeasible(UnfeasibleReason::Blocked);
            Ok(false)
        }
    }

    pub(crate) fn evaluate(
        &self,
        events: &[LightTimeEvent],
        measurement: &mut MeasurementData,
        cosm: &dyn Cosm,
    ) -> Result<bool, MeasurementError> {
        let legs = events
            .iter()
            .map(SolvedLeg::from_event)
            .collect::<Result<Vec<_>, _>>()?;
        let radius_km = cosm.equatorial_radius_km();

        // Backlink and forwardlink between the relay and the target.
        for leg in &legs[1..3] {
            if !line_of_sight(&leg.tx.position_km, &leg.rx.position_km, radius_km) {
                debug!(
                    "{} -> {} blocked at {}",
                    leg.tx.name, leg.rx.name, leg.rx.epoch
                );
                measurement.set_infeasible(UnfeasibleReason::Blocked);
                return Ok(false);
            }
        }

        let round_trip_km = legs.iter().map(|leg| leg.range_km).sum::<f64>()
            + self.delays.target_s * SPEED_OF_LIGHT_KM_S;

        measurement.set_feasible(&[round_trip_km / 2.0], 4);
        Ok(true)
    }
}

/// Partials w.r.t. the target only: half of the sum of the backlink and forwardlink partials.
pub(crate) fn range_derivatives(
    participant: &dyn SpacePoint,
    index: usize,
    events: &[LightTimeEvent],
    stm_inv: &Matrix6<f64>,
    param: &SolveFor,
) -> Result<DMatrix<f64>, MeasurementError> {
    if index != 2 {
        return DerivativeNotImplementedSnafu {
            participant: participant.name().to_string(),
            parameter: param.tag().to_string(),
        }
        .fail();
    }
    legs_derivatives(participant, &events[1..3], stm_inv, param, 0.5)
}
