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

use super::two_way::{check_elevations, correct_legs, SolvedLeg};
use super::LegDelays;
use crate::cosmic::{Cosm, SpacePoint, SPEED_OF_LIGHT_KM_S};
use crate::od::event::LightTimeEvent;
use crate::od::hardware::TwoWayHardware;
use crate::od::media::MediaCorrector;
use crate::od::msr::MeasurementData;
use crate::od::MeasurementError;
use std::sync::Arc;

/// Universal Space Network two-way range, in km.
///
/// Without any hardware on either participant, the range is the mean of the geometric uplink and downlink ranges.
/// With hardware, the transponder delay, the media and the relativistic corrections are included, and the transponder
/// and the receiver must accept the Doppler shifted frequencies.
#[derive(Clone, Debug, Default)]
pub struct UsnTwoWayRange {
    pub hardware: Option<TwoWayHardware>,
}

impl UsnTwoWayRange {
    pub(crate) fn initialize(
        &mut self,
        participants: &[Arc<dyn SpacePoint>],
    ) -> Result<LegDelays, MeasurementError> {
        self.hardware = TwoWayHardware::locate(participants[0].as_ref(), participants[1].as_ref())?;
        Ok(two_way_delays(self.hardware.as_ref()))
    }

    pub(crate) fn evaluate(
        &self,
        participants: &[Arc<dyn SpacePoint>],
        events: &[LightTimeEvent],
        media: &mut MediaCorrector,
        measurement: &mut MeasurementData,
        cosm: &dyn Cosm,
    ) -> Result<bool, MeasurementError> {
        let downlink = SolvedLeg::from_event(&events[0])?;
        let uplink = SolvedLeg::from_event(&events[1])?;

        if !check_elevations(participants[0].as_ref(), &downlink, &uplink, measurement, cosm) {
            return Ok(false);
        }

        let range_km = match &self.hardware {
            None => (uplink.range_km + downlink.range_km) / 2.0,
            Some(hw) => {
                let frequency_mhz = hw.transmitter.frequency_mhz;
                let legs = correct_legs(
                    Some(hw),
                    frequency_mhz,
                    participants,
                    &downlink,
                    &uplink,
                    media,
                    cosm,
                )?;
                measurement.uplink_frequency_hz = frequency_mhz * 1e6;
                (legs.uplink_km
                    + legs.downlink_km
                    + hw.transponder.delay_s * SPEED_OF_LIGHT_KM_S)
                    / 2.0
            }
        };

        measurement.set_feasible(&[range_km], 2);
        Ok(true)
    }
}

/// Receive delay of the ground end, and transponder delay between the downlink and the uplink.
pub(crate) fn two_way_delays(hardware: Option<&TwoWayHardware>) -> LegDelays {
    let delays = hardware.map(TwoWayHardware::delays).unwrap_or_default();
    LegDelays {
        receive_s: delays.receive_s,
        turnaround_s: vec![delays.transponder_s],
    }
}
