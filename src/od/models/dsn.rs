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
use super::usn::two_way_delays;
use super::LegDelays;
use crate::cosmic::{Cosm, SpacePoint, SPEED_OF_LIGHT_KM_S};
use crate::io::{epoch_from_str, epoch_to_str, ConfigRepr};
use crate::od::event::LightTimeEvent;
use crate::od::hardware::TwoWayHardware;
use crate::od::media::MediaCorrector;
use crate::od::msr::{MeasurementData, UnfeasibleReason};
use crate::od::{
    InvalidSettingSnafu, MeasurementError, RampTableSnafu, UnknownFrequencyBandSnafu,
};
use crate::time::{Epoch, Unit};
use serde_derive::{Deserialize, Serialize};
use snafu::ensure;
use std::sync::Arc;

/// Default range modulo, large enough to never wrap.
pub const DEFAULT_RANGE_MODULO: f64 = 1.0e18;

/// Converts an uplink frequency into the rate of range units per second, returning that factor and the frequency band.
///
/// If the band is not provided, it is deduced from the frequency: S band (1) between 2 and 4 GHz, X band (2) between 7 and 8.4 GHz.
pub fn frequency_factor(frequency_hz: f64, band: Option<u8>) -> Result<(f64, u8), MeasurementError> {
    let band = match band {
        Some(band) => band,
        None if (2.0e9..=4.0e9).contains(&frequency_hz) => 1,
        None if (7.0e9..=8.4e9).contains(&frequency_hz) => 2,
        None => return UnknownFrequencyBandSnafu { frequency_hz }.fail(),
    };
    match band {
        1 => Ok((frequency_hz / 2.0, band)),
        2 => Ok((frequency_hz * 221.0 / 1498.0, band)),
        _ => UnknownFrequencyBandSnafu { frequency_hz }.fail(),
    }
}

/// One record of an uplink frequency ramp table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RampRecord {
    #[serde(serialize_with = "epoch_to_str", deserialize_with = "epoch_from_str")]
    pub epoch: Epoch,
    /// 1 for S band, 2 for X band
    pub uplink_band: u8,
    #[serde(default)]
    pub ramp_type: u8,
    pub ramp_frequency_hz: f64,
    /// Linear frequency rate from this record to the next one
    #[serde(default)]
    pub ramp_rate_hz_s: f64,
}

/// Piecewise linear uplink frequency profile.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RampTable {
    pub records: Vec<RampRecord>,
}

impl ConfigRepr for RampTable {}

impl RampTable {
    /// Builds a ramp table, sorting its records by epoch.
    pub fn new(mut records: Vec<RampRecord>) -> Self {
        records.sort_by_key(|r| r.epoch);
        Self { records }
    }

    pub(crate) fn validate(&self) -> Result<(), MeasurementError> {
        ensure!(
            !self.records.is_empty(),
            RampTableSnafu {
                reason: "the table is empty".to_string()
            }
        );
        ensure!(
            self.records.len() >= 2,
            RampTableSnafu {
                reason: format!("at least two records are needed, {} given", self.records.len())
            }
        );
        ensure!(
            self.records.windows(2).all(|w| w[0].epoch <= w[1].epoch),
            RampTableSnafu {
                reason: "records are not sorted by epoch".to_string()
            }
        );
        for record in &self.records {
            frequency_factor(record.ramp_frequency_hz, Some(record.uplink_band))?;
        }
        Ok(())
    }

    fn covers(&self, epoch: Epoch) -> Option<usize> {
        let first = self.records.first()?;
        let last = self.records.last()?;
        if epoch < first.epoch || epoch > last.epoch {
            return None;
        }
        self.records.iter().rposition(|r| epoch >= r.epoch)
    }

    /// Ramped frequency and band at the provided epoch, `None` outside of the table.
    pub fn frequency_at(&self, epoch: Epoch) -> Option<(f64, u8)> {
        let record = &self.records[self.covers(epoch)?];
        Some((
            record.ramp_frequency_hz
                + record.ramp_rate_hz_s * (epoch - record.epoch).to_unit(Unit::Second),
            record.uplink_band,
        ))
    }

    /// Integral of the frequency factor over the `elapsed_s` seconds before `end`, in range units.
    ///
    /// Returns `None` if that interval is not fully covered by the table.
    pub fn integral(&self, end: Epoch, elapsed_s: f64) -> Result<Option<f64>, MeasurementError> {
        ensure!(
            elapsed_s >= 0.0,
            RampTableSnafu {
                reason: format!("the elapsed time must be positive, got {elapsed_s} s")
            }
        );
        self.validate()?;

        let start = end - elapsed_s * Unit::Second;
        let end_index = match (self.covers(start), self.covers(end)) {
            (Some(_), Some(index)) => index,
            _ => return Ok(None),
        };

        let factor = |frequency_hz: f64, band: u8| -> Result<f64, MeasurementError> {
            Ok(frequency_factor(frequency_hz, Some(band))?.0)
        };
        let end_record = &self.records[end_index];
        let base = factor(end_record.ramp_frequency_hz, end_record.uplink_band)?;

        let mut value = 0.0;
        let mut remaining_s = elapsed_s;
        let mut index = end_index;
        while remaining_s > 0.0 {
            let record = &self.records[index];
            let mut interval_s = if index == end_index {
                (end - record.epoch).to_unit(Unit::Second)
            } else {
                (self.records[index + 1].epoch - record.epoch).to_unit(Unit::Second)
            };

            let mut f0 = record.ramp_frequency_hz;
            if remaining_s < interval_s {
                f0 += record.ramp_rate_hz_s * (interval_s - remaining_s);
                interval_s = remaining_s;
            }
            let f1 = f0 + record.ramp_rate_hz_s * interval_s;

            value += ((factor(f0, record.uplink_band)? + factor(f1, record.uplink_band)?) / 2.0
                - base)
                * interval_s;
            remaining_s -= interval_s;

            if remaining_s > 0.0 {
                if index == 0 {
                    return Ok(None);
                }
                index -= 1;
            }
        }

        Ok(Some(value + base * elapsed_s))
    }
}

/// Deep Space Network two-way range, in range units.
///
/// The round trip light time, including the hardware delays, is converted into range units with the frequency factor of
/// the uplink frequency, or integrated over the ramped uplink frequency if a ramp table is provided.
#[derive(Clone, Debug)]
pub struct DsnTwoWayRange {
    pub hardware: Option<TwoWayHardware>,
    pub ramp_table: Option<RampTable>,
    pub range_modulo: f64,
    frequency_factor: f64,
}

impl Default for DsnTwoWayRange {
    fn default() -> Self {
        Self {
            hardware: None,
            ramp_table: None,
            range_modulo: DEFAULT_RANGE_MODULO,
            frequency_factor: 0.0,
        }
    }
}

impl DsnTwoWayRange {
    pub(crate) fn initialize(
        &mut self,
        participants: &[Arc<dyn SpacePoint>],
    ) -> Result<LegDelays, MeasurementError> {
        self.hardware = TwoWayHardware::locate(participants[0].as_ref(), participants[1].as_ref())?;
        ensure!(
            self.hardware.is_some() || self.ramp_table.is_some(),
            InvalidSettingSnafu {
                msg: format!(
                    "{} needs a transmitter or a ramp table to define its uplink frequency",
                    participants[0].name()
                )
            }
        );
        match (&self.ramp_table, &self.hardware) {
            (Some(table), _) => table.validate()?,
            (None, Some(hw)) => {
                frequency_factor(hw.transmitter.frequency_mhz * 1e6, None)?;
            }
            (None, None) => {}
        }
        ensure!(
            self.range_modulo > 0.0,
            InvalidSettingSnafu {
                msg: format!("range modulo must be strictly positive, got {}", self.range_modulo)
            }
        );
        Ok(two_way_delays(self.hardware.as_ref()))
    }

    /// Derivative of the range units w.r.t. a range in km, for the last evaluation
    pub(crate) fn range_unit_per_km(&self) -> f64 {
        self.frequency_factor / SPEED_OF_LIGHT_KM_S
    }

    pub(crate) fn evaluate(
        &mut self,
        participants: &[Arc<dyn SpacePoint>],
        events: &[LightTimeEvent],
        media: &mut MediaCorrector,
        measurement: &mut MeasurementData,
        cosm: &dyn Cosm,
    ) -> Result<bool, MeasurementError> {
        self.frequency_factor = 0.0;
        let downlink = SolvedLeg::from_event(&events[0])?;
        let uplink = SolvedLeg::from_event(&events[1])?;

        if !check_elevations(participants[0].as_ref(), &downlink, &uplink, measurement, cosm) {
            return Ok(false);
        }

        let (uplink_frequency_hz, band) = match (&self.ramp_table, &self.hardware) {
            (Some(table), _) => match table.frequency_at(uplink.tx.epoch) {
                Some(frequency) => frequency,
                None => {
                    debug!("uplink epoch {} is outside of the ramp table", uplink.tx.epoch);
                    measurement.set_infeasible(UnfeasibleReason::RampTable);
                    return Ok(false);
                }
            },
            (None, Some(hw)) => {
                let frequency_hz = hw.transmitter.frequency_mhz * 1e6;
                (frequency_hz, frequency_factor(frequency_hz, None)?.1)
            }
            (None, None) => {
                return InvalidSettingSnafu {
                    msg: "no uplink frequency source".to_string(),
                }
                .fail()
            }
        };

        self.frequency_factor = frequency_factor(uplink_frequency_hz, Some(band))?.0;

        let legs = correct_legs(
            self.hardware.as_ref(),
            uplink_frequency_hz * 1e-6,
            participants,
            &downlink,
            &uplink,
            media,
            cosm,
        )?;

        let delays = self
            .hardware
            .as_ref()
            .map(TwoWayHardware::delays)
            .unwrap_or_default();
        let travel_time_s = (legs.uplink_km + legs.downlink_km) / SPEED_OF_LIGHT_KM_S
            + delays.transmit_s
            + delays.transponder_s
            + delays.receive_s;

        let range_units = match &self.ramp_table {
            Some(table) => match table.integral(downlink.rx.epoch, travel_time_s)? {
                Some(value) => value,
                None => {
                    debug!(
                        "signal path ending at {} is not covered by the ramp table",
                        downlink.rx.epoch
                    );
                    measurement.set_infeasible(UnfeasibleReason::RampTable);
                    return Ok(false);
                }
            },
            None => travel_time_s * self.frequency_factor,
        };

        measurement.uplink_frequency_hz = uplink_frequency_hz;
        measurement.uplink_band = band;
        measurement.range_modulo = self.range_modulo;
        measurement.set_feasible(&[range_units.rem_euclid(self.range_modulo)], 2);
        Ok(true)
    }
}
