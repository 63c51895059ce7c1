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

use super::{MeasurementError, MissingHardwareSnafu};
use crate::cosmic::SpacePoint;
use serde_derive::{Deserialize, Serialize};
use snafu::ensure;

fn default_turn_around_ratio() -> String {
    "240/221".to_string()
}

/// A ground or space transmitter of a constant frequency signal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transmitter {
    pub name: String,
    /// Electronics delay, in seconds
    #[serde(default)]
    pub delay_s: f64,
    pub frequency_mhz: f64,
}

/// A receiver accepting signals within its bandwidth.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Receiver {
    pub name: String,
    /// Electronics delay, in seconds
    #[serde(default)]
    pub delay_s: f64,
    pub center_frequency_mhz: f64,
    pub bandwidth_mhz: f64,
}

impl Receiver {
    /// Returns whether the provided frequency lies within the bandwidth of this receiver.
    pub fn is_feasible(&self, frequency_mhz: f64) -> bool {
        let half_bw = self.bandwidth_mhz / 2.0;
        (self.center_frequency_mhz - half_bw..=self.center_frequency_mhz + half_bw)
            .contains(&frequency_mhz)
    }
}

/// A transponder, which retransmits the received signal at a frequency scaled by its turn-around ratio.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transponder {
    pub name: String,
    /// Turn-around delay, in seconds
    #[serde(default)]
    pub delay_s: f64,
    pub input_center_frequency_mhz: f64,
    pub input_bandwidth_mhz: f64,
    /// Ratio as `"numerator/denominator"` or as a plain number
    #[serde(default = "default_turn_around_ratio")]
    pub turn_around_ratio: String,
}

impl Transponder {
    /// Parses the turn-around ratio, which must be a strictly positive number.
    pub fn turn_around_ratio(&self) -> Result<f64, MeasurementError> {
        let parse = |s: &str| -> Result<f64, MeasurementError> {
            s.trim()
                .parse::<f64>()
                .map_err(|_| MeasurementError::InvalidTurnAroundRatio {
                    ratio: self.turn_around_ratio.clone(),
                    reason: "not a number",
                })
        };

        let ratio = match self.turn_around_ratio.split_once('/') {
            Some((num, denom)) => {
                let denom = parse(denom)?;
                ensure!(
                    denom != 0.0,
                    super::InvalidTurnAroundRatioSnafu {
                        ratio: self.turn_around_ratio.clone(),
                        reason: "zero denominator"
                    }
                );
                parse(num)? / denom
            }
            None => parse(&self.turn_around_ratio)?,
        };

        ensure!(
            ratio > 0.0,
            super::InvalidTurnAroundRatioSnafu {
                ratio: self.turn_around_ratio.clone(),
                reason: "must be strictly positive"
            }
        );

        Ok(ratio)
    }

    /// Returns whether the input signal lies within the input bandwidth of this transponder.
    pub fn is_feasible(&self, input_frequency_mhz: f64) -> bool {
        let half_bw = self.input_bandwidth_mhz / 2.0;
        (self.input_center_frequency_mhz - half_bw..=self.input_center_frequency_mhz + half_bw)
            .contains(&input_frequency_mhz)
    }

    /// Frequency of the retransmitted signal for the provided input frequency, in MHz.
    pub fn output_frequency_mhz(&self, input_frequency_mhz: f64) -> Result<f64, MeasurementError> {
        Ok(self.turn_around_ratio()? * input_frequency_mhz)
    }
}

/// Tracking hardware attached to a participant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Hardware {
    Transmitter(Transmitter),
    Receiver(Receiver),
    Transponder(Transponder),
}

impl Hardware {
    pub fn name(&self) -> &str {
        match self {
            Self::Transmitter(t) => &t.name,
            Self::Receiver(r) => &r.name,
            Self::Transponder(t) => &t.name,
        }
    }

    pub fn delay_s(&self) -> f64 {
        match self {
            Self::Transmitter(t) => t.delay_s,
            Self::Receiver(r) => r.delay_s,
            Self::Transponder(t) => t.delay_s,
        }
    }

    pub fn as_transmitter(&self) -> Option<&Transmitter> {
        match self {
            Self::Transmitter(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_receiver(&self) -> Option<&Receiver> {
        match self {
            Self::Receiver(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_transponder(&self) -> Option<&Transponder> {
        match self {
            Self::Transponder(t) => Some(t),
            _ => None,
        }
    }
}

/// Hardware delays folded into the light-time legs of a measurement, all in seconds.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct HardwareDelays {
    pub transmit_s: f64,
    pub transponder_s: f64,
    pub receive_s: f64,
}

/// Returns the only device of a given kind on this participant, or an error if there are none or several.
pub(crate) fn exactly_one<'a, T: 'a>(
    participant: &'a dyn SpacePoint,
    device: &'static str,
    purpose: &'static str,
    select: impl Fn(&'a Hardware) -> Option<&'a T>,
) -> Result<&'a T, MeasurementError> {
    let mut found = participant.hardware().iter().filter_map(select);
    let first = found.next().ok_or_else(|| {
        MissingHardwareSnafu {
            participant: participant.name().to_string(),
            device,
            purpose,
        }
        .build()
    })?;
    ensure!(
        found.next().is_none(),
        super::DuplicateHardwareSnafu {
            participant: participant.name().to_string(),
            device
        }
    );
    Ok(first)
}

/// The transmitter, receiver and transponder chain of a two-way measurement.
#[derive(Clone, Debug, PartialEq)]
pub struct TwoWayHardware {
    pub transmitter: Transmitter,
    pub receiver: Receiver,
    pub transponder: Transponder,
}

impl TwoWayHardware {
    /// Locates the hardware chain between a tracking participant and its target.
    ///
    /// Returns `None` when neither participant carries any hardware, which selects the ideal measurement path.
    /// Otherwise, exactly one transmitter and one receiver are required on the tracker and exactly one transponder on the target.
    pub fn locate(
        tracker: &dyn SpacePoint,
        target: &dyn SpacePoint,
    ) -> Result<Option<Self>, MeasurementError> {
        if tracker.hardware().is_empty() && target.hardware().is_empty() {
            return Ok(None);
        }

        let transmitter = exactly_one(tracker, "transmitter", "send signal", Hardware::as_transmitter)?;
        let receiver = exactly_one(tracker, "receiver", "receive signal", Hardware::as_receiver)?;
        let transponder = exactly_one(target, "transponder", "transpond signal", Hardware::as_transponder)?;
        // Reject invalid ratios now rather than during the evaluation.
        transponder.turn_around_ratio()?;

        Ok(Some(Self {
            transmitter: transmitter.clone(),
            receiver: receiver.clone(),
            transponder: transponder.clone(),
        }))
    }

    pub fn delays(&self) -> HardwareDelays {
        HardwareDelays {
            transmit_s: self.transmitter.delay_s,
            transponder_s: self.transponder.delay_s,
            receive_s: self.receiver.delay_s,
        }
    }
}
