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

use crate::cosmic::CosmError;
use snafu::prelude::Snafu;

/// Provides the ground station participant.
mod ground_station;
pub use ground_station::GroundStation;

/// Provides the transmitter, receiver and transponder models, and their delays.
pub mod hardware;

/// Provides the troposphere and ionosphere signal path corrections
pub mod media;

/// Provides noise modeling
pub mod noise;

/// Provides the solve-for parameter catalog used to request measurement partials.
pub mod params;

/// Provides the light-time correction of a signal leg, and the driver which resolves chained legs.
pub mod event;

/// Provides the measurement record and measurement type catalog.
pub mod msr;

/// Provides all of the supported measurement models, and the factory which builds them.
pub mod models;

/// Provides the batch simulation of measurements over many epochs.
pub mod simulator;

#[allow(unused_imports)]
pub mod prelude {
    pub use super::event::{locate_events, EventChain, EventStatus, LightTimeConfig, LightTimeEvent};
    pub use super::ground_station::*;
    pub use super::hardware::*;
    pub use super::media::{MediaCorrection, MediaCorrectionValue, Troposphere, Weather};
    pub use super::models::*;
    pub use super::msr::*;
    pub use super::noise::{Stochastics, WhiteNoise};
    pub use super::params::*;
    pub use super::simulator::TrackingSimulator;
    pub use super::*;

    pub use crate::cosmic::{
        CartesianState, CentralBody, Cosm, Frame, KeplerianSpacecraft, ParticipantKind,
        SpacePoint,
    };
    pub use crate::time::{Duration, Epoch, TimeUnits, Unit};
}

#[derive(Debug, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum MeasurementError {
    #[snafu(display("{model} requires {expected} participants, {found} registered"))]
    ParticipantCount {
        model: String,
        expected: usize,
        found: usize,
    },
    #[snafu(display("{model}: participant {name} (#{index}) must be {expected}"))]
    ParticipantKindMismatch {
        model: String,
        name: String,
        index: usize,
        expected: &'static str,
    },
    #[snafu(display("{participant} does not have a {device} to {purpose}"))]
    MissingHardware {
        participant: String,
        device: &'static str,
        purpose: &'static str,
    },
    #[snafu(display("{participant} has more than one {device}"))]
    DuplicateHardware {
        participant: String,
        device: &'static str,
    },
    #[snafu(display("the {device} of {participant} is unfeasible to receive a signal at {frequency_mhz} MHz"))]
    HardwareInfeasible {
        device: &'static str,
        participant: String,
        frequency_mhz: f64,
    },
    #[snafu(display("invalid turn-around ratio `{ratio}`: {reason}"))]
    InvalidTurnAroundRatio { ratio: String, reason: &'static str },
    #[snafu(display("light time event {event} is not configured: {reason}"))]
    EventSetup { event: String, reason: String },
    #[snafu(display("event #{index} does not exist in {model} which has {count} events"))]
    EventIndex {
        model: String,
        index: usize,
        count: usize,
    },
    #[snafu(display("no frequency band is defined for {frequency_hz} Hz"))]
    UnknownFrequencyBand { frequency_hz: f64 },
    #[snafu(display("ramp table error: {reason}"))]
    RampTable { reason: String },
    #[snafu(display("Derivative w.r.t. {participant} {parameter} is not yet implemented"))]
    DerivativeNotImplemented {
        participant: String,
        parameter: String,
    },
    #[snafu(display("{object} is neither participant nor measurement model of {model}"))]
    UnknownDerivativeObject { object: String, model: String },
    #[snafu(display("{model} must be {expected} before {action}"))]
    InvalidLifecycle {
        model: String,
        expected: &'static str,
        action: &'static str,
    },
    #[snafu(display("{model} does not accept {object} as a reference object"))]
    UnsupportedRefObject { model: String, object: String },
    #[snafu(display("{action} is not implemented for {model}"))]
    NotImplemented { model: String, action: &'static str },
    #[snafu(display("invalid measurement setting: {msg}"))]
    InvalidSetting { msg: String },
    #[snafu(display("while computing a participant state: {source}"))]
    EphemerisError { source: CosmError },
}

impl From<CosmError> for MeasurementError {
    fn from(source: CosmError) -> Self {
        Self::EphemerisError { source }
    }
}
