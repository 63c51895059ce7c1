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

use crate::cosmic::{Cosm, ParticipantKind, SpacePoint};
use crate::linalg::{DMatrix, Matrix3, Vector3};
use crate::od::event::{inverse_stm, locate_events, EventChain, LightTimeConfig, LightTimeEvent};
use crate::od::media::{MediaCorrection, MediaCorrector};
use crate::od::msr::{MeasurementData, MeasurementType, UnfeasibleReason};
use crate::od::params::{SolveFor, WrtObject};
use crate::od::{
    EventIndexSnafu, InvalidLifecycleSnafu, InvalidSettingSnafu, MeasurementError,
    UnknownDerivativeObjectSnafu, UnsupportedRefObjectSnafu,
};
use crate::time::{Epoch, Unit};
use snafu::{ensure, OptionExt};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

mod config;
mod derivatives;
mod dsn;
mod factory;
mod optical;
mod sn;
mod tdrss;
mod two_way;
mod usn;

pub use config::MeasurementConfig;
pub use dsn::{frequency_factor, DsnTwoWayRange, RampRecord, RampTable};
pub use factory::{create_measurement, supported_measurements};
pub use optical::OpticalAzEl;
pub use tdrss::{TdrssDelays, TdrssTwoWayRange};
pub use usn::UsnTwoWayRange;

/// Minimum clearance of a signal path above the surface of the central body, in km.
pub const LINE_OF_SIGHT_MARGIN_KM: f64 = 50.0;

static NEXT_MODEL_ID: AtomicU64 = AtomicU64::new(1);

/// Lifecycle of a measurement model.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ModelState {
    #[default]
    Uninitialized,
    Initialized,
    /// Evaluated without light-time correction
    FeasibilityChecked,
    /// Evaluated with light-time correction, derivatives may be computed
    EventsSolved,
}

impl fmt::Display for ModelState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let state = match self {
            Self::Uninitialized => "uninitialized",
            Self::Initialized => "initialized",
            Self::FeasibilityChecked => "feasibility checked",
            Self::EventsSolved => "events solved",
        };
        write!(f, "{state}")
    }
}

/// Topology specific settings and cached solution of each measurement model.
#[derive(Clone, Debug)]
pub enum ModelKind {
    UsnTwoWayRange(UsnTwoWayRange),
    DsnTwoWayRange(DsnTwoWayRange),
    TdrssTwoWayRange(TdrssTwoWayRange),
    SnTwoWayRange,
    OpticalAzEl(OpticalAzEl),
}

impl ModelKind {
    pub fn new(msr_type: MeasurementType) -> Self {
        match msr_type {
            MeasurementType::UsnTwoWayRange => Self::UsnTwoWayRange(UsnTwoWayRange::default()),
            MeasurementType::DsnTwoWayRange => Self::DsnTwoWayRange(DsnTwoWayRange::default()),
            MeasurementType::TdrssTwoWayRange => {
                Self::TdrssTwoWayRange(TdrssTwoWayRange::default())
            }
            MeasurementType::SnTwoWayRange => Self::SnTwoWayRange,
            MeasurementType::OpticalAzEl => Self::OpticalAzEl(OpticalAzEl::default()),
        }
    }

    pub fn msr_type(&self) -> MeasurementType {
        match self {
            Self::UsnTwoWayRange(_) => MeasurementType::UsnTwoWayRange,
            Self::DsnTwoWayRange(_) => MeasurementType::DsnTwoWayRange,
            Self::TdrssTwoWayRange(_) => MeasurementType::TdrssTwoWayRange,
            Self::SnTwoWayRange => MeasurementType::SnTwoWayRange,
            Self::OpticalAzEl(_) => MeasurementType::OpticalAzEl,
        }
    }

    /// Signal legs in the order they are solved, as (name, transmitter index, receiver index) in the participant list.
    /// The receiver is always the fixed end of the leg.
    fn legs(&self) -> &'static [(&'static str, usize, usize)] {
        match self {
            Self::UsnTwoWayRange(_) | Self::DsnTwoWayRange(_) | Self::SnTwoWayRange => {
                &[("downlink", 1, 0), ("uplink", 0, 1)]
            }
            Self::TdrssTwoWayRange(_) => &[
                ("downlink", 1, 0),
                ("backlink", 2, 1),
                ("forwardlink", 1, 2),
                ("uplink", 0, 1),
            ],
            Self::OpticalAzEl(_) => &[("light path", 1, 0)],
        }
    }

    /// Expected kind of each participant, `None` accepts any kind.
    fn roles(&self) -> &'static [Option<ParticipantKind>] {
        match self {
            Self::UsnTwoWayRange(_) | Self::DsnTwoWayRange(_) | Self::SnTwoWayRange => {
                &[None, Some(ParticipantKind::Orbiting)]
            }
            Self::TdrssTwoWayRange(_) => &[
                None,
                Some(ParticipantKind::Orbiting),
                Some(ParticipantKind::Orbiting),
            ],
            Self::OpticalAzEl(_) => &[
                Some(ParticipantKind::GroundFixed),
                Some(ParticipantKind::Orbiting),
            ],
        }
    }
}

/// Delays folded into the fixed time steps of the legs.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct LegDelays {
    /// Electronics delay of the receiver at the end of the first leg
    pub receive_s: f64,
    /// Turn-around delay between each leg and the next one
    pub turnaround_s: Vec<f64>,
}

/// Objects which may be attached to a measurement model before its initialization.
#[derive(Clone, Debug)]
pub enum RefObject {
    Participant(Arc<dyn SpacePoint>),
    MediaCorrection(Arc<dyn MediaCorrection>),
    RampTable(RampTable),
}

impl fmt::Display for RefObject {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Participant(p) => write!(f, "participant {}", p.name()),
            Self::MediaCorrection(m) => write!(f, "{:?} media correction", m.kind()),
            Self::RampTable(t) => write!(f, "ramp table of {} records", t.records.len()),
        }
    }
}

/// A measurement model computes one observable from its participants at an epoch, optionally correcting for light time,
/// and the partial derivatives of that observable.
///
/// Participants are shared and never mutated. All intermediate results are owned by the model, so a model must be cloned
/// to be evaluated from several threads.
#[derive(Clone, Debug)]
pub struct MeasurementModel {
    name: String,
    unique_id: u64,
    kind: ModelKind,
    participants: Vec<Arc<dyn SpacePoint>>,
    events: Vec<LightTimeEvent>,
    light_time: LightTimeConfig,
    media: MediaCorrector,
    delays: LegDelays,
    state: ModelState,
    measurement: MeasurementData,
}

impl MeasurementModel {
    pub fn new(name: &str, msr_type: MeasurementType) -> Self {
        let kind = ModelKind::new(msr_type);
        let light_time = LightTimeConfig::default();
        let unique_id = NEXT_MODEL_ID.fetch_add(1, Ordering::Relaxed);
        let events = kind
            .legs()
            .iter()
            .map(|(leg, _, _)| LightTimeEvent::new(&format!("{name} {leg}"), light_time))
            .collect();

        Self {
            name: name.to_string(),
            unique_id,
            kind,
            participants: Vec::with_capacity(msr_type.participant_count()),
            events,
            light_time,
            media: MediaCorrector::default(),
            delays: LegDelays::default(),
            state: ModelState::Uninitialized,
            measurement: MeasurementData::new(msr_type, unique_id),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unique_id(&self) -> u64 {
        self.unique_id
    }

    pub fn msr_type(&self) -> MeasurementType {
        self.kind.msr_type()
    }

    pub fn kind(&self) -> &ModelKind {
        &self.kind
    }

    pub fn participants(&self) -> &[Arc<dyn SpacePoint>] {
        &self.participants
    }

    pub fn state(&self) -> ModelState {
        self.state
    }

    pub fn light_time_config(&self) -> LightTimeConfig {
        self.light_time
    }

    /// Sets the convergence settings of every leg. The model must be initialized again.
    pub fn set_light_time_config(&mut self, config: LightTimeConfig) {
        self.light_time = config;
        self.events = self
            .events
            .iter()
            .map(|event| LightTimeEvent::new(event.name(), config))
            .collect();
        self.state = ModelState::Uninitialized;
    }

    /// Sets the range modulo of a DSN range measurement, in range units.
    pub fn set_range_modulo(&mut self, range_modulo: f64) -> Result<(), MeasurementError> {
        match &mut self.kind {
            ModelKind::DsnTwoWayRange(dsn) => {
                ensure!(
                    range_modulo > 0.0,
                    InvalidSettingSnafu {
                        msg: format!("range modulo must be strictly positive, got {range_modulo}")
                    }
                );
                dsn.range_modulo = range_modulo;
                Ok(())
            }
            _ => InvalidSettingSnafu {
                msg: format!("{} has no range modulo", self.kind.msr_type()),
            }
            .fail(),
        }
    }

    /// Attaches a participant, a media correction, or a ramp table to this model. The model must be initialized again.
    pub fn set_ref_object(&mut self, object: RefObject) -> Result<(), MeasurementError> {
        match (&mut self.kind, object) {
            (_, RefObject::Participant(participant)) => {
                debug!("[{}] adding participant {}", self.name, participant.name());
                self.participants.push(participant);
            }
            (
                ModelKind::UsnTwoWayRange(_) | ModelKind::DsnTwoWayRange(_),
                RefObject::MediaCorrection(model),
            ) => self.media.add(model),
            (ModelKind::DsnTwoWayRange(dsn), RefObject::RampTable(table)) => {
                dsn.ramp_table = Some(table)
            }
            (_, object) => {
                return UnsupportedRefObjectSnafu {
                    model: self.name.clone(),
                    object: object.to_string(),
                }
                .fail()
            }
        }
        self.state = ModelState::Uninitialized;
        Ok(())
    }

    /// Validates the participants, locates the hardware, and configures every leg.
    ///
    /// Returns `Ok(false)` if the participants do not match the topology of this measurement. Hardware and leg setup
    /// errors are returned as errors. The model is left untouched on failure.
    pub fn initialize(&mut self) -> Result<bool, MeasurementError> {
        let roles = self.kind.roles();
        if self.participants.len() != roles.len() {
            warn!(
                "{}",
                MeasurementError::ParticipantCount {
                    model: self.name.clone(),
                    expected: roles.len(),
                    found: self.participants.len(),
                }
            );
            return Ok(false);
        }

        for (index, (participant, role)) in self.participants.iter().zip(roles).enumerate() {
            if let Some(expected) = role {
                if participant.kind() != *expected {
                    warn!(
                        "{}",
                        MeasurementError::ParticipantKindMismatch {
                            model: self.name.clone(),
                            name: participant.name().to_string(),
                            index,
                            expected: match expected {
                                ParticipantKind::GroundFixed => "fixed to the ground",
                                ParticipantKind::Orbiting => "orbiting",
                            },
                        }
                    );
                    return Ok(false);
                }
            }
            if self.participants[..index]
                .iter()
                .any(|other| other.id() == participant.id())
            {
                warn!(
                    "[{}] participant {} is registered twice",
                    self.name,
                    participant.id()
                );
                return Ok(false);
            }
        }

        let mut kind = self.kind.clone();
        let delays = match &mut kind {
            ModelKind::UsnTwoWayRange(usn) => usn.initialize(&self.participants)?,
            ModelKind::DsnTwoWayRange(dsn) => dsn.initialize(&self.participants)?,
            ModelKind::TdrssTwoWayRange(tdrss) => tdrss.initialize(&self.participants)?,
            ModelKind::SnTwoWayRange => sn::initialize(),
            ModelKind::OpticalAzEl(optical) => optical.initialize(&self.participants)?,
        };

        let mut events = Vec::with_capacity(self.events.len());
        for (event, (_, tx, rx)) in self.events.iter().zip(kind.legs()) {
            let mut leg = LightTimeEvent::new(event.name(), self.light_time);
            for index in [*tx, *rx] {
                leg.add_participant(self.participants[index].clone());
            }
            leg.fix_state(self.participants[*rx].id())?;
            leg.add_frame(crate::cosmic::Frame::Inertial, None)?;
            for (i, index) in [*tx, *rx].into_iter().enumerate() {
                leg.add_frame(self.participants[index].frame(), Some(i))?;
            }
            leg.initialize()?;
            events.push(leg);
        }
        if let Some(first) = events.first_mut() {
            first.set_fixed_timestep(-delays.receive_s * Unit::Second);
        }

        let mut measurement = MeasurementData::new(kind.msr_type(), self.unique_id);
        measurement.participant_ids = self
            .participants
            .iter()
            .map(|p| p.id().to_string())
            .collect();

        self.kind = kind;
        self.events = events;
        self.delays = delays;
        self.measurement = measurement;
        self.state = ModelState::Initialized;
        info!(
            "[{}] {} initialized with {}",
            self.name,
            self.msr_type(),
            self.measurement.participant_ids.join(", ")
        );
        Ok(true)
    }

    /// Computes the measurement at the provided epoch, returning whether it is feasible.
    ///
    /// Without events, only the instantaneous geometry is used to check the feasibility. With events, the legs are solved
    /// for light time first and the full observable is computed from the solved states.
    pub fn evaluate(
        &mut self,
        epoch: Epoch,
        with_events: bool,
        cosm: &dyn Cosm,
    ) -> Result<bool, MeasurementError> {
        ensure!(
            self.state != ModelState::Uninitialized,
            InvalidLifecycleSnafu {
                model: self.name.clone(),
                expected: "initialized",
                action: "evaluating",
            }
        );
        self.measurement.epoch = epoch;

        let outcome = if with_events {
            self.evaluate_with_events(epoch, cosm)
        } else {
            let Self {
                name,
                kind,
                participants,
                measurement,
                ..
            } = &mut *self;
            match kind {
                ModelKind::UsnTwoWayRange(_) => {
                    two_way::evaluate_geometry(participants, 1.0, measurement, epoch, cosm)
                }
                ModelKind::DsnTwoWayRange(_) => {
                    two_way::evaluate_geometry(participants, 2.0, measurement, epoch, cosm)
                }
                ModelKind::TdrssTwoWayRange(tdrss) => {
                    tdrss.evaluate_geometry(participants, measurement, epoch, cosm)
                }
                ModelKind::SnTwoWayRange => Ok(sn::evaluate(name, measurement)),
                ModelKind::OpticalAzEl(optical) => {
                    optical.evaluate_geometry(participants, measurement, epoch, cosm)
                }
            }
        };

        // Nothing to differentiate after a failed pass
        let feasible = match outcome {
            Ok(feasible) => feasible,
            Err(e) => {
                self.measurement.set_infeasible(UnfeasibleReason::Blocked);
                self.state = ModelState::Initialized;
                return Err(e);
            }
        };

        self.state = if with_events {
            ModelState::EventsSolved
        } else {
            ModelState::FeasibilityChecked
        };
        debug!("[{}] {}", self.name, self.measurement);
        Ok(feasible)
    }

    fn evaluate_with_events(
        &mut self,
        epoch: Epoch,
        cosm: &dyn Cosm,
    ) -> Result<bool, MeasurementError> {
        if let ModelKind::SnTwoWayRange = self.kind {
            return Ok(sn::evaluate(&self.name, &mut self.measurement));
        }

        if !locate_events(self, epoch, cosm)? {
            self.measurement.feasibility_value = 0.0;
            self.measurement.set_infeasible(UnfeasibleReason::Blocked);
            return Ok(false);
        }

        let Self {
            kind,
            participants,
            events,
            media,
            measurement,
            ..
        } = self;
        match kind {
            ModelKind::UsnTwoWayRange(usn) => {
                usn.evaluate(participants, events, media, measurement, cosm)
            }
            ModelKind::DsnTwoWayRange(dsn) => {
                dsn.evaluate(participants, events, media, measurement, cosm)
            }
            ModelKind::TdrssTwoWayRange(tdrss) => tdrss.evaluate(events, measurement, cosm),
            ModelKind::OpticalAzEl(optical) => {
                optical.evaluate(participants, events, measurement, cosm)
            }
            ModelKind::SnTwoWayRange => Ok(false),
        }
    }

    /// The last computed measurement.
    pub fn measurement(&self) -> &MeasurementData {
        &self.measurement
    }

    pub fn events(&self) -> &[LightTimeEvent] {
        &self.events
    }

    pub fn get_event(&self, index: usize) -> Result<&LightTimeEvent, MeasurementError> {
        self.events.get(index).context(EventIndexSnafu {
            model: self.name.clone(),
            index,
            count: self.events.len(),
        })
    }

    /// Partial derivatives of the last measurement w.r.t. a parameter, one row per measurement component.
    ///
    /// The participant states are mapped back to the epoch of the measurement with their state transition matrices.
    pub fn calculate_measurement_derivatives(
        &self,
        wrt: &WrtObject,
        param: &SolveFor,
    ) -> Result<DMatrix<f64>, MeasurementError> {
        ensure!(
            self.state == ModelState::EventsSolved,
            InvalidLifecycleSnafu {
                model: self.name.clone(),
                expected: "evaluated with events",
                action: "computing derivatives",
            }
        );

        let rows = self.msr_type().component_count();
        let participant = match wrt {
            WrtObject::Model(id) if *id == self.unique_id => {
                return Ok(derivatives::ones(rows, param))
            }
            WrtObject::Model(_) => return Ok(DMatrix::zeros(rows, param.cardinality())),
            WrtObject::Participant(participant) => participant,
        };

        let index = self
            .participants
            .iter()
            .position(|p| p.id() == participant.id())
            .context(UnknownDerivativeObjectSnafu {
                object: participant.name().to_string(),
                model: self.name.clone(),
            })?;

        match param {
            SolveFor::Bias => Ok(derivatives::ones(rows, param)),
            SolveFor::Other { .. } => Ok(DMatrix::zeros(rows, param.cardinality())),
            SolveFor::Position | SolveFor::Velocity | SolveFor::CartesianState => {
                let participant = &self.participants[index];
                let stm_inv = inverse_stm(participant.stm(self.measurement.epoch)?);
                match &self.kind {
                    ModelKind::UsnTwoWayRange(_) => two_way::range_derivatives(
                        participant.as_ref(),
                        index,
                        &self.events,
                        &stm_inv,
                        param,
                        0.5,
                    ),
                    ModelKind::DsnTwoWayRange(dsn) => two_way::range_derivatives(
                        participant.as_ref(),
                        index,
                        &self.events,
                        &stm_inv,
                        param,
                        dsn.range_unit_per_km(),
                    ),
                    ModelKind::TdrssTwoWayRange(_) => tdrss::range_derivatives(
                        participant.as_ref(),
                        index,
                        &self.events,
                        &stm_inv,
                        param,
                    ),
                    ModelKind::SnTwoWayRange => Err(sn::not_implemented(&self.name)),
                    ModelKind::OpticalAzEl(optical) => optical.derivatives(
                        participant.as_ref(),
                        index,
                        &self.events,
                        &stm_inv,
                        param,
                    ),
                }
            }
        }
    }
}

impl EventChain for MeasurementModel {
    fn event_count(&self) -> usize {
        self.events.len()
    }

    fn event_mut(&mut self, index: usize) -> Result<&mut LightTimeEvent, MeasurementError> {
        let count = self.events.len();
        self.events.get_mut(index).context(EventIndexSnafu {
            model: self.name.clone(),
            index,
            count,
        })
    }

    /// The next leg is fixed where this one was solved, minus the turn-around delay of the participant they share.
    fn set_event_data(&mut self, index: usize) -> Result<(), MeasurementError> {
        let count = self.events.len();
        ensure!(
            index < count,
            EventIndexSnafu {
                model: self.name.clone(),
                index,
                count,
            }
        );
        if index + 1 == count {
            return Ok(());
        }

        let solved = &self.events[index];
        let turnaround_s = self.delays.turnaround_s.get(index).copied().unwrap_or(0.0);
        let offset = solved.fixed_timestep() + solved.var_timestep_s() * Unit::Second
            - turnaround_s * Unit::Second;
        self.events[index + 1].set_fixed_timestep(offset);
        Ok(())
    }
}

impl fmt::Display for MeasurementModel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let names = self
            .participants
            .iter()
            .map(|p| p.name().to_string())
            .collect::<Vec<String>>()
            .join(", ");
        write!(
            f,
            "{} #{} ({}) [{names}] {}",
            self.name,
            self.unique_id,
            self.msr_type(),
            self.state
        )
    }
}

/// Whether the segment between two inertial positions clears the central body, with a margin.
pub fn line_of_sight(p1_km: &Vector3<f64>, p2_km: &Vector3<f64>, body_radius_km: f64) -> bool {
    let rho = p2_km - p1_km;
    let rho_sq = rho.norm_squared();
    if rho_sq <= 0.0 {
        return true;
    }
    let tau = rho.dot(p2_km) / rho_sq;
    if tau <= 0.0 || tau >= 1.0 {
        return true;
    }
    (p2_km - tau * rho).norm() >= body_radius_km + LINE_OF_SIGHT_MARGIN_KM
}

/// Observer to target vector in the local South-East-Zenith frame of the observer, if it has one.
pub(crate) fn topocentric(
    observer: &dyn SpacePoint,
    range_vector_km: &Vector3<f64>,
    epoch: Epoch,
    cosm: &dyn Cosm,
) -> Option<(Matrix3<f64>, Vector3<f64>)> {
    observer
        .topocentric_dcm(epoch, cosm)
        .map(|dcm| (dcm, dcm * range_vector_km))
}
