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

use super::{EventStatus, LightTimeConfig, ParticipantData};
use crate::cosmic::{Cosm, Frame, GravitatingBody, SpacePoint, SPEED_OF_LIGHT_KM_S};
use crate::linalg::{Matrix3, Vector3};
use crate::od::{EventSetupSnafu, MeasurementError};
use crate::time::{Duration, Epoch, Unit};
use snafu::ensure;
use std::fmt;
use std::sync::Arc;

/// One directed signal leg between a transmitter (index 0) and a receiver (index 1).
///
/// One end of the leg is fixed at the reference epoch plus a fixed time step. The epoch of the other end
/// is solved by fixed point iteration so that the light travel time matches the range between both ends.
#[derive(Clone, Debug)]
pub struct LightTimeEvent {
    name: String,
    config: LightTimeConfig,
    participants: Vec<Arc<dyn SpacePoint>>,
    fixed_index: Option<usize>,
    fixed_timestep: Duration,
    base_frame: Option<Frame>,
    frames: Vec<Option<Frame>>,
    data: Vec<ParticipantData>,
    var_timestep_s: f64,
    range_vector_km: Vector3<f64>,
    relativity_correction_km: f64,
    iterations: usize,
    status: EventStatus,
    initialized: bool,
}

impl LightTimeEvent {
    pub fn new(name: &str, config: LightTimeConfig) -> Self {
        Self {
            name: name.to_string(),
            config,
            participants: Vec::with_capacity(2),
            fixed_index: None,
            fixed_timestep: Duration::ZERO,
            base_frame: None,
            frames: Vec::with_capacity(2),
            data: Vec::with_capacity(2),
            var_timestep_s: 0.0,
            range_vector_km: Vector3::zeros(),
            relativity_correction_km: 0.0,
            iterations: 0,
            status: EventStatus::Unsolved,
            initialized: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> LightTimeConfig {
        self.config
    }

    /// Registers the next participant of this leg: the transmitter first, then the receiver.
    pub fn add_participant(&mut self, participant: Arc<dyn SpacePoint>) {
        self.participants.push(participant);
        self.frames.push(None);
        self.initialized = false;
    }

    pub fn participants(&self) -> &[Arc<dyn SpacePoint>] {
        &self.participants
    }

    /// Declares which participant is the fixed end of this leg, by its identifier.
    pub fn fix_state(&mut self, id: &str) -> Result<(), MeasurementError> {
        let index = self
            .participants
            .iter()
            .position(|p| p.id() == id)
            .ok_or_else(|| MeasurementError::EventSetup {
                event: self.name.clone(),
                reason: format!("cannot fix {id} which is not a participant"),
            })?;
        self.fixed_index = Some(index);
        self.initialized = false;
        Ok(())
    }

    pub fn fixed_index(&self) -> Option<usize> {
        self.fixed_index
    }

    /// Offset of the fixed end of the leg from the reference epoch.
    pub fn set_fixed_timestep(&mut self, offset: Duration) {
        self.fixed_timestep = offset;
    }

    pub fn fixed_timestep(&self) -> Duration {
        self.fixed_timestep
    }

    /// Sets the base frame (`index` is `None`), in which the range vector is expressed, or the frame of a participant.
    pub fn add_frame(&mut self, frame: Frame, index: Option<usize>) -> Result<(), MeasurementError> {
        match index {
            None => self.base_frame = Some(frame),
            Some(index) => {
                ensure!(
                    index < self.participants.len(),
                    EventSetupSnafu {
                        event: self.name.clone(),
                        reason: format!(
                            "no participant #{index} to set the frame of, only {} registered",
                            self.participants.len()
                        )
                    }
                );
                self.frames[index] = Some(frame);
            }
        }
        self.initialized = false;
        Ok(())
    }

    /// Checks that this leg is fully configured.
    pub fn initialize(&mut self) -> Result<(), MeasurementError> {
        let setup = |reason: &str| MeasurementError::EventSetup {
            event: self.name.clone(),
            reason: reason.to_string(),
        };

        if self.participants.len() != 2 {
            return Err(setup(&format!(
                "requires exactly two participants, {} registered",
                self.participants.len()
            )));
        }
        if self.fixed_index.is_none() {
            return Err(setup("no fixed participant"));
        }
        if self.base_frame.is_none() {
            return Err(setup("no base frame"));
        }
        if let Some(index) = self.frames.iter().position(Option::is_none) {
            return Err(setup(&format!("no frame for participant #{index}")));
        }
        if self.config.max_iterations == 0 || self.config.tolerance_km <= 0.0 {
            return Err(setup("the iteration cap and the tolerance must be strictly positive"));
        }

        self.initialized = true;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// +1 if the unknown epoch is after the fixed one (the transmitter is fixed), -1 otherwise.
    pub fn direction(&self) -> f64 {
        match self.fixed_index {
            Some(1) => -1.0,
            _ => 1.0,
        }
    }

    /// Solves the epoch of the free end of this leg for the provided reference epoch.
    ///
    /// Non convergence is not an error: it is reported as [EventStatus::Diverged].
    pub fn solve(
        &mut self,
        reference_epoch: Epoch,
        cosm: &dyn Cosm,
    ) -> Result<EventStatus, MeasurementError> {
        ensure!(
            self.initialized,
            EventSetupSnafu {
                event: self.name.clone(),
                reason: "solved before initialization".to_string()
            }
        );
        let fixed_index = self.fixed_index.unwrap_or(1);
        let var_index = 1 - fixed_index;
        let direction = self.direction();

        let fixed_epoch = reference_epoch + self.fixed_timestep;
        let fixed_data = self.participant_state(fixed_index, fixed_epoch, cosm)?;
        let base_dcm = self
            .base_frame
            .unwrap_or(Frame::Inertial)
            .dcm_from_inertial(fixed_epoch, cosm)
            .rot_mat;
        let bodies = if self.config.relativity {
            cosm.gravitating_bodies(fixed_epoch)
        } else {
            Vec::new()
        };

        self.status = EventStatus::Diverged;
        let mut var_s = 0.0;
        for iteration in 1..=self.config.max_iterations {
            let var_data =
                self.participant_state(var_index, fixed_epoch + var_s * Unit::Second, cosm)?;

            let (tx, rx) = if fixed_index == 1 {
                (var_data, fixed_data.clone())
            } else {
                (fixed_data.clone(), var_data)
            };

            let range_vector_km = rx.position_km - tx.position_km;
            let relativity_km = relativity_correction_km(&tx.position_km, &rx.position_km, &bodies);
            let new_var_s = direction * (range_vector_km.norm() + relativity_km) / SPEED_OF_LIGHT_KM_S;

            self.data = vec![tx, rx];
            self.range_vector_km = base_dcm * range_vector_km;
            self.relativity_correction_km = relativity_km;
            self.var_timestep_s = var_s;
            self.iterations = iteration;

            let delta_km = (new_var_s - var_s).abs() * SPEED_OF_LIGHT_KM_S;
            debug!(
                "[{}] iteration #{iteration}: var = {var_s:.12} s, range = {:.6} km, delta = {delta_km:.3e} km",
                self.name,
                range_vector_km.norm()
            );

            if delta_km < self.config.tolerance_km {
                self.status = EventStatus::Converged;
                break;
            }
            var_s = new_var_s;
        }

        // Only the final iterate needs its state transition matrix.
        for (participant, data) in self.participants.iter().zip(self.data.iter_mut()) {
            data.stm = participant.stm(data.epoch)?;
        }

        if self.status == EventStatus::Diverged {
            warn!(
                "[{}] light time did not converge to {} km in {} iterations at {reference_epoch}",
                self.name, self.config.tolerance_km, self.config.max_iterations
            );
        }

        Ok(self.status)
    }

    fn participant_state(
        &self,
        index: usize,
        epoch: Epoch,
        cosm: &dyn Cosm,
    ) -> Result<ParticipantData, MeasurementError> {
        let participant = &self.participants[index];
        let state = participant.state(epoch, cosm)?;
        let frame_dcm = match self.frames[index] {
            Some(frame) => frame.dcm_from_inertial(epoch, cosm).rot_mat,
            None => Matrix3::identity(),
        };
        Ok(ParticipantData {
            name: participant.name().to_string(),
            id: participant.id().to_string(),
            epoch,
            position_km: state.position_km,
            velocity_km_s: state.velocity_km_s,
            stm: None,
            frame_dcm,
        })
    }

    /// Index of the participant with the provided identifier.
    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.participants.iter().position(|p| p.id() == id)
    }

    /// Solved data of the participant at the provided index, available once solved.
    pub fn participant_data(&self, index: usize) -> Option<&ParticipantData> {
        self.data.get(index)
    }

    pub fn position(&self, index: usize) -> Option<Vector3<f64>> {
        self.data.get(index).map(|d| d.position_km)
    }

    pub fn velocity(&self, index: usize) -> Option<Vector3<f64>> {
        self.data.get(index).map(|d| d.velocity_km_s)
    }

    /// Solved offset of the free end from the fixed end, in seconds (negative when the transmit epoch is solved).
    pub fn var_timestep_s(&self) -> f64 {
        self.var_timestep_s
    }

    /// Receiver minus transmitter position at their solved epochs, in the base frame
    pub fn range_vector_km(&self) -> Vector3<f64> {
        self.range_vector_km
    }

    pub fn range_km(&self) -> f64 {
        self.range_vector_km.norm()
    }

    /// Range rate along the line of sight, in km/s
    pub fn range_rate_km_s(&self) -> f64 {
        match (self.velocity(0), self.velocity(1)) {
            (Some(v_tx), Some(v_rx)) => {
                let range = self.range_km();
                if range > 0.0 {
                    (v_rx - v_tx).dot(&self.range_vector_km) / range
                } else {
                    0.0
                }
            }
            _ => 0.0,
        }
    }

    pub fn relativity_correction_km(&self) -> f64 {
        self.relativity_correction_km
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn status(&self) -> EventStatus {
        self.status
    }
}

impl fmt::Display for LightTimeEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let names = self
            .participants
            .iter()
            .map(|p| p.name().to_string())
            .collect::<Vec<String>>()
            .join(" -> ");
        write!(
            f,
            "{} [{names}] {} after {} iterations (range = {:.6} km)",
            self.name,
            self.status,
            self.iterations,
            self.range_km()
        )
    }
}

/// Relativistic (Shapiro) delay of a signal between two inertial positions, expressed as a distance in km.
///
/// Sum over all gravitating bodies of `(1 + gamma) GM / c^2 ln((r1 + r2 + r12) / (r1 + r2 - r12))` with gamma = 1,
/// where the Sun also includes its own term in both the numerator and the denominator.
pub fn relativity_correction_km(
    tx_position_km: &Vector3<f64>,
    rx_position_km: &Vector3<f64>,
    bodies: &[GravitatingBody],
) -> f64 {
    const GAMMA: f64 = 1.0;
    let r12 = (rx_position_km - tx_position_km).norm();

    bodies
        .iter()
        .map(|body| {
            let r1 = (tx_position_km - body.position_km).norm();
            let r2 = (rx_position_km - body.position_km).norm();
            let k = (1.0 + GAMMA) * body.gm_km3_s2 / SPEED_OF_LIGHT_KM_S.powi(2);
            let term = if body.is_sun { k } else { 0.0 };
            let denom = r1 + r2 - r12 + term;
            if denom <= 0.0 {
                // The signal goes through the center of the body.
                0.0
            } else {
                k * ((r1 + r2 + r12 + term) / denom).ln()
            }
        })
        .sum()
}
