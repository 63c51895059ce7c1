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

use super::{MeasurementModel, RampTable, RefObject};
use crate::cosmic::SpacePoint;
use crate::io::ConfigRepr;
use crate::od::event::LightTimeConfig;
use crate::od::media::Troposphere;
use crate::od::msr::MeasurementType;
use crate::od::noise::WhiteNoise;
use crate::od::{InvalidSettingSnafu, MeasurementError};
use serde_derive::{Deserialize, Serialize};
use snafu::{ensure, OptionExt};
use std::sync::Arc;
use typed_builder::TypedBuilder;

/// Serializable definition of a measurement model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[builder(doc)]
pub struct MeasurementConfig {
    #[builder(setter(into))]
    pub name: String,
    #[serde(rename = "type")]
    pub msr_type: MeasurementType,
    /// Identifiers of the participants, ordered as the measurement type expects them
    pub participants: Vec<String>,
    #[builder(default)]
    #[serde(default)]
    pub light_time: LightTimeConfig,
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub range_modulo: Option<f64>,
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub ramp_table: Option<RampTable>,
    /// Applies the troposphere correction to two-way ranges
    #[builder(default)]
    #[serde(default)]
    pub troposphere: bool,
    /// Measurement noise, used when simulating
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub noise: Option<WhiteNoise>,
}

impl ConfigRepr for MeasurementConfig {}

impl MeasurementConfig {
    /// Builds and initializes the measurement model, picking its participants by identifier.
    pub fn build(
        &self,
        available: &[Arc<dyn SpacePoint>],
    ) -> Result<MeasurementModel, MeasurementError> {
        let mut model = MeasurementModel::new(&self.name, self.msr_type);
        model.set_light_time_config(self.light_time);

        for id in &self.participants {
            let participant = available
                .iter()
                .find(|p| p.id() == id)
                .context(InvalidSettingSnafu {
                    msg: format!("{}: no participant with identifier `{id}`", self.name),
                })?;
            model.set_ref_object(RefObject::Participant(participant.clone()))?;
        }

        if let Some(range_modulo) = self.range_modulo {
            model.set_range_modulo(range_modulo)?;
        }
        if let Some(table) = &self.ramp_table {
            model.set_ref_object(RefObject::RampTable(RampTable::new(table.records.clone())))?;
        }
        if self.troposphere {
            model.set_ref_object(RefObject::MediaCorrection(Arc::new(Troposphere)))?;
        }

        ensure!(
            model.initialize()?,
            InvalidSettingSnafu {
                msg: format!(
                    "{}: participants [{}] do not match a {} measurement",
                    self.name,
                    self.participants.join(", "),
                    self.msr_type
                )
            }
        );
        Ok(model)
    }
}
