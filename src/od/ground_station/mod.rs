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

use crate::cosmic::{
    geodetic_to_body_fixed, sez_from_body_fixed, CartesianState, Cosm, CosmResult, Frame,
    ParticipantKind, SpacePoint,
};
use crate::io::ConfigRepr;
use crate::linalg::{Matrix3, Vector3};
use crate::od::hardware::Hardware;
use crate::od::media::Weather;
use crate::time::Epoch;
use crate::utils::{between_0_360, unit_or_zero};
use serde_derive::{Deserialize, Serialize};
use std::fmt;

pub mod builtin;

/// GroundStation defines a tracking station fixed to the surface of the central body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroundStation {
    pub name: String,
    /// Identifier used to match hardware and participants, defaults to the name
    #[serde(default)]
    pub id: String,
    /// in degrees
    pub elevation_mask_deg: f64,
    /// in degrees
    pub latitude_deg: f64,
    /// in degrees
    pub longitude_deg: f64,
    /// in km
    pub height_km: f64,
    #[serde(default)]
    pub hardware: Vec<Hardware>,
    #[serde(default)]
    pub weather: Weather,
}

impl GroundStation {
    /// Initializes a point on the surface of a celestial object.
    /// This is meant for analysis, not for spacecraft navigation.
    pub fn from_point(name: String, latitude_deg: f64, longitude_deg: f64, height_km: f64) -> Self {
        Self {
            id: name.clone(),
            name,
            elevation_mask_deg: 0.0,
            latitude_deg,
            longitude_deg,
            height_km,
            hardware: Vec::new(),
            weather: Weather::default(),
        }
    }

    /// Returns a copy of this ground station with the provided hardware attached.
    pub fn with_hardware(mut self, hardware: Hardware) -> Self {
        self.hardware.push(hardware);
        self
    }

    pub fn with_elevation_mask(mut self, elevation_mask_deg: f64) -> Self {
        self.elevation_mask_deg = elevation_mask_deg;
        self
    }

    pub fn with_weather(mut self, weather: Weather) -> Self {
        self.weather = weather;
        self
    }

    /// Position of this station in the body fixed frame of the central body, in km
    pub fn body_fixed_position_km(&self, cosm: &dyn Cosm) -> Vector3<f64> {
        geodetic_to_body_fixed(
            self.latitude_deg,
            self.longitude_deg,
            self.height_km,
            cosm.equatorial_radius_km(),
            cosm.flattening(),
        )
    }

    /// Computes the azimuth (in [0, 360) degrees), the elevation (in degrees) and the range (in km) of the provided inertial position seen from this station.
    pub fn azimuth_elevation_of(
        &self,
        position_km: &Vector3<f64>,
        epoch: Epoch,
        cosm: &dyn Cosm,
    ) -> CosmResult<(f64, f64, f64)> {
        let gs = self.state(epoch, cosm)?;
        let rho = position_km - gs.position_km;
        let rho_sez = self.topocentric_from_inertial(epoch, cosm) * rho;

        let elevation_deg = unit_or_zero(&rho_sez)[2].clamp(-1.0, 1.0).asin().to_degrees();
        if (elevation_deg - 90.0).abs() < 1e-6 {
            warn!("object nearly overhead (el = {elevation_deg} deg), azimuth may be incorrect");
        }
        // Azimuth is measured from the North, and the SEZ frame points South.
        let azimuth_deg = between_0_360(rho_sez[1].atan2(-rho_sez[0]).to_degrees());

        Ok((azimuth_deg, elevation_deg, rho.norm()))
    }

    fn topocentric_from_inertial(&self, epoch: Epoch, cosm: &dyn Cosm) -> Matrix3<f64> {
        sez_from_body_fixed(self.latitude_deg, self.longitude_deg)
            * cosm.body_fixed_from_inertial(epoch).rot_mat
    }
}

impl Default for GroundStation {
    fn default() -> Self {
        Self::from_point("UNDEFINED".to_string(), 0.0, 0.0, 0.0)
    }
}

impl ConfigRepr for GroundStation {}

impl SpacePoint for GroundStation {
    fn name(&self) -> &str {
        &self.name
    }

    fn id(&self) -> &str {
        if self.id.is_empty() {
            &self.name
        } else {
            &self.id
        }
    }

    fn kind(&self) -> ParticipantKind {
        ParticipantKind::GroundFixed
    }

    fn frame(&self) -> Frame {
        Frame::BodyFixed
    }

    /// Inertial state of the station, including the velocity due to the rotation of the central body.
    fn state(&self, epoch: Epoch, cosm: &dyn Cosm) -> CosmResult<CartesianState> {
        let (position_km, velocity_km_s) = cosm
            .body_fixed_from_inertial(epoch)
            .transpose()
            .transform(&self.body_fixed_position_km(cosm), &Vector3::zeros());
        Ok(CartesianState::new(epoch, position_km, velocity_km_s))
    }

    fn hardware(&self) -> &[Hardware] {
        &self.hardware
    }

    fn topocentric_dcm(&self, epoch: Epoch, cosm: &dyn Cosm) -> Option<Matrix3<f64>> {
        Some(self.topocentric_from_inertial(epoch, cosm))
    }

    fn elevation_mask_deg(&self) -> f64 {
        self.elevation_mask_deg
    }

    fn weather(&self) -> Option<Weather> {
        Some(self.weather)
    }
}

impl fmt::Display for GroundStation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} (lat.: {:.4} deg    long.: {:.4} deg    alt.: {:.3} m)",
            self.name,
            self.latitude_deg,
            self.longitude_deg,
            self.height_km * 1e3,
        )
    }
}
