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

use crate::linalg::{Matrix3, Matrix6, Vector3};
use crate::od::hardware::Hardware;
use crate::od::media::Weather;
use crate::time::Epoch;
use crate::utils::{r2, r3};
use serde_derive::{Deserialize, Serialize};
use snafu::prelude::*;
use std::fmt;
use std::ops::Mul;

/// Provides the analytic central body service.
pub mod bodies;
pub use bodies::CentralBody;

/// Provides a two-body spacecraft ephemeris, with its state transition matrix.
pub mod spacecraft;
pub use spacecraft::KeplerianSpacecraft;

/// Speed of light in vacuum, in km/s.
pub const SPEED_OF_LIGHT_KM_S: f64 = 299_792.458;
/// Speed of light in vacuum, in m/s.
pub const SPEED_OF_LIGHT_M_S: f64 = 299_792_458.0;
/// Multiply radians by this to get degrees
pub const DEG_PER_RAD: f64 = 180.0 / std::f64::consts::PI;

#[derive(Debug, PartialEq, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CosmError {
    #[snafu(display(
        "{name} reference state is not elliptic (specific energy = {energy_km2_s2} km^2/s^2)"
    ))]
    NotElliptic { name: String, energy_km2_s2: f64 },
    #[snafu(display("Kepler's equation for {name} did not converge in {iterations} iterations at {epoch}"))]
    KeplerDiverged {
        name: String,
        iterations: usize,
        epoch: Epoch,
    },
}

pub type CosmResult<T> = Result<T, CosmError>;

/// An inertial Cartesian state, centered on the central body of the [Cosm].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CartesianState {
    pub epoch: Epoch,
    pub position_km: Vector3<f64>,
    pub velocity_km_s: Vector3<f64>,
}

impl CartesianState {
    pub fn new(epoch: Epoch, position_km: Vector3<f64>, velocity_km_s: Vector3<f64>) -> Self {
        Self {
            epoch,
            position_km,
            velocity_km_s,
        }
    }

    /// Builds a state from its position and velocity components, in km and km/s.
    pub fn cartesian(epoch: Epoch, x: f64, y: f64, z: f64, vx: f64, vy: f64, vz: f64) -> Self {
        Self::new(epoch, Vector3::new(x, y, z), Vector3::new(vx, vy, vz))
    }

    /// Returns the magnitude of the position vector in km
    pub fn rmag_km(&self) -> f64 {
        self.position_km.norm()
    }

    /// Returns the magnitude of the velocity vector in km/s
    pub fn vmag_km_s(&self) -> f64 {
        self.velocity_km_s.norm()
    }
}

impl fmt::Display for CartesianState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "[{}] position = [{:.6}, {:.6}, {:.6}] km\tvelocity = [{:.6}, {:.6}, {:.6}] km/s",
            self.epoch,
            self.position_km[0],
            self.position_km[1],
            self.position_km[2],
            self.velocity_km_s[0],
            self.velocity_km_s[1],
            self.velocity_km_s[2]
        )
    }
}

/// A direction cosine matrix and its optional time derivative.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Dcm {
    pub rot_mat: Matrix3<f64>,
    pub rot_mat_dt: Option<Matrix3<f64>>,
}

impl Dcm {
    pub fn identity() -> Self {
        Self {
            rot_mat: Matrix3::identity(),
            rot_mat_dt: None,
        }
    }

    /// A time invariant rotation
    pub fn fixed(rot_mat: Matrix3<f64>) -> Self {
        Self {
            rot_mat,
            rot_mat_dt: None,
        }
    }

    /// Returns the inverse of this rotation, including its time derivative.
    pub fn transpose(&self) -> Self {
        Self {
            rot_mat: self.rot_mat.transpose(),
            rot_mat_dt: self.rot_mat_dt.map(|dt| dt.transpose()),
        }
    }

    /// Rotates a position and velocity pair, accounting for the rotation rate of the frame.
    pub fn transform(
        &self,
        position_km: &Vector3<f64>,
        velocity_km_s: &Vector3<f64>,
    ) -> (Vector3<f64>, Vector3<f64>) {
        let position = self.rot_mat * position_km;
        let mut velocity = self.rot_mat * velocity_km_s;
        if let Some(dt) = self.rot_mat_dt {
            velocity += dt * position_km;
        }
        (position, velocity)
    }
}

impl Mul for Dcm {
    type Output = Self;

    /// Composes two rotations: `(a * b)` first applies `b`, then `a`.
    fn mul(self, rhs: Self) -> Self::Output {
        let rot_mat_dt = match (self.rot_mat_dt, rhs.rot_mat_dt) {
            (None, None) => None,
            (Some(a_dt), None) => Some(a_dt * rhs.rot_mat),
            (None, Some(b_dt)) => Some(self.rot_mat * b_dt),
            (Some(a_dt), Some(b_dt)) => Some(a_dt * rhs.rot_mat + self.rot_mat * b_dt),
        };
        Self {
            rot_mat: self.rot_mat * rhs.rot_mat,
            rot_mat_dt,
        }
    }
}

/// The coordinate frames a participant or a signal leg may be expressed in.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Frame {
    /// Inertial frame centered on the central body (e.g. EME2000)
    Inertial,
    /// Rotating frame fixed to the central body
    BodyFixed,
    /// South-East-Zenith frame of a point on the surface of the central body
    Topocentric {
        latitude_deg: f64,
        longitude_deg: f64,
    },
}

impl Frame {
    /// Returns the rotation from the inertial frame into this frame.
    pub fn dcm_from_inertial(&self, epoch: Epoch, cosm: &dyn Cosm) -> Dcm {
        match *self {
            Self::Inertial => Dcm::identity(),
            Self::BodyFixed => cosm.body_fixed_from_inertial(epoch),
            Self::Topocentric {
                latitude_deg,
                longitude_deg,
            } => {
                Dcm::fixed(sez_from_body_fixed(latitude_deg, longitude_deg))
                    * cosm.body_fixed_from_inertial(epoch)
            }
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Inertial => write!(f, "inertial"),
            Self::BodyFixed => write!(f, "body fixed"),
            Self::Topocentric {
                latitude_deg,
                longitude_deg,
            } => write!(f, "SEZ @ ({latitude_deg:.4}, {longitude_deg:.4}) deg"),
        }
    }
}

/// Rotation from the body fixed frame into the South-East-Zenith frame at the provided geodetic coordinates.
pub fn sez_from_body_fixed(latitude_deg: f64, longitude_deg: f64) -> Matrix3<f64> {
    r2(std::f64::consts::FRAC_PI_2 - latitude_deg.to_radians()) * r3(longitude_deg.to_radians())
}

/// Converts geodetic coordinates into a body fixed position (in km) on the provided ellipsoid.
pub fn geodetic_to_body_fixed(
    latitude_deg: f64,
    longitude_deg: f64,
    height_km: f64,
    equatorial_radius_km: f64,
    flattening: f64,
) -> Vector3<f64> {
    let e2 = 2.0 * flattening - flattening.powi(2);
    let (sin_lat, cos_lat) = latitude_deg.to_radians().sin_cos();
    let (sin_long, cos_long) = longitude_deg.to_radians().sin_cos();
    let c_body = equatorial_radius_km / (1.0 - e2 * sin_lat.powi(2)).sqrt();
    let s_body = c_body * (1.0 - e2);

    Vector3::new(
        (c_body + height_km) * cos_lat * cos_long,
        (c_body + height_km) * cos_lat * sin_long,
        (s_body + height_km) * sin_lat,
    )
}

/// A gravitating body contributing to the relativistic light-time correction.
#[derive(Clone, Debug, PartialEq)]
pub struct GravitatingBody {
    pub name: String,
    /// Position of the body in the inertial frame of the [Cosm] at the requested epoch
    pub position_km: Vector3<f64>,
    pub gm_km3_s2: f64,
    pub is_sun: bool,
}

/// The coordinate transformation and body constant service consumed by the measurement models.
pub trait Cosm: Send + Sync + fmt::Debug {
    /// Name of the central body
    fn name(&self) -> &str;

    /// Rotation from the inertial frame into the body fixed frame, with its time derivative.
    fn body_fixed_from_inertial(&self, epoch: Epoch) -> Dcm;

    fn equatorial_radius_km(&self) -> f64;

    fn flattening(&self) -> f64;

    fn gm_km3_s2(&self) -> f64;

    /// Bodies used in the relativistic range correction, defaults to the central body alone.
    fn gravitating_bodies(&self, _epoch: Epoch) -> Vec<GravitatingBody> {
        vec![GravitatingBody {
            name: self.name().to_string(),
            position_km: Vector3::zeros(),
            gm_km3_s2: self.gm_km3_s2(),
            is_sun: false,
        }]
    }
}

/// Whether a participant is fixed on the surface of the central body or is free flying.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParticipantKind {
    GroundFixed,
    Orbiting,
}

/// A participant in a measurement: ground station, relay, or spacecraft.
///
/// Participants are shared between measurement models and are never mutated by them.
pub trait SpacePoint: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Unique identifier of this participant, reported in the measurement records
    fn id(&self) -> &str;

    fn kind(&self) -> ParticipantKind;

    /// Native frame of this participant
    fn frame(&self) -> Frame;

    /// Inertial state of this participant at the requested epoch.
    fn state(&self, epoch: Epoch, cosm: &dyn Cosm) -> CosmResult<CartesianState>;

    /// State transition matrix from the reference epoch of this participant to the requested epoch, if it has one.
    fn stm(&self, _epoch: Epoch) -> CosmResult<Option<Matrix6<f64>>> {
        Ok(None)
    }

    /// Tracking hardware attached to this participant
    fn hardware(&self) -> &[Hardware] {
        &[]
    }

    /// Rotation from the inertial frame to the local South-East-Zenith frame, for participants which have a local horizon.
    fn topocentric_dcm(&self, _epoch: Epoch, _cosm: &dyn Cosm) -> Option<Matrix3<f64>> {
        None
    }

    /// Minimum elevation for this participant to send or receive a signal, in degrees
    fn elevation_mask_deg(&self) -> f64 {
        0.0
    }

    /// Surface meteorological conditions, used by the troposphere model
    fn weather(&self) -> Option<Weather> {
        None
    }
}
