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

use super::{Cosm, Dcm, GravitatingBody};
use crate::linalg::Vector3;
use crate::time::{Epoch, Unit};
use crate::utils::{r1, r3, r3_dot};
use serde_derive::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Astronomical unit in km
pub const AU_KM: f64 = 149_597_870.7;
/// Gravitational parameter of the Sun in km^3/s^2
pub const SUN_GM_KM3_S2: f64 = 132_712_440_041.939_4;

/// Returns the J2000 reference epoch (2000 JAN 01 12:00:00 UTC)
pub fn j2000_epoch() -> Epoch {
    Epoch::from_gregorian_utc_hms(2000, 1, 1, 12, 0, 0)
}

/// An analytic central body: a rigid ellipsoid rotating at a constant rate about its Z axis.
///
/// This is the [Cosm] used throughout the measurement models when no higher fidelity ephemeris service is available.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CentralBody {
    pub name: String,
    pub equatorial_radius_km: f64,
    pub flattening: f64,
    pub gm_km3_s2: f64,
    /// Rotation angle of the prime meridian at the J2000 epoch, in radians
    pub rotation_at_j2000_rad: f64,
    /// Constant rotation rate about the Z axis, in rad/s
    pub rotation_rate_rad_s: f64,
    /// Set to true to include the Sun, from a low precision analytical ephemeris, in the relativistic correction
    pub include_sun: bool,
}

impl CentralBody {
    /// The Earth, rotating per the IERS Earth Rotation Angle.
    pub fn earth() -> Self {
        Self {
            name: "Earth".to_string(),
            equatorial_radius_km: 6378.1363,
            flattening: 1.0 / 298.257223563,
            gm_km3_s2: 398_600.4415,
            rotation_at_j2000_rad: TAU * 0.779_057_273_264,
            rotation_rate_rad_s: TAU * 1.002_737_811_911_354_5 / 86_400.0,
            include_sun: false,
        }
    }

    /// Returns a copy of this body which also accounts for the Sun in the relativistic correction.
    pub fn with_sun(mut self) -> Self {
        self.include_sun = true;
        self
    }

    /// Rotation angle of the prime meridian at the provided epoch, in radians (bounded in [0, 2pi)).
    pub fn rotation_angle_rad(&self, epoch: Epoch) -> f64 {
        let seconds = (epoch - j2000_epoch()).to_seconds();
        (self.rotation_at_j2000_rad + self.rotation_rate_rad_s * seconds).rem_euclid(TAU)
    }

    /// Position of the Sun relative to this body from the low precision formulae of the Astronomical Almanac, in km.
    /// Only meaningful when this body is the Earth.
    pub fn sun_position_km(&self, epoch: Epoch) -> Vector3<f64> {
        let days = (epoch - j2000_epoch()).to_unit(Unit::Day);
        let mean_long_deg = 280.460 + 0.985_647_4 * days;
        let mean_anomaly = (357.528 + 0.985_600_3 * days).to_radians();
        let ecliptic_long = (mean_long_deg
            + 1.915 * mean_anomaly.sin()
            + 0.020 * (2.0 * mean_anomaly).sin())
        .to_radians();
        let obliquity = (23.439 - 0.000_000_4 * days).to_radians();
        let dist_au =
            1.000_14 - 0.016_71 * mean_anomaly.cos() - 0.000_14 * (2.0 * mean_anomaly).cos();

        let ecliptic = Vector3::new(ecliptic_long.cos(), ecliptic_long.sin(), 0.0) * dist_au * AU_KM;
        // Rotate from the ecliptic to the equator
        r1(-obliquity) * ecliptic
    }
}

impl Default for CentralBody {
    fn default() -> Self {
        Self::earth()
    }
}

impl Cosm for CentralBody {
    fn name(&self) -> &str {
        &self.name
    }

    fn body_fixed_from_inertial(&self, epoch: Epoch) -> Dcm {
        let angle = self.rotation_angle_rad(epoch);
        Dcm {
            rot_mat: r3(angle),
            rot_mat_dt: Some(r3_dot(angle, self.rotation_rate_rad_s)),
        }
    }

    fn equatorial_radius_km(&self) -> f64 {
        self.equatorial_radius_km
    }

    fn flattening(&self) -> f64 {
        self.flattening
    }

    fn gm_km3_s2(&self) -> f64 {
        self.gm_km3_s2
    }

    fn gravitating_bodies(&self, epoch: Epoch) -> Vec<GravitatingBody> {
        let mut bodies = vec![GravitatingBody {
            name: self.name.clone(),
            position_km: Vector3::zeros(),
            gm_km3_s2: self.gm_km3_s2,
            is_sun: false,
        }];
        if self.include_sun {
            bodies.push(GravitatingBody {
                name: "Sun".to_string(),
                position_km: self.sun_position_km(epoch),
                gm_km3_s2: SUN_GM_KM3_S2,
                is_sun: true,
            });
        }
        bodies
    }
}
