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

use super::{CartesianState, Cosm, CosmError, CosmResult, Frame, ParticipantKind, SpacePoint};
use crate::linalg::{Matrix6, Vector3, Vector6, U6, U7};
use crate::od::hardware::Hardware;
use crate::time::Epoch;
use hyperdual::linalg::norm;
use hyperdual::{extract_jacobian_and_result_owned, hyperspace_from_vector, Float, OHyperdual};
use std::fmt;

const KEPLER_MAX_ITER: usize = 50;
const KEPLER_TOL_RAD: f64 = 1e-14;

/// A spacecraft whose ephemeris is the two-body (Keplerian) flow of a reference state.
///
/// The state transition matrix is the exact derivative of that same flow w.r.t. the reference state.
#[derive(Clone, Debug)]
pub struct KeplerianSpacecraft {
    pub name: String,
    pub id: String,
    pub hardware: Vec<Hardware>,
    reference: CartesianState,
    gm_km3_s2: f64,
}

impl KeplerianSpacecraft {
    /// Initializes a new spacecraft from its reference state and the gravitational parameter of the central body.
    /// Returns an error if the reference state is not on an elliptical orbit.
    pub fn try_new(name: &str, reference: CartesianState, gm_km3_s2: f64) -> CosmResult<Self> {
        let energy_km2_s2 =
            reference.velocity_km_s.norm_squared() / 2.0 - gm_km3_s2 / reference.rmag_km();
        if energy_km2_s2 >= 0.0 || !energy_km2_s2.is_finite() {
            return Err(CosmError::NotElliptic {
                name: name.to_string(),
                energy_km2_s2,
            });
        }

        Ok(Self {
            name: name.to_string(),
            id: name.to_string(),
            hardware: Vec::new(),
            reference,
            gm_km3_s2,
        })
    }

    /// Initializes a spacecraft on a circular orbit of the provided radius, inclination and argument of latitude at the reference epoch.
    pub fn circular(
        name: &str,
        epoch: Epoch,
        radius_km: f64,
        inclination_deg: f64,
        raan_deg: f64,
        arg_latitude_deg: f64,
        gm_km3_s2: f64,
    ) -> CosmResult<Self> {
        let (sin_u, cos_u) = arg_latitude_deg.to_radians().sin_cos();
        let (sin_i, cos_i) = inclination_deg.to_radians().sin_cos();
        let (sin_o, cos_o) = raan_deg.to_radians().sin_cos();
        let vmag = (gm_km3_s2 / radius_km).sqrt();

        // Radial and along-track unit vectors
        let radial = Vector3::new(
            cos_o * cos_u - sin_o * sin_u * cos_i,
            sin_o * cos_u + cos_o * sin_u * cos_i,
            sin_u * sin_i,
        );
        let along = Vector3::new(
            -cos_o * sin_u - sin_o * cos_u * cos_i,
            -sin_o * sin_u + cos_o * cos_u * cos_i,
            cos_u * sin_i,
        );

        Self::try_new(
            name,
            CartesianState::new(epoch, radial * radius_km, along * vmag),
            gm_km3_s2,
        )
    }

    /// Returns a copy of this spacecraft with the provided identifier.
    pub fn with_id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }

    /// Returns a copy of this spacecraft with the provided hardware added.
    pub fn with_hardware(mut self, hardware: Hardware) -> Self {
        self.hardware.push(hardware);
        self
    }

    pub fn reference(&self) -> CartesianState {
        self.reference
    }

    pub fn gm_km3_s2(&self) -> f64 {
        self.gm_km3_s2
    }

    /// Propagates the reference state to the requested epoch.
    pub fn propagate(&self, epoch: Epoch) -> CosmResult<CartesianState> {
        let dt_s = (epoch - self.reference.epoch).to_seconds();
        let (position_km, velocity_km_s) = self.flow(
            &self.reference.position_km,
            &self.reference.velocity_km_s,
            dt_s,
            epoch,
        )?;
        Ok(CartesianState::new(epoch, position_km, velocity_km_s))
    }

    /// Two-body flow using the f and g functions, with Kepler's equation in eccentric anomaly difference form.
    fn flow(
        &self,
        r0: &Vector3<f64>,
        v0: &Vector3<f64>,
        dt_s: f64,
        epoch: Epoch,
    ) -> CosmResult<(Vector3<f64>, Vector3<f64>)> {
        if dt_s == 0.0 {
            return Ok((*r0, *v0));
        }

        let mu = self.gm_km3_s2;
        let r0mag = r0.norm();
        let sma = self.semi_major_axis(2.0 / r0mag - v0.norm_squared() / mu)?;
        let sqrt_a = sma.sqrt();
        let sigma0 = r0.dot(v0) / mu.sqrt();
        let mean_anomaly = (mu / sma.powi(3)).sqrt() * dt_s;
        let delta_e = self.kepler(sigma0 / sqrt_a, 1.0 - r0mag / sma, mean_anomaly, epoch)?;

        let (sin_de, cos_de) = delta_e.sin_cos();
        let rmag = sma + (r0mag - sma) * cos_de + sigma0 * sqrt_a * sin_de;
        let f = 1.0 - sma / r0mag * (1.0 - cos_de);
        let g = sma * sigma0 / mu.sqrt() * (1.0 - cos_de) + r0mag * (sma / mu).sqrt() * sin_de;
        let f_dot = -(mu * sma).sqrt() / (rmag * r0mag) * sin_de;
        let g_dot = 1.0 - sma / rmag * (1.0 - cos_de);

        Ok((f * r0 + g * v0, f_dot * r0 + g_dot * v0))
    }

    /// Semi major axis from its inverse, which must be positive on an elliptical orbit.
    fn semi_major_axis(&self, inv_sma: f64) -> CosmResult<f64> {
        if inv_sma > 0.0 {
            Ok(1.0 / inv_sma)
        } else {
            Err(CosmError::NotElliptic {
                name: self.name.clone(),
                energy_km2_s2: -self.gm_km3_s2 * inv_sma / 2.0,
            })
        }
    }

    /// Solves Kepler's equation for the change in eccentric anomaly with Newton's method.
    fn kepler(&self, a_coeff: f64, b_coeff: f64, mean_anomaly: f64, epoch: Epoch) -> CosmResult<f64> {
        let mut delta_e = mean_anomaly;
        for _ in 0..KEPLER_MAX_ITER {
            let (sin_de, cos_de) = delta_e.sin_cos();
            let f_val = delta_e + a_coeff * (1.0 - cos_de) - b_coeff * sin_de - mean_anomaly;
            let f_prime = 1.0 + a_coeff * sin_de - b_coeff * cos_de;
            let step = f_val / f_prime;
            delta_e -= step;
            if step.abs() < KEPLER_TOL_RAD * (1.0 + delta_e.abs()) {
                return Ok(delta_e);
            }
        }

        Err(CosmError::KeplerDiverged {
            name: self.name.clone(),
            iterations: KEPLER_MAX_ITER,
            epoch,
        })
    }

    /// Computes the state transition matrix from the reference epoch to the provided epoch.
    ///
    /// The f and g flow is evaluated in hyperdual space, so the partials are exact to machine precision.
    pub fn stm_at(&self, epoch: Epoch) -> CosmResult<Matrix6<f64>> {
        let dt_s = (epoch - self.reference.epoch).to_seconds();
        if dt_s == 0.0 {
            return Ok(Matrix6::identity());
        }

        let x0 = Vector6::new(
            self.reference.position_km.x,
            self.reference.position_km.y,
            self.reference.position_km.z,
            self.reference.velocity_km_s.x,
            self.reference.velocity_km_s.y,
            self.reference.velocity_km_s.z,
        );
        let state: Vector6<OHyperdual<f64, U7>> = hyperspace_from_vector(&x0);
        let r0 = state.fixed_rows::<3>(0).into_owned();
        let v0 = state.fixed_rows::<3>(3).into_owned();

        let one = OHyperdual::<f64, U7>::from(1.0);
        let mu = OHyperdual::<f64, U7>::from(self.gm_km3_s2);
        let r0mag = norm(&r0);
        let inv_sma = OHyperdual::<f64, U7>::from(2.0) / r0mag - v0.dot(&v0) / mu;
        self.semi_major_axis(inv_sma.real())?;
        let sma = one / inv_sma;
        let sqrt_a = sma.sqrt();
        let sigma0 = r0.dot(&v0) / mu.sqrt();
        let mean_anomaly = (mu / sma.powi(3)).sqrt() * OHyperdual::from(dt_s);
        let a_coeff = sigma0 / sqrt_a;
        let b_coeff = one - r0mag / sma;

        // Newton step from the real root: its dual part is the sensitivity of the root to the initial state.
        let root = OHyperdual::<f64, U7>::from(self.kepler(
            a_coeff.real(),
            b_coeff.real(),
            mean_anomaly.real(),
            epoch,
        )?);
        let residual =
            root + a_coeff * (one - root.cos()) - b_coeff * root.sin() - mean_anomaly;
        let slope = one + a_coeff * root.sin() - b_coeff * root.cos();
        let delta_e = root - residual / slope;

        let (sin_de, cos_de) = (delta_e.sin(), delta_e.cos());
        let rmag = sma + (r0mag - sma) * cos_de + sigma0 * sqrt_a * sin_de;
        let f = one - sma / r0mag * (one - cos_de);
        let g = sma * sigma0 / mu.sqrt() * (one - cos_de) + r0mag * (sma / mu).sqrt() * sin_de;
        let f_dot = -(mu * sma).sqrt() / (rmag * r0mag) * sin_de;
        let g_dot = one - sma / rmag * (one - cos_de);

        let state_dt: Vector6<OHyperdual<f64, U7>> = Vector6::from_fn(|i, _| {
            if i < 3 {
                f * r0[i] + g * v0[i]
            } else {
                f_dot * r0[i - 3] + g_dot * v0[i - 3]
            }
        });
        let (_, stm) = extract_jacobian_and_result_owned::<_, U6, U6, _>(&state_dt);

        Ok(stm)
    }
}

impl SpacePoint for KeplerianSpacecraft {
    fn name(&self) -> &str {
        &self.name
    }

    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> ParticipantKind {
        ParticipantKind::Orbiting
    }

    fn frame(&self) -> Frame {
        Frame::Inertial
    }

    fn state(&self, epoch: Epoch, _cosm: &dyn Cosm) -> CosmResult<CartesianState> {
        self.propagate(epoch)
    }

    fn stm(&self, epoch: Epoch) -> CosmResult<Option<Matrix6<f64>>> {
        self.stm_at(epoch).map(Some)
    }

    fn hardware(&self) -> &[Hardware] {
        &self.hardware
    }
}

impl fmt::Display for KeplerianSpacecraft {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({}) from {}", self.name, self.id, self.reference)
    }
}
