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

use super::{MediaCorrection, MediaCorrectionValue, MediaKind, SignalPath, Weather};
use crate::cosmic::{Cosm, SPEED_OF_LIGHT_M_S};

/// Hopfield-Saastamoinen troposphere model, driven by the surface weather of the ground station.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Troposphere;

impl Troposphere {
    /// Computes the range (m), elevation (rad) and time (s) corrections of a signal at the provided elevation.
    ///
    /// The range is in meters as is the wavelength, and the radius is that of the central body in meters.
    pub fn hopfield_saastamoinen(
        weather: &Weather,
        elevation_rad: f64,
        range_m: f64,
        wavelength_m: f64,
        radius_m: f64,
    ) -> MediaCorrectionValue {
        let lp2_inv = 1.0 / (wavelength_m * 1.0e6).powi(2);
        let denom = 173.3 - lp2_inv;
        let ce = (170.2649 / denom) * (78.8828 / 77.624);
        let crho = ce * (173.3 + lp2_inv) / denom;

        let p = weather.pressure_hpa;
        let t = weather.temperature_k;
        let fh = weather.humidity_pct / 100.0;
        let tc = t - 273.15;

        // Dry and wet refractivities at the surface
        let e = 6.10 * fh * (17.15 * tc / (234.7 + tc)).exp();
        let n = [77.624 * p / t, 371_900.0 * e / (t * t) - 12.92 * e / t];
        // Layer tops
        let h = [
            5.0 * 0.002277 * p / (n[0] * 1.0e-6),
            5.0 * 0.002277 * e * (1255.0 / t + 0.05) / (n[1] * 1.0e-6),
        ];

        let (sin_e, cos_e) = elevation_rad.sin_cos();
        let cos_e2 = cos_e * cos_e;

        let mut drho = 0.0;
        let mut d_e = 0.0;
        for j in 0..2 {
            if n[j] <= 0.0 {
                // Perfectly dry air has no wet layer
                continue;
            }
            let r = ((radius_m + h[j]).powi(2) - radius_m * radius_m * cos_e2).sqrt()
                - radius_m * sin_e;
            let a = -sin_e / h[j];
            let b = -cos_e2 / (2.0 * h[j] * radius_m);

            let alpha = [
                1.0,
                4.0 * a,
                6.0 * a * a + 4.0 * b,
                4.0 * a * (a * a + 3.0 * b),
                a.powi(4) + 12.0 * a * a * b + 6.0 * b * b,
                4.0 * a * b * (a * a + 3.0 * b),
                b * b * (6.0 * a * a + 4.0 * b),
                4.0 * a * b.powi(3),
                b.powi(4),
            ];
            let beta = [
                1.0,
                3.0 * a,
                3.0 * (a * a + b),
                a * (a * a + 6.0 * b),
                3.0 * b * (a * a + b),
                3.0 * a * b * b,
                b.powi(3),
            ];

            let sum1: f64 = alpha
                .iter()
                .enumerate()
                .map(|(i, alpha_i)| alpha_i * r.powi(i as i32 + 1) / (i as f64 + 1.0))
                .sum();

            let sum2: f64 = beta
                .iter()
                .enumerate()
                .map(|(k, beta_k)| {
                    let kk = k as f64;
                    beta_k * r.powi(k as i32 + 2) / ((kk + 1.0) * (kk + 2.0))
                        + beta_k * r.powi(k as i32 + 1) * (range_m - r) / (kk + 1.0)
                })
                .sum();

            drho += n[j] * 1.0e-6 * sum1;
            d_e += n[j] * 1.0e-6 * sum2 / h[j];
        }

        let range_m_corr = crho * drho;

        MediaCorrectionValue {
            range_m: range_m_corr,
            elevation_rad: ce * 4.0 * cos_e * d_e / range_m,
            delay_s: range_m_corr / SPEED_OF_LIGHT_M_S,
        }
    }
}

impl MediaCorrection for Troposphere {
    fn kind(&self) -> MediaKind {
        MediaKind::Troposphere
    }

    fn correction(&self, path: &SignalPath, cosm: &dyn Cosm) -> MediaCorrectionValue {
        let wavelength_m = SPEED_OF_LIGHT_M_S / (path.frequency_mhz * 1.0e6);
        Self::hopfield_saastamoinen(
            &path.weather,
            path.elevation_rad,
            path.range_km * 1.0e3,
            wavelength_m,
            cosm.equatorial_radius_km() * 1.0e3,
        )
    }
}
