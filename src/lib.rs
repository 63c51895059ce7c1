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

/*! # nyx-space-tracking

Light-time corrected tracking measurement models for orbit determination: two-way range (USN, DSN, TDRSS relay),
optical azimuth/elevation, and the partial derivatives of each observable with respect to the solve-for parameters.

Refer to [nyxspace.com](https://nyxspace.com) for a user guide and the MathSpec.
*/

/// Provides the frames, the central body service, and the participants (space points) of a measurement.
pub mod cosmic;

/// Utility functions shared by different modules, and which may be useful to engineers.
pub mod utils;

/// All the input/output needs for this library, namely the YAML configuration handling.
pub mod io;

/// All of the measurement modeling, light-time correction and sensitivity tools.
pub mod od;

#[macro_use]
extern crate log;
extern crate hifitime;
extern crate nalgebra as na;

/// Re-export of hifitime
pub mod time {
    pub use hifitime::*;
}

/// Re-export nalgebra
pub mod linalg {
    pub use na::base::*;
}

/// Re-export some useful things
pub use self::cosmic::{CartesianState, Cosm, SpacePoint};
