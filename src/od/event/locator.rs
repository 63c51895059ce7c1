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

use super::{EventStatus, LightTimeEvent};
use crate::cosmic::Cosm;
use crate::od::MeasurementError;
use crate::time::Epoch;

/// A measurement made of chained light-time events, stored in the order in which they must be solved.
pub trait EventChain {
    fn event_count(&self) -> usize;

    fn event_mut(&mut self, index: usize) -> Result<&mut LightTimeEvent, MeasurementError>;

    /// Feeds the solution of the event at `index` into the fixed time step of the events which depend on it.
    fn set_event_data(&mut self, index: usize) -> Result<(), MeasurementError>;
}

/// Solves every event of the chain in order, feeding each solution to the next event.
///
/// Returns `Ok(false)` as soon as one event does not converge.
pub fn locate_events<C: EventChain + ?Sized>(
    chain: &mut C,
    epoch: Epoch,
    cosm: &dyn Cosm,
) -> Result<bool, MeasurementError> {
    for index in 0..chain.event_count() {
        let event = chain.event_mut(index)?;
        let status = event.solve(epoch, cosm)?;
        if status != EventStatus::Converged {
            debug!("{} is {status} at {epoch}", event.name());
            return Ok(false);
        }
        chain.set_event_data(index)?;
    }
    Ok(true)
}
