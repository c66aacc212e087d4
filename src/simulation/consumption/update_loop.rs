use tracing::trace;

use crate::simulation::consumption::engine::{
    compute_energy_delta, KinematicSnapshot, RecuperationRule,
};
use crate::simulation::consumption::ledger::EnergyLedger;
use crate::simulation::consumption::profile::VehicleProfile;
use crate::simulation::mobility::MobilityModel;

pub const DEFAULT_UPDATE_INTERVAL: f64 = 1.;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoopState {
    Uninitialized,
    Armed { next_fire: f64 },
    Stopped,
}

/// What the caller has to do after a loop was fired.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transition {
    /// The tick was booked. The loop wants to be fired again at `next_fire`.
    Rearm {
        delta_wh: f64,
        snapshot: KinematicSnapshot,
        next_fire: f64,
    },
    /// The loop is stopped and must not be scheduled again.
    Stop,
}

/// The recurring update of one vehicle's energy ledger.
///
/// A loop is armed once when the vehicle is admitted and is then fired by the scheduler every
/// `interval` seconds. Each firing samples the mobility model, computes the energy consumed since the
/// previous firing and books it. Once the scenario is finished, the next firing stops the loop.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateLoop {
    interval: f64,
    state: LoopState,
}

impl UpdateLoop {
    pub fn new(interval: f64) -> Self {
        UpdateLoop {
            interval: Self::normalize_interval(interval),
            state: LoopState::Uninitialized,
        }
    }

    /// Intervals which are not positive or not finite fall back to one second.
    pub fn normalize_interval(interval: f64) -> f64 {
        if interval > 0. && interval.is_finite() {
            interval
        } else {
            DEFAULT_UPDATE_INTERVAL
        }
    }

    /// Resets the ledger to the initial energy of the profile and arms the loop. With a `baseline`
    /// snapshot, a tick without elapsed time records the kinematic state at `now`, so that the first
    /// regular tick does not charge the vehicle for the speed it already has.
    ///
    /// Returns the time of the first firing.
    pub fn arm(
        &mut self,
        now: f64,
        profile: &VehicleProfile,
        ledger: &mut EnergyLedger,
        baseline: Option<&KinematicSnapshot>,
    ) -> f64 {
        assert_eq!(
            LoopState::Uninitialized,
            self.state,
            "An update loop can only be armed once."
        );

        *ledger = EnergyLedger::new(profile.initial_energy, now);
        if let Some(snapshot) = baseline {
            ledger.apply_tick(0., now, snapshot);
        }

        let next_fire = now + self.interval;
        self.state = LoopState::Armed { next_fire };
        next_fire
    }

    /// Executes one tick.
    ///
    /// # Panics
    /// If the loop was never armed.
    pub fn fire(
        &mut self,
        now: f64,
        finished: bool,
        mobility: &dyn MobilityModel,
        profile: &VehicleProfile,
        ledger: &mut EnergyLedger,
        recuperation: RecuperationRule,
    ) -> Transition {
        match self.state {
            LoopState::Uninitialized => panic!("Update loop was fired before it was armed."),
            LoopState::Stopped => Transition::Stop,
            LoopState::Armed { .. } if finished => {
                self.state = LoopState::Stopped;
                Transition::Stop
            }
            LoopState::Armed { .. } => {
                let snapshot = mobility.snapshot(now);
                let elapsed = ledger.elapsed_since(now);
                let delta_wh = compute_energy_delta(
                    profile,
                    &ledger.previous_state(),
                    &snapshot,
                    elapsed,
                    recuperation,
                );
                ledger.apply_tick(delta_wh, now, &snapshot);
                trace!("Tick at {now} after {elapsed}s consumed {delta_wh} Wh");

                let next_fire = now + self.interval;
                self.state = LoopState::Armed { next_fire };
                Transition::Rearm {
                    delta_wh,
                    snapshot,
                    next_fire,
                }
            }
        }
    }

    pub fn interval(&self) -> f64 {
        self.interval
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn is_stopped(&self) -> bool {
        self.state == LoopState::Stopped
    }
}
