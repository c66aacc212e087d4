use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::simulation::config::Consumption;
use crate::simulation::consumption::engine::RecuperationRule;
use crate::simulation::consumption::profile::VehicleProfile;
use crate::simulation::consumption::update_loop::Transition;
use crate::simulation::events::{EnergyEvent, EventsPublisher, TickEventBuilder};
use crate::simulation::id::VehicleId;
use crate::simulation::mobility::Mobility;
use crate::simulation::scheduler::{EventScheduler, Scheduler};
use crate::simulation::vehicles::garage::{AdmissionError, ElectricVehicle, Garage};

const PROGRESS_LOG_INTERVAL: f64 = 600.;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConsumptionSettings {
    pub update_interval: f64,
    pub recuperation: RecuperationRule,
    pub baseline: bool,
}

impl Default for ConsumptionSettings {
    fn default() -> Self {
        ConsumptionSettings {
            update_interval: 1.,
            recuperation: RecuperationRule::default(),
            baseline: true,
        }
    }
}

impl From<&Consumption> for ConsumptionSettings {
    fn from(config: &Consumption) -> Self {
        ConsumptionSettings {
            update_interval: config.update_interval,
            recuperation: config.recuperation,
            baseline: config.baseline,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleSummary {
    pub vehicle: VehicleId,
    pub initial_energy_wh: f64,
    pub remaining_energy_wh: f64,
    pub total_energy_consumed_wh: f64,
    pub energy_fraction: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationSummary {
    pub start_time: f64,
    pub end_time: f64,
    pub vehicles: Vec<VehicleSummary>,
}

/// Runs the update loops of all admitted vehicles in virtual time. Vehicles are fired in time order,
/// vehicles due at the same time in the order they were scheduled.
pub struct Simulation {
    start_time: f64,
    scheduler: EventScheduler,
    mobility: Mobility,
    garage: Garage,
    events: EventsPublisher,
    settings: ConsumptionSettings,
}

impl Simulation {
    pub fn new(
        start_time: f64,
        end_time: f64,
        mobility: Mobility,
        settings: ConsumptionSettings,
        events: EventsPublisher,
    ) -> Self {
        Simulation {
            start_time,
            scheduler: EventScheduler::new(start_time, end_time),
            mobility,
            garage: Garage::new(),
            events,
            settings,
        }
    }

    /// Adds a vehicle and arms its update loop. A rejected vehicle is logged and published, but does
    /// not affect the other vehicles.
    pub fn admit(&mut self, id: VehicleId, profile: VehicleProfile) -> Result<(), AdmissionError> {
        let now = self.scheduler.now();
        match self.try_admit(id, profile, now) {
            Ok(()) => {
                debug!("Admitted vehicle {id} with {} Wh", profile.initial_energy);
                self.events.publish_event(
                    now,
                    &EnergyEvent::Admitted {
                        vehicle: id,
                        initial_energy_wh: profile.initial_energy,
                    },
                );
                Ok(())
            }
            Err(e) => {
                warn!("Rejecting vehicle {id}: {e}");
                self.events.publish_event(
                    now,
                    &EnergyEvent::Rejected {
                        vehicle: id,
                        reason: e.to_string(),
                    },
                );
                Err(e)
            }
        }
    }

    fn try_admit(
        &mut self,
        id: VehicleId,
        profile: VehicleProfile,
        now: f64,
    ) -> Result<(), AdmissionError> {
        profile
            .validate()
            .map_err(|source| AdmissionError::InvalidProfile {
                vehicle: id,
                source,
            })?;
        let model = self
            .mobility
            .get(&id)
            .ok_or(AdmissionError::NoMobility(id))?;
        if self.garage.contains(&id) {
            return Err(AdmissionError::Duplicate(id));
        }

        let mut vehicle = ElectricVehicle::new(id, profile, self.settings.update_interval);
        let baseline = self.settings.baseline.then(|| model.snapshot(now));
        let next_fire = vehicle.arm(now, baseline.as_ref());
        self.garage.add(vehicle)?;
        self.scheduler.schedule_after(next_fire - now, id);
        Ok(())
    }

    #[instrument(skip_all, level = "info")]
    pub fn run(&mut self) {
        info!(
            "Starting simulation with {} vehicles. Start time {}, End time {}",
            self.garage.len(),
            self.start_time,
            self.scheduler.end_time()
        );

        let mut next_progress_log = self.start_time;
        while let Some(firing) = self.scheduler.next_firing() {
            if firing.time >= next_progress_log {
                info!(
                    "Simulation at {}s. {} firings pending",
                    firing.time,
                    self.scheduler.pending()
                );
                next_progress_log = firing.time + PROGRESS_LOG_INTERVAL;
            }
            let finished = self.scheduler.is_finished();
            self.fire(firing.vehicle, firing.time, finished);
        }

        // maybe this belongs into the controller? Then this would have to be a &mut instead of owned.
        self.events.finish();
        info!("Simulation finished.");
    }

    fn fire(&mut self, id: VehicleId, now: f64, finished: bool) {
        let (Some(vehicle), Some(model)) = (self.garage.get_mut(&id), self.mobility.get(&id)) else {
            warn!("Firing for unknown vehicle {id} is ignored.");
            return;
        };

        let previous_remaining_wh = vehicle.ledger().remaining_energy_wh();
        match vehicle.fire(now, finished, model, self.settings.recuperation) {
            Transition::Rearm {
                delta_wh,
                snapshot,
                next_fire,
            } => {
                let ledger = vehicle.ledger();
                let tick = TickEventBuilder::default()
                    .vehicle(id)
                    .position(snapshot.position)
                    .speed(snapshot.speed())
                    .energy_fraction(vehicle.energy_fraction())
                    .previous_remaining_wh(previous_remaining_wh)
                    .remaining_wh(ledger.remaining_energy_wh())
                    .consumed_wh(delta_wh)
                    .total_consumed_wh(ledger.total_energy_consumed_wh())
                    .build()
                    .expect("All fields of the tick event are set.");
                self.events.publish_event(now, &EnergyEvent::Tick(tick));
                self.scheduler.schedule_after(next_fire - now, id);
            }
            Transition::Stop => {
                let ledger = vehicle.ledger();
                self.events.publish_event(
                    now,
                    &EnergyEvent::Stopped {
                        vehicle: id,
                        remaining_wh: ledger.remaining_energy_wh(),
                        total_consumed_wh: ledger.total_energy_consumed_wh(),
                    },
                );
            }
        }
    }

    pub fn summary(&self) -> SimulationSummary {
        let vehicles = self
            .garage
            .vehicles()
            .map(|vehicle| VehicleSummary {
                vehicle: vehicle.id(),
                initial_energy_wh: vehicle.profile().initial_energy,
                remaining_energy_wh: vehicle.ledger().remaining_energy_wh(),
                total_energy_consumed_wh: vehicle.ledger().total_energy_consumed_wh(),
                energy_fraction: vehicle.energy_fraction(),
            })
            .collect();
        SimulationSummary {
            start_time: self.start_time,
            end_time: self.scheduler.end_time(),
            vehicles,
        }
    }

    pub fn garage(&self) -> &Garage {
        &self.garage
    }

    pub fn events_mut(&mut self) -> &mut EventsPublisher {
        &mut self.events
    }
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;

    use crate::simulation::consumption::engine::{JOULES_PER_WH, STANDARD_GRAVITY};
    use crate::simulation::consumption::profile::{VehicleProfile, VehicleProfileBuilder};
    use crate::simulation::events::{EnergyCollector, EventsPublisher};
    use crate::simulation::id::VehicleId;
    use crate::simulation::mobility::waypoint::WaypointMobility;
    use crate::simulation::mobility::Mobility;
    use crate::simulation::simulation::{ConsumptionSettings, Simulation};
    use crate::simulation::vehicles::garage::AdmissionError;
    use crate::simulation::vector::Vector3;

    fn profile() -> VehicleProfile {
        VehicleProfileBuilder::default()
            .vehicle_mass(1000.)
            .roll_drag_coefficient(0.01)
            .propulsion_efficiency(1.)
            .recuperation_efficiency(1.)
            .maximum_battery_capacity(100.)
            .initial_energy(100.)
            .build()
            .unwrap()
    }

    fn simulation(end_time: f64) -> Simulation {
        let mut mobility = Mobility::new();

        // 8 m/s along the x axis for the whole scenario
        let mut driving = WaypointMobility::new(Vector3::ZERO);
        driving.set_destination(0., (4096., 0.), 8.);
        mobility.add_model(VehicleId::new(0), Box::new(driving));

        mobility.add_model(
            VehicleId::new(1),
            Box::new(WaypointMobility::new(Vector3::new(5., 5., 0.))),
        );

        let mut events = EventsPublisher::new();
        events.add_subscriber(Box::new(EnergyCollector::new()));

        Simulation::new(
            0.,
            end_time,
            mobility,
            ConsumptionSettings::default(),
            events,
        )
    }

    #[test]
    fn run_until_end_time() {
        let mut simulation = simulation(10.);
        simulation.admit(VehicleId::new(0), profile()).unwrap();
        simulation.run();

        let vehicle = simulation.garage().get(&VehicleId::new(0)).unwrap();
        assert!(vehicle.update_loop().is_stopped());

        let expected_per_tick = 0.01 * STANDARD_GRAVITY * 1000. * 8. / JOULES_PER_WH;
        let ledger = vehicle.ledger();
        assert_approx_eq!(9. * expected_per_tick, ledger.total_energy_consumed_wh());
        assert_approx_eq!(100. - 9. * expected_per_tick, ledger.remaining_energy_wh());
        assert_eq!(9., ledger.last_update_time());

        let collector = simulation
            .events_mut()
            .get_subscriber::<EnergyCollector>()
            .unwrap();
        let ticks = collector.ticks(&VehicleId::new(0));
        assert_eq!(9, ticks.len());
        assert_eq!(1., ticks[0].0);
        assert_eq!(9., ticks[8].0);
        assert_eq!(Vector3::new(72., 0., 0.), ticks[8].1.position);
        assert_eq!(Some(10.), collector.stop_time(&VehicleId::new(0)));
        assert_approx_eq!(
            9. * expected_per_tick,
            collector.consumed_wh(&VehicleId::new(0))
        );
    }

    #[test]
    fn standing_vehicle_consumes_nothing() {
        let mut simulation = simulation(5.);
        simulation.admit(VehicleId::new(1), profile()).unwrap();
        simulation.run();

        let summary = simulation.summary();
        assert_eq!(1, summary.vehicles.len());
        assert_eq!(0., summary.vehicles[0].total_energy_consumed_wh);
        assert_eq!(1., summary.vehicles[0].energy_fraction);
    }

    #[test]
    fn rejected_vehicles_do_not_run() {
        let mut simulation = simulation(5.);

        let invalid = VehicleProfile {
            maximum_battery_capacity: 0.,
            ..profile()
        };
        assert!(matches!(
            simulation.admit(VehicleId::new(0), invalid),
            Err(AdmissionError::InvalidProfile { .. })
        ));
        assert_eq!(
            Err(AdmissionError::NoMobility(VehicleId::new(7))),
            simulation.admit(VehicleId::new(7), profile())
        );
        simulation.admit(VehicleId::new(1), profile()).unwrap();
        assert_eq!(
            Err(AdmissionError::Duplicate(VehicleId::new(1))),
            simulation.admit(VehicleId::new(1), profile())
        );

        simulation.run();

        assert_eq!(1, simulation.garage().len());
        let collector = simulation
            .events_mut()
            .get_subscriber::<EnergyCollector>()
            .unwrap();
        assert_eq!(&[VehicleId::new(1)], collector.admitted());
        assert_eq!(3, collector.rejected().len());
        assert!(collector.ticks(&VehicleId::new(0)).is_empty());
    }

    #[test]
    fn interleaves_vehicles() {
        let mut simulation = simulation(3.);
        simulation.admit(VehicleId::new(1), profile()).unwrap();
        simulation.admit(VehicleId::new(0), profile()).unwrap();
        simulation.run();

        let collector = simulation
            .events_mut()
            .get_subscriber::<EnergyCollector>()
            .unwrap();
        assert_eq!(2, collector.ticks(&VehicleId::new(0)).len());
        assert_eq!(2, collector.ticks(&VehicleId::new(1)).len());
        assert_eq!(Some(3.), collector.stop_time(&VehicleId::new(0)));
        assert_eq!(Some(3.), collector.stop_time(&VehicleId::new(1)));
    }
}
