use std::any::Any;
use std::fmt::Debug;

use derive_builder::Builder;
use nohash_hasher::IntMap;
use serde::Serialize;
use tracing::{info, instrument};

use crate::simulation::id::VehicleId;
use crate::simulation::vector::Vector3;

/// State of one vehicle right after a tick of its update loop.
#[derive(Builder, Debug, Clone, PartialEq, Serialize)]
pub struct TickEvent {
    pub vehicle: VehicleId,
    pub position: Vector3,
    pub speed: f64,
    pub energy_fraction: f64,
    pub previous_remaining_wh: f64,
    pub remaining_wh: f64,
    pub consumed_wh: f64,
    pub total_consumed_wh: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum EnergyEvent {
    Admitted {
        vehicle: VehicleId,
        initial_energy_wh: f64,
    },
    Rejected {
        vehicle: VehicleId,
        reason: String,
    },
    Tick(TickEvent),
    Stopped {
        vehicle: VehicleId,
        remaining_wh: f64,
        total_consumed_wh: f64,
    },
}

pub trait EventsSubscriber {
    fn receive_event(&mut self, time: f64, event: &EnergyEvent);

    fn finish(&mut self) {}

    fn as_any(&mut self) -> &mut dyn Any;
}

impl Debug for dyn EventsSubscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EventsSubscriber")
    }
}

pub struct EventsLogger {}

impl EventsSubscriber for EventsLogger {
    fn receive_event(&mut self, time: f64, event: &EnergyEvent) {
        info!("{time}: {event:?}");
    }

    fn as_any(&mut self) -> &mut dyn Any {
        self
    }
}

/// EventsPublisher owns event subscribers. Subscribers are trait objects, hence they have to be passed
/// in a Box. On publish_event all subscribers' receive_event methods are called in the order they were
/// added.
#[derive(Default, Debug)]
pub struct EventsPublisher {
    handlers: Vec<Box<dyn EventsSubscriber>>,
}

impl EventsPublisher {
    pub fn new() -> Self {
        EventsPublisher {
            handlers: Vec::new(),
        }
    }

    pub fn add_subscriber(&mut self, handler: Box<dyn EventsSubscriber>) {
        self.handlers.push(handler);
    }

    pub fn publish_event(&mut self, time: f64, event: &EnergyEvent) {
        for handler in self.handlers.iter_mut() {
            handler.receive_event(time, event);
        }
    }

    #[instrument(skip_all, level = "trace")]
    pub fn finish(&mut self) {
        for handler in self.handlers.iter_mut() {
            handler.finish();
        }
    }

    pub fn get_subscriber<T: EventsSubscriber + 'static>(&mut self) -> Option<&mut T> {
        let mut result = None;
        for handler in self.handlers.iter_mut() {
            if let Some(collector) = handler.as_any().downcast_mut::<T>() {
                result = Some(collector)
            };
        }
        result
    }
}

/// Keeps all events in memory. Useful for tests and for the report at the end of a run.
#[derive(Default, Debug)]
pub struct EnergyCollector {
    ticks: IntMap<VehicleId, Vec<(f64, TickEvent)>>,
    admitted: Vec<VehicleId>,
    rejected: Vec<(VehicleId, String)>,
    stopped: IntMap<VehicleId, f64>,
}

impl EnergyCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ticks(&self, vehicle: &VehicleId) -> &[(f64, TickEvent)] {
        self.ticks.get(vehicle).map(|t| t.as_slice()).unwrap_or(&[])
    }

    pub fn admitted(&self) -> &[VehicleId] {
        &self.admitted
    }

    pub fn rejected(&self) -> &[(VehicleId, String)] {
        &self.rejected
    }

    /// Time at which the update loop of the vehicle was stopped.
    pub fn stop_time(&self, vehicle: &VehicleId) -> Option<f64> {
        self.stopped.get(vehicle).copied()
    }

    /// Sum of all tick deltas received for the vehicle.
    pub fn consumed_wh(&self, vehicle: &VehicleId) -> f64 {
        self.ticks(vehicle).iter().map(|(_, t)| t.consumed_wh).sum()
    }
}

impl EventsSubscriber for EnergyCollector {
    fn receive_event(&mut self, time: f64, event: &EnergyEvent) {
        match event {
            EnergyEvent::Admitted { vehicle, .. } => self.admitted.push(*vehicle),
            EnergyEvent::Rejected { vehicle, reason } => {
                self.rejected.push((*vehicle, reason.clone()))
            }
            EnergyEvent::Tick(tick) => self
                .ticks
                .entry(tick.vehicle)
                .or_default()
                .push((time, tick.clone())),
            EnergyEvent::Stopped { vehicle, .. } => {
                self.stopped.insert(*vehicle, time);
            }
        }
    }

    fn as_any(&mut self) -> &mut dyn Any {
        self
    }
}
