use std::any::Any;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use crate::simulation::events::{EnergyEvent, EventsSubscriber};

#[derive(Debug, Serialize)]
struct TraceRow {
    time: f64,
    vehicle: u32,
    x: f64,
    y: f64,
    z: f64,
    speed: f64,
    energy_fraction: f64,
    remaining_wh: f64,
    consumed_wh: f64,
    total_consumed_wh: f64,
}

/// Writes one tab separated row per tick. Other events are not part of the trace.
pub struct CsvEnergyTraceWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl CsvEnergyTraceWriter<File> {
    pub fn from_file(path: &Path) -> Result<Self, csv::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        info!("Writing energy trace to {path:?}");
        Ok(Self::new(File::create(path)?))
    }
}

impl<W: Write> CsvEnergyTraceWriter<W> {
    pub fn new(writer: W) -> Self {
        let writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(writer);
        CsvEnergyTraceWriter { writer }
    }
}

impl<W: Write + 'static> EventsSubscriber for CsvEnergyTraceWriter<W> {
    fn receive_event(&mut self, time: f64, event: &EnergyEvent) {
        let EnergyEvent::Tick(tick) = event else {
            return;
        };
        let row = TraceRow {
            time,
            vehicle: tick.vehicle.node(),
            x: tick.position.x,
            y: tick.position.y,
            z: tick.position.z,
            speed: tick.speed,
            energy_fraction: tick.energy_fraction,
            remaining_wh: tick.remaining_wh,
            consumed_wh: tick.consumed_wh,
            total_consumed_wh: tick.total_consumed_wh,
        };
        if let Err(e) = self.writer.serialize(row) {
            warn!("Could not write energy trace row: {e}");
        }
    }

    fn finish(&mut self) {
        if let Err(e) = self.writer.flush() {
            warn!("Could not flush energy trace: {e}");
        }
    }

    fn as_any(&mut self) -> &mut dyn Any {
        self
    }
}
