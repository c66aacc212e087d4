//! Reader for ns-2 movement traces as produced by BonnMotion or SUMO's traceExporter:
//!
//! ```text
//! $node_(0) set X_ 150.0
//! $node_(0) set Y_ 93.0
//! $node_(0) set Z_ 0.0
//! $ns_ at 2.0 "$node_(0) setdest 100.0 80.0 12.5"
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use itertools::Itertools;
use nohash_hasher::IntMap;
use tracing::{info, warn};

use crate::simulation::id::VehicleId;
use crate::simulation::mobility::waypoint::WaypointMobility;
use crate::simulation::mobility::{MobilityError, MobilityModel};
use crate::simulation::vector::Vector3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Axis {
    X,
    Y,
    Z,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Ns2Command {
    Set {
        node: VehicleId,
        axis: Axis,
        value: f64,
    },
    SetDest {
        node: VehicleId,
        x: f64,
        y: f64,
        speed: f64,
    },
}

impl Ns2Command {
    fn node(&self) -> VehicleId {
        match self {
            Ns2Command::Set { node, .. } => *node,
            Ns2Command::SetDest { node, .. } => *node,
        }
    }
}

/// One statement of a trace. Statements without time set the initial position of a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ns2Statement {
    pub time: Option<f64>,
    pub command: Ns2Command,
}

pub fn read_from_file(path: &Path) -> Result<IntMap<VehicleId, WaypointMobility>, MobilityError> {
    info!("ns2::read_from_file: Starting to read trace at: {path:?}");
    let to_error = |source| MobilityError::Io {
        path: path.display().to_string(),
        source,
    };
    let file = File::open(path).map_err(to_error)?;
    let buffered_reader = BufReader::new(file);

    if path.extension().is_some_and(|ext| ext.eq("gz")) {
        let decoder = flate2::read::GzDecoder::new(buffered_reader);
        read(BufReader::new(decoder)).map_err(to_error)
    } else {
        read(buffered_reader).map_err(to_error)
    }
}

pub fn read<R: BufRead>(reader: R) -> Result<IntMap<VehicleId, WaypointMobility>, std::io::Error> {
    let mut statements = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        match parse_line(&line) {
            Ok(Some(statement)) => statements.push(statement),
            Ok(None) => {}
            Err(e) => warn!("Skipping line {} of ns-2 trace: {e}", index + 1),
        }
    }
    Ok(build(statements))
}

/// Applies the statements in time order. Statements with equal time keep their order in the trace.
pub fn build(statements: Vec<Ns2Statement>) -> IntMap<VehicleId, WaypointMobility> {
    let mut result: IntMap<VehicleId, WaypointMobility> = IntMap::default();

    let (initial, timed): (Vec<_>, Vec<_>) = statements.into_iter().partition(|s| s.time.is_none());

    for statement in initial {
        let node = statement.command.node();
        let mobility = result
            .entry(node)
            .or_insert_with(|| WaypointMobility::new(Vector3::ZERO));
        match statement.command {
            Ns2Command::Set { axis, value, .. } => {
                let position = with_axis(mobility.position(0.), axis, value);
                mobility.set_initial_position(position);
            }
            Ns2Command::SetDest { .. } => {
                warn!("Ignoring setdest without time for node {node}");
            }
        }
    }

    for statement in timed
        .into_iter()
        .sorted_by(|a, b| a.time.unwrap_or(0.).total_cmp(&b.time.unwrap_or(0.)))
    {
        let time = statement.time.unwrap_or(0.);
        let node = statement.command.node();
        let mobility = result
            .entry(node)
            .or_insert_with(|| WaypointMobility::new(Vector3::ZERO));
        match statement.command {
            Ns2Command::Set { axis, value, .. } => {
                let position = with_axis(mobility.position(time), axis, value);
                mobility.set_position(time, position);
            }
            Ns2Command::SetDest { x, y, speed, .. } => {
                mobility.set_destination(time, (x, y), speed);
            }
        }
    }

    result
}

fn with_axis(position: Vector3, axis: Axis, value: f64) -> Vector3 {
    match axis {
        Axis::X => Vector3 { x: value, ..position },
        Axis::Y => Vector3 { y: value, ..position },
        Axis::Z => Vector3 { z: value, ..position },
    }
}

/// Parses a single line. Empty lines and comments yield None.
pub fn parse_line(line: &str) -> Result<Option<Ns2Statement>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let tokens: Vec<&str> = line
        .split_whitespace()
        .map(|t| t.trim_matches('"'))
        .filter(|t| !t.is_empty())
        .collect();

    if tokens.is_empty() {
        return Ok(None);
    }

    let (time, command_tokens) = if tokens[0] == "$ns_" {
        if tokens.len() < 3 || tokens[1] != "at" {
            return Err(format!("Expected '$ns_ at <time> ...', got '{line}'"));
        }
        let time = parse_number(tokens[2])?;
        (Some(time), &tokens[3..])
    } else {
        (None, &tokens[..])
    };

    let command = parse_command(command_tokens).map_err(|e| format!("{e} in '{line}'"))?;
    Ok(Some(Ns2Statement { time, command }))
}

fn parse_command(tokens: &[&str]) -> Result<Ns2Command, String> {
    let (node_token, rest) = tokens
        .split_first()
        .ok_or_else(|| String::from("Missing node"))?;
    let node = parse_node(node_token)?;

    match rest {
        ["set", axis, value] => {
            let axis = match *axis {
                "X_" => Axis::X,
                "Y_" => Axis::Y,
                "Z_" => Axis::Z,
                other => return Err(format!("Unknown axis {other}")),
            };
            Ok(Ns2Command::Set {
                node,
                axis,
                value: parse_number(value)?,
            })
        }
        ["setdest", x, y, speed] => Ok(Ns2Command::SetDest {
            node,
            x: parse_number(x)?,
            y: parse_number(y)?,
            speed: parse_number(speed)?,
        }),
        _ => Err(format!("Unsupported command {rest:?}")),
    }
}

fn parse_node(token: &str) -> Result<VehicleId, String> {
    token
        .strip_prefix("$node_(")
        .and_then(|t| t.strip_suffix(')'))
        .ok_or_else(|| format!("Expected '$node_(<id>)', got '{token}'"))?
        .parse::<VehicleId>()
        .map_err(|e| format!("Invalid node id '{token}': {e}"))
}

fn parse_number(token: &str) -> Result<f64, String> {
    let value = token
        .parse::<f64>()
        .map_err(|e| format!("Invalid number '{token}': {e}"))?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("Number '{token}' is not finite"))
    }
}
