use std::any::Any;
use std::cell::RefCell;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use ahash::HashMap;
use clap::Parser;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::simulation::consumption::engine::RecuperationRule;
use crate::simulation::consumption::update_loop::DEFAULT_UPDATE_INTERVAL;
use crate::simulation::io::resolve_path;
use crate::simulation::mobility::MobilityError;
use crate::simulation::vehicles::io::AttributesError;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct CommandLineArgs {
    #[arg(long, short)]
    pub config_path: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to open config file at {path:?}. Original error was {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config at {path:?}. Original error was: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("Config module '{0}' was not set.")]
    MissingModule(&'static str),
    #[error(transparent)]
    Mobility(#[from] MobilityError),
    #[error(transparent)]
    Attributes(#[from] AttributesError),
    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),
    #[error("Failed to write energy trace: {0}")]
    Trace(#[from] csv::Error),
    #[error("Failed to write summary: {0}")]
    Summary(#[from] serde_json::Error),
    #[error("Failed to write config: {0}")]
    WriteConfig(#[from] serde_yaml::Error),
}

#[derive(Serialize, Deserialize, Default)]
pub struct Config {
    modules: RefCell<HashMap<String, Box<dyn ConfigModule>>>,
    #[serde(skip)]
    context: Option<PathBuf>,
}

impl Config {
    pub fn from_file(args: &CommandLineArgs) -> Result<Self, ConfigError> {
        Self::from_path(Path::new(&args.config_path))
    }

    pub fn from_path(config_path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(config_path).map_err(|source| ConfigError::Open {
            path: config_path.to_path_buf(),
            source,
        })?;
        let mut config: Config =
            serde_yaml::from_reader(BufReader::new(file)).map_err(|source| {
                ConfigError::Parse {
                    path: config_path.to_path_buf(),
                    source,
                }
            })?;
        config.set_context(Some(config_path.to_path_buf()));
        Ok(config)
    }

    /// The config file this config was read from. Relative paths in the config are resolved against
    /// its directory.
    pub fn context(&self) -> &Option<PathBuf> {
        &self.context
    }

    pub fn set_context(&mut self, context: Option<PathBuf>) {
        self.context = context;
    }

    pub fn resolve(&self, file: &str) -> PathBuf {
        match &self.context {
            Some(context) => resolve_path(context, file),
            None => PathBuf::from(file),
        }
    }

    pub fn simulation(&self) -> Simulation {
        if let Some(simulation) = self.module::<Simulation>("simulation") {
            simulation
        } else {
            let default = Simulation::default();
            self.modules
                .borrow_mut()
                .insert("simulation".to_string(), Box::new(default.clone()));
            default
        }
    }

    pub fn set_simulation(&mut self, simulation: Simulation) {
        self.modules
            .get_mut()
            .insert("simulation".to_string(), Box::new(simulation));
    }

    pub fn consumption(&self) -> Result<Consumption, ConfigError> {
        self.module::<Consumption>("consumption")
            .ok_or(ConfigError::MissingModule("consumption"))
    }

    pub fn set_consumption(&mut self, consumption: Consumption) {
        self.modules
            .get_mut()
            .insert("consumption".to_string(), Box::new(consumption));
    }

    pub fn mobility(&self) -> Result<Mobility, ConfigError> {
        self.module::<Mobility>("mobility")
            .ok_or(ConfigError::MissingModule("mobility"))
    }

    pub fn set_mobility(&mut self, mobility: Mobility) {
        self.modules
            .get_mut()
            .insert("mobility".to_string(), Box::new(mobility));
    }

    pub fn output(&self) -> Output {
        if let Some(output) = self.module::<Output>("output") {
            output
        } else {
            let default = Output {
                output_dir: PathBuf::from("./"),
                logging: Logging::Info,
                write_events: WriteEvents::None,
            };
            self.modules
                .borrow_mut()
                .insert("output".to_string(), Box::new(default.clone()));
            default
        }
    }

    pub fn set_output(&mut self, output: Output) {
        self.modules
            .get_mut()
            .insert("output".to_string(), Box::new(output));
    }

    fn module<T: Clone + 'static>(&self, key: &str) -> Option<T> {
        self.modules
            .borrow()
            .get(key)
            .and_then(|boxed| boxed.as_ref().as_any().downcast_ref::<T>().cloned())
    }
}

pub fn write_config(config: &Config, output_dir: &Path) -> Result<(), ConfigError> {
    let output_config = output_dir.join("output_config.yml");
    info!("Writing config to {output_config:?}");
    let file = File::create(&output_config)?;
    serde_yaml::to_writer(BufWriter::new(file), config)?;
    Ok(())
}

/// Time span of the scenario in seconds.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Simulation {
    pub start_time: f64,
    pub end_time: f64,
}

impl Default for Simulation {
    fn default() -> Self {
        Self {
            start_time: 0.,
            end_time: 3600.,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Consumption {
    /// Vehicle attributes file, `.xml` or `.xml.gz`.
    pub vehicle_attributes: String,
    #[serde(default = "default_update_interval")]
    pub update_interval: f64,
    #[serde(default)]
    pub recuperation: RecuperationRule,
    /// Record the kinematic state at admission without booking energy.
    #[serde(default = "bool_value_true")]
    pub baseline: bool,
}

fn default_update_interval() -> f64 {
    DEFAULT_UPDATE_INTERVAL
}

fn bool_value_true() -> bool {
    true
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Mobility {
    pub source: MobilitySource,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum MobilitySource {
    /// ns-2 movement trace, plain or `.gz`.
    Ns2Trace { trace_file: String },
    RandomWaypoint(RandomWaypoint),
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RandomWaypoint {
    pub num_vehicles: u32,
    /// m
    pub width: f64,
    /// m
    pub height: f64,
    /// m/s
    pub min_speed: f64,
    /// m/s
    pub max_speed: f64,
    /// s
    #[serde(default)]
    pub pause_time: f64,
    #[serde(default)]
    pub seed: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Output {
    pub output_dir: PathBuf,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub write_events: WriteEvents,
}

/// Have this extra layer of log level enum, as tracing subscriber has no
/// off/none option by default. At least it can't be parsed
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub enum Logging {
    #[default]
    None,
    Info,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub enum WriteEvents {
    #[default]
    None,
    /// Tab separated energy trace, one row per tick.
    Csv,
    /// Every event is logged.
    Log,
}

#[typetag::serde(tag = "type")]
pub trait ConfigModule {
    fn as_any(&self) -> &dyn Any;
}

#[typetag::serde]
impl ConfigModule for Simulation {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[typetag::serde]
impl ConfigModule for Consumption {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[typetag::serde]
impl ConfigModule for Mobility {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[typetag::serde]
impl ConfigModule for Output {
    fn as_any(&self) -> &dyn Any {
        self
    }
}
