pub mod config;
pub mod consumption;
pub mod controller;
pub mod events;
pub mod id;
pub mod io;
pub mod logging;
pub mod mobility;
pub mod random;
pub mod scheduler;
#[allow(clippy::module_inception)]
pub mod simulation;
pub mod time_queue;
pub mod vector;
pub mod vehicles;
