pub mod app;

pub use app::{AppCommand, Application, SimulationReport, StatsReport};
