pub mod service;

pub use service::{NewSensor, SensorError, SensorPatch, SensorService};
