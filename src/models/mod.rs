pub mod measurement;
pub mod process;

pub use measurement::{FnMeasurement, LinearMeasurement, MeasurementModel, RangeBearing};
pub use process::{FnProcess, LinearProcess, ProcessModel};
