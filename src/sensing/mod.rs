pub mod controller;
pub mod loop_worker;
pub mod source;

pub use controller::SensingController;
pub use source::{ObservationSource, ScriptStep, ScriptedSource, SimulatedFaces, SimulatedObjects};
