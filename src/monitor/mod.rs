pub mod controller;
pub mod face;
pub mod objects;
pub mod replay;

pub use controller::MonitorController;
pub use face::{FaceOutcome, FaceProcessor};
pub use objects::ObjectProcessor;
pub use replay::{read_records, SessionReplay};
