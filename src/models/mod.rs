pub mod event;
pub mod observation;
pub mod session;

pub use event::{Event, EventKind};
pub use observation::{Detection, FaceObservation, ObjectObservation, ObservationRecord};
pub use session::Session;
