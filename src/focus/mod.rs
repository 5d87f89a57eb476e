pub mod debouncer;
pub mod state;

pub use debouncer::{FocusDebouncer, FocusSignal, FocusUpdate, PendingFocusTimer, TimerCommand};
pub use state::FocusState;
