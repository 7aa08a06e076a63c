pub mod clock;
pub mod controller;
pub mod state;

pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::FastTimer;
pub use state::{FastProgress, FastState, FastStatus};
