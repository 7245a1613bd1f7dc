//! Meeting activity detection.
//!
//! Polls the desktop for windows belonging to known meeting applications and
//! reports edge-triggered start/end transitions, independent of recording
//! state. Detection never drives recording directly; it feeds the same
//! command channel as manual triggers.

mod monitor;
mod probe;
mod registry;

pub use monitor::MeetingActivityMonitor;
pub use probe::{ActivityProbe, SystemProbe, WindowInfo};
pub use registry::{default_registry, match_processes, match_windows, MeetingApp};
