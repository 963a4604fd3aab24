//! The polling side of the monitor: which targets exist, how one is probed,
//! how a probe is judged, and the loop that drives it all.

pub mod classifier;
pub mod probe;
pub mod scheduler;
pub mod state;
pub mod targets;
