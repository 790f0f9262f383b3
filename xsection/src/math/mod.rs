mod nice;
mod steps;

pub use nice::{round_to_interval, Rounding};
pub(crate) use steps::steps;
