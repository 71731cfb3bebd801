// Driving decisions: throttle look-ahead and lane choice

pub(crate) mod lane;
pub(crate) mod throttle;

pub use lane::decide_lane_change;
pub use throttle::compute_throttle;

/// Direction of a lane switch request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwitchDirection {
    Left,
    Right,
}
