// Per-tick car state and the two-coefficient motion model

use log::info;

use crate::errors::HairpinError;
use crate::track::Track;

/// Number of initial ticks used to fit the motion model. The bot commands
/// full throttle for these ticks; the fit below relies on that.
pub const CALIBRATION_TICKS: u32 = 2;

/// One telemetry sample for one car on one tick.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CarPosition {
    pub name: String,
    pub color: String,
    /// Absolute heading angle reported by the server.
    pub angle: f64,
    pub piece_index: usize,
    /// Distance already covered inside the current piece.
    pub in_piece_distance: f64,
    pub start_lane: usize,
    /// Differs from `start_lane` only while a lane change is in progress.
    pub end_lane: usize,
}

/// Kinematic state of the controlled car.
///
/// Velocity is modeled as the first-order recurrence
/// `v' = decay * v + gain * thrust`, fitted once from the first two moving
/// ticks and fixed for the rest of the race. Speeds are expressed in
/// distance per tick; the tick period belongs to the server.
#[derive(Clone, Debug, Default)]
pub struct CarState {
    prev: Option<CarPosition>,
    prev_speed: f64,
    speed: f64,
    total_travel: f64,
    ticks: u32,
    gain: f64,
    decay: f64,
    switch_requested: bool,
    switching_lanes: bool,
}

impl CarState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one telemetry sample into the state.
    ///
    /// The very first sample is only recorded: it may sit mid-track rather
    /// than on the start line, and a bogus first delta would poison the
    /// speed series the calibration fit reads.
    pub fn update(&mut self, track: &Track, now: &CarPosition) -> Result<(), HairpinError> {
        let prev = match &self.prev {
            Some(prev) => prev,
            None => return Ok(()),
        };

        let travel = if now.piece_index == prev.piece_index {
            now.in_piece_distance - prev.in_piece_distance
        } else {
            // crossed into the next piece since the last tick; at most one
            // boundary can be crossed per tick
            let lane_offset = track.lane_offset(prev.start_lane)?;
            let last_remaining =
                track.piece(prev.piece_index).travel(lane_offset) - prev.in_piece_distance;
            last_remaining + now.in_piece_distance
        };
        self.speed = travel;
        self.total_travel += travel;

        if self.ticks == CALIBRATION_TICKS {
            self.estimate_coefficients();
        }
        Ok(())
    }

    /// One-shot fit from the speeds observed on ticks 1 and 2, assuming full
    /// throttle and a standing start (`v0 = 0`): the first speed is the raw
    /// gain, and the relative speed growth is the decay.
    fn estimate_coefficients(&mut self) {
        let v1 = self.prev_speed;
        let v2 = self.speed;
        if v1 <= 0.0 {
            // the car did not move during calibration; leave the sentinel
            // zeros in place rather than fit garbage
            return;
        }
        self.gain = v1;
        self.decay = (v2 - v1) / v1;
        info!(
            "motion model fitted: gain {:.4}, decay {:.4}, top speed {:.2}",
            self.gain,
            self.decay,
            self.top_speed()
        );
    }

    /// Commit the sample as the new previous state. Split out from `update`
    /// so the controllers can read current-tick speed and position before
    /// the state advances.
    pub fn end_tick(&mut self, now: CarPosition) {
        self.prev = Some(now);
        self.prev_speed = self.speed;
        self.ticks += 1;
    }

    /// Track the in-flight lane change: the request latch stays set from the
    /// moment a switch command goes out until a change that visibly started
    /// (start and end lanes diverged) has resolved again.
    pub fn note_lane_change(&mut self, now: &CarPosition) {
        if now.start_lane != now.end_lane {
            self.switching_lanes = true;
        } else if self.switching_lanes {
            self.switching_lanes = false;
            self.switch_requested = false;
        }
    }

    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn total_travel(&self) -> f64 {
        self.total_travel
    }

    pub fn gain(&self) -> f64 {
        self.gain
    }

    pub fn decay(&self) -> f64 {
        self.decay
    }

    pub fn switch_requested(&self) -> bool {
        self.switch_requested
    }

    pub fn request_switch(&mut self) {
        self.switch_requested = true;
    }

    /// Whether the calibration window has elapsed and produced usable
    /// coefficients.
    pub fn calibrated(&self) -> bool {
        self.ticks >= CALIBRATION_TICKS && self.gain > 0.0
    }

    /// Steady-state speed under sustained full throttle, the fixed point of
    /// the velocity recurrence.
    pub fn top_speed(&self) -> f64 {
        self.gain / (1.0 - self.decay)
    }

    /// Throttle needed to hold `target` speed on the next tick, saturated to
    /// the legal [0, 1] range.
    pub fn throttle_for_speed(&self, target: f64) -> f64 {
        if self.gain <= f64::EPSILON {
            return 0.0;
        }
        let throttle = (target - self.decay * self.speed) / self.gain;
        if !throttle.is_finite() {
            return 0.0;
        }
        throttle.clamp(0.0, 1.0)
    }

    /// Ticks of zero-throttle coasting needed to fall from `current` to
    /// `target` speed. `None` means the model cannot shed the speed at all,
    /// which happens with a degenerate decay from a noisy fit.
    pub fn ticks_to_slow_down(&self, current: f64, target: f64) -> Option<u32> {
        if target >= current {
            return Some(0);
        }
        if self.decay <= 0.0 || self.decay >= 1.0 {
            return None;
        }
        let ticks = ((target / current).ln() / self.decay.ln()).ceil();
        if !ticks.is_finite() || ticks < 0.0 {
            return None;
        }
        Some(ticks as u32)
    }

    /// Distance covered while coasting under pure decay for `ticks` ticks,
    /// the sum of the first terms of the geometric speed series.
    pub fn braking_distance(&self, start_speed: f64, ticks: u32) -> f64 {
        (1.0 - self.decay.powi(ticks as i32)) / (1.0 - self.decay) * start_speed
    }
}
