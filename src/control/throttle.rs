// Look-ahead throttle control

use crate::car::{CALIBRATION_TICKS, CarPosition, CarState};
use crate::errors::HairpinError;
use crate::track::{Piece, Track};

/// Scale between the square root of a bend radius and the speed the car can
/// carry through it.
pub(crate) const BEND_SPEED_FACTOR: f64 = 0.6;

/// Speed the car can hold through a bend of the given radius. Wider bends
/// tolerate more speed.
fn bend_speed_limit(radius: f64) -> f64 {
    BEND_SPEED_FACTOR * radius.sqrt()
}

/// Throttle for the current tick.
///
/// During the calibration window the throttle is pinned to 1.0; the motion
/// model fit assumes full thrust on those ticks. Afterwards every bend on
/// the upcoming lap is checked: inside a bend the car holds its speed limit,
/// ahead of one it compares the track distance left before the bend against
/// the distance needed to coast down to the limit, and goes all-out or
/// brakes now. There is no partial braking. The most restrictive bend wins;
/// straights never constrain the throttle.
pub fn compute_throttle(
    car: &CarState,
    track: &Track,
    now: &CarPosition,
) -> Result<f64, HairpinError> {
    if car.ticks() < CALIBRATION_TICKS {
        return Ok(1.0);
    }

    let mut throttle = 1.0_f64;
    for ahead in 0..track.piece_count() {
        let index = (now.piece_index + ahead) % track.piece_count();
        let Piece::Bend { radius, .. } = *track.piece(index) else {
            continue;
        };
        let limit = bend_speed_limit(radius);
        let candidate = if ahead == 0 {
            // already inside this bend, hold its limit
            car.throttle_for_speed(limit)
        } else {
            let distance = distance_to_piece(track, now, index)?;
            match car.ticks_to_slow_down(car.speed(), limit) {
                Some(ticks) if distance > car.braking_distance(car.speed(), ticks) => 1.0,
                // brake-now policy; a degenerate model counts as "cannot
                // slow down in time"
                _ => 0.0,
            }
        };
        throttle = throttle.min(candidate);
    }
    Ok(throttle)
}

/// Track distance from the car's position to the start of the target piece,
/// holding the current lane.
fn distance_to_piece(
    track: &Track,
    now: &CarPosition,
    target: usize,
) -> Result<f64, HairpinError> {
    if now.piece_index == target {
        return Ok(0.0);
    }

    let lane_offset = track.lane_offset(now.start_lane)?;
    let mut distance = track.piece(now.piece_index).travel(lane_offset) - now.in_piece_distance;
    let mut index = track.next_index(now.piece_index);
    while index != target {
        distance += track.piece(index).travel(lane_offset);
        index = track.next_index(index);
    }
    Ok(distance)
}
