// Lane choice ahead of the next switch opportunity

use crate::car::CarPosition;
use crate::control::SwitchDirection;
use crate::errors::HairpinError;
use crate::track::Track;

/// Decide whether to request a lane change at the next switch piece.
///
/// The stretch between the next switch piece and the one after it is where a
/// change taken now pays off. Bends inside that window are summed at the
/// lane immediately to the left and to the right of the current one (ids
/// clamped to the valid range); the strictly shorter side wins. A window
/// with no switch piece or no bend yields nothing, and so does already
/// holding the extreme lane offset on the winning side.
pub fn decide_lane_change(
    track: &Track,
    now: &CarPosition,
) -> Result<Option<SwitchDirection>, HairpinError> {
    let count = track.piece_count();

    // next switch piece strictly ahead of the car
    let Some(first) = (1..=count)
        .map(|ahead| (now.piece_index + ahead) % count)
        .find(|&index| track.piece(index).has_switch())
    else {
        return Ok(None);
    };

    // distance in pieces to the switch opportunity after that; with a single
    // switch piece on the track the scan wraps back around to it
    let gap = (1..=count)
        .find(|&ahead| track.piece((first + ahead) % count).has_switch())
        .unwrap_or(count);

    let lane = now.end_lane;
    let left_lane = lane.saturating_sub(1);
    let right_lane = (lane + 1).min(track.lane_count().saturating_sub(1));
    let left_offset = track.lane_offset(left_lane)?;
    let right_offset = track.lane_offset(right_lane)?;

    let mut left_travel = 0.0;
    let mut right_travel = 0.0;
    let mut bends = 0;
    for ahead in 1..gap {
        let piece = track.piece((first + ahead) % count);
        if piece.is_bend() {
            left_travel += piece.travel(left_offset);
            right_travel += piece.travel(right_offset);
            bends += 1;
        }
    }
    if bends == 0 {
        return Ok(None);
    }

    let (min_offset, max_offset) = track.lane_offset_extremes();
    let current_offset = track.lane_offset(lane)?;
    if left_travel < right_travel && current_offset > min_offset {
        Ok(Some(SwitchDirection::Left))
    } else if right_travel < left_travel && current_offset < max_offset {
        Ok(Some(SwitchDirection::Right))
    } else {
        Ok(None)
    }
}
