// Session state machine: one handler per server message kind

use log::{debug, error, info, warn};

use crate::car::{CarPosition, CarState};
use crate::control::{compute_throttle, decide_lane_change};
use crate::errors::HairpinError;
use crate::protocol::{Command, Inbound, ServerMessage};
use crate::track::Track;

/// All mutable state of one bot session, owned by the single-threaded
/// message loop: one inbound message is fully reacted to before the next
/// one is read.
#[derive(Debug, Default)]
pub struct RaceSession {
    track: Option<Track>,
    car: Option<CarState>,
    my_color: Option<String>,
    last_tick: Option<u64>,
    race_started: bool,
}

impl RaceSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// State of the controlled car, if a race is underway.
    pub fn car(&self) -> Option<&CarState> {
        self.car.as_ref()
    }

    /// React to one inbound message.
    ///
    /// Every message carrying a game tick is answered with at least one
    /// command so the server never sees a silent tick; acknowledgements
    /// without a tick produce none.
    pub fn react(&mut self, inbound: &Inbound) -> Result<Vec<Command>, HairpinError> {
        let seen_tick_before = self.last_tick.is_some();
        if inbound.game_tick.is_some() {
            self.last_tick = inbound.game_tick;
        }

        let mut commands = match &inbound.message {
            ServerMessage::Join => {
                info!("joined the server queue");
                Vec::new()
            }
            ServerMessage::YourCar { name, color } => {
                info!("driving car {name} ({color})");
                self.my_color = Some(color.clone());
                Vec::new()
            }
            ServerMessage::GameInit { track } => self.on_game_init(track),
            ServerMessage::GameStart => self.on_game_start(seen_tick_before),
            ServerMessage::CarPositions(positions) => {
                self.on_car_positions(positions, inbound.game_tick)?
            }
            ServerMessage::Crash { color } => {
                warn!("car {color} crashed");
                vec![Command::Ping]
            }
            ServerMessage::GameEnd => self.on_game_end(),
            ServerMessage::Error(text) => {
                error!("server error: {text}");
                vec![Command::Ping]
            }
            ServerMessage::Unknown(msg_type) => {
                warn!("unknown message type: {msg_type}");
                Vec::new()
            }
        };

        if commands.is_empty() && inbound.game_tick.is_some() {
            commands.push(Command::Ping);
        }
        Ok(commands)
    }

    fn on_game_init(&mut self, track: &Track) -> Vec<Command> {
        info!(
            "race initialized: {} pieces, {} lanes",
            track.piece_count(),
            track.lane_count()
        );
        self.track = Some(track.clone());
        self.car = Some(CarState::new());
        self.last_tick = None;
        self.race_started = false;
        Vec::new()
    }

    fn on_game_start(&mut self, seen_tick_before: bool) -> Vec<Command> {
        if self.race_started {
            return Vec::new();
        }
        info!("race started");
        self.race_started = true;

        if !seen_tick_before {
            // races may start before the first telemetry tick; prime the
            // full-throttle run the calibration fit relies on
            return vec![Command::Throttle {
                value: 1.0,
                tick: Some(self.last_tick.unwrap_or(0)),
            }];
        }
        Vec::new()
    }

    fn on_car_positions(
        &mut self,
        positions: &[CarPosition],
        game_tick: Option<u64>,
    ) -> Result<Vec<Command>, HairpinError> {
        let color = self.my_color.as_deref().ok_or(HairpinError::MissingIdentity)?;
        let track = self.track.as_ref().ok_or(HairpinError::MissingTrack)?;
        let car = self.car.as_mut().ok_or(HairpinError::MissingTrack)?;
        let now = positions
            .iter()
            .find(|p| p.color == color)
            .ok_or_else(|| HairpinError::MissingOwnCar {
                color: color.to_string(),
            })?;

        car.note_lane_change(now);
        car.update(track, now)?;

        let throttle = compute_throttle(car, track, now)?;
        let mut commands = vec![Command::Throttle {
            value: throttle,
            tick: game_tick,
        }];

        if car.calibrated() && !car.switch_requested() {
            if let Some(direction) = decide_lane_change(track, now)? {
                debug!("requesting lane change {direction:?}");
                car.request_switch();
                commands.push(Command::SwitchLane(direction));
            }
        }
        debug!(
            "tick {game_tick:?}: piece {} speed {:.2} throttle {throttle:.2}",
            now.piece_index,
            car.speed()
        );

        car.end_tick(now.clone());
        Ok(commands)
    }

    fn on_game_end(&mut self) -> Vec<Command> {
        if let Some(car) = &self.car {
            info!("race ended after {:.1} travelled", car.total_travel());
        } else {
            info!("race ended");
        }
        self.race_started = false;
        self.car = None;
        vec![Command::Ping]
    }
}
