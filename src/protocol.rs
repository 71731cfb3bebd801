// Wire protocol for the race server: JSON message decoding and encoding

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::car::CarPosition;
use crate::control::SwitchDirection;
use crate::errors::HairpinError;
use crate::track::{Piece, Track};

/// One parsed inbound message: the typed body plus the game tick the server
/// stamped on it, if any.
#[derive(Clone, Debug)]
pub struct Inbound {
    pub message: ServerMessage,
    pub game_tick: Option<u64>,
}

/// Every message kind the server is known to send. Unknown kinds keep their
/// tag so the session can still answer ticked ones.
#[derive(Clone, Debug)]
pub enum ServerMessage {
    Join,
    YourCar { name: String, color: String },
    GameInit { track: Track },
    GameStart,
    CarPositions(Vec<CarPosition>),
    Crash { color: String },
    GameEnd,
    Error(String),
    Unknown(String),
}

/// Commands the session answers a message with.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Keep-alive; the server expects at least one reply per ticked message.
    Ping,
    /// Throttle in [0, 1], echoing the tick it answers when one is known.
    Throttle { value: f64, tick: Option<u64> },
    /// Request to change lanes at the next switch piece.
    SwitchLane(SwitchDirection),
}

impl Command {
    /// Wire representation understood by the race server.
    pub fn to_wire(&self) -> Value {
        match self {
            Command::Ping => request("ping", Value::Null),
            Command::Throttle { value, tick } => {
                let mut message = request("throttle", json!(value));
                if let Some(tick) = tick {
                    message["gameTick"] = json!(tick);
                }
                message
            }
            Command::SwitchLane(direction) => {
                let data = match direction {
                    SwitchDirection::Left => "Left",
                    SwitchDirection::Right => "Right",
                };
                request("switchLane", json!(data))
            }
        }
    }
}

/// Session bootstrap: join the public race queue with plain credentials.
pub fn join(name: &str, key: &str) -> Value {
    request("join", json!({ "name": name, "key": key }))
}

/// Session bootstrap: create a private single-car race on the named track.
pub fn create_race(name: &str, key: &str, track: &str) -> Value {
    request(
        "createRace",
        json!({
            "botId": { "name": name, "key": key },
            "trackName": track,
            "carCount": 1,
        }),
    )
}

/// Session bootstrap: join an existing race, optionally password protected.
pub fn join_race(
    name: &str,
    key: &str,
    track: &str,
    password: Option<&str>,
    car_count: u32,
) -> Value {
    let mut data = json!({
        "botId": { "name": name, "key": key },
        "trackName": track,
        "carCount": car_count,
    });
    if let Some(password) = password {
        data["password"] = json!(password);
    }
    request("joinRace", data)
}

fn request(msg_type: &str, data: Value) -> Value {
    json!({ "msgType": msg_type, "data": data })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    msg_type: String,
    #[serde(default)]
    data: Value,
    game_tick: Option<u64>,
}

#[derive(Deserialize)]
struct CarIdDef {
    name: String,
    color: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LaneDef {
    start_lane_index: usize,
    end_lane_index: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PiecePositionDef {
    piece_index: usize,
    in_piece_distance: f64,
    lane: LaneDef,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CarPositionDef {
    id: CarIdDef,
    angle: f64,
    piece_position: PiecePositionDef,
}

impl From<CarPositionDef> for CarPosition {
    fn from(def: CarPositionDef) -> Self {
        CarPosition {
            name: def.id.name,
            color: def.id.color,
            angle: def.angle,
            piece_index: def.piece_position.piece_index,
            in_piece_distance: def.piece_position.in_piece_distance,
            start_lane: def.piece_position.lane.start_lane_index,
            end_lane: def.piece_position.lane.end_lane_index,
        }
    }
}

#[derive(Deserialize)]
struct PieceDef {
    length: Option<f64>,
    radius: Option<f64>,
    angle: Option<f64>,
    #[serde(default)]
    switch: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackLaneDef {
    distance_from_center: f64,
    index: usize,
}

#[derive(Deserialize)]
struct TrackDef {
    pieces: Vec<PieceDef>,
    lanes: Vec<TrackLaneDef>,
}

#[derive(Deserialize)]
struct RaceDef {
    track: TrackDef,
}

#[derive(Deserialize)]
struct GameInitDef {
    race: RaceDef,
}

/// Decode one newline-framed server message.
pub fn parse_line(line: &str) -> Result<Inbound, HairpinError> {
    let envelope: Envelope =
        serde_json::from_str(line).map_err(|e| HairpinError::MalformedMessage {
            line: line.to_string(),
            source: e,
        })?;

    let message = match envelope.msg_type.as_str() {
        "join" => ServerMessage::Join,
        "yourCar" => {
            let id: CarIdDef = payload(&envelope)?;
            ServerMessage::YourCar {
                name: id.name,
                color: id.color,
            }
        }
        "gameInit" => {
            let init: GameInitDef = payload(&envelope)?;
            ServerMessage::GameInit {
                track: build_track(init.race.track)?,
            }
        }
        "gameStart" => ServerMessage::GameStart,
        "carPositions" => {
            let defs: Vec<CarPositionDef> = payload(&envelope)?;
            ServerMessage::CarPositions(defs.into_iter().map(CarPosition::from).collect())
        }
        "crash" => {
            let id: CarIdDef = payload(&envelope)?;
            ServerMessage::Crash { color: id.color }
        }
        "gameEnd" => ServerMessage::GameEnd,
        "error" => ServerMessage::Error(match envelope.data.as_str() {
            Some(text) => text.to_string(),
            None => envelope.data.to_string(),
        }),
        other => ServerMessage::Unknown(other.to_string()),
    };

    Ok(Inbound {
        message,
        game_tick: envelope.game_tick,
    })
}

fn payload<T: DeserializeOwned>(envelope: &Envelope) -> Result<T, HairpinError> {
    serde_json::from_value(envelope.data.clone()).map_err(|e| HairpinError::MalformedPayload {
        msg_type: envelope.msg_type.clone(),
        source: e,
    })
}

fn build_track(def: TrackDef) -> Result<Track, HairpinError> {
    if def.pieces.is_empty() {
        return Err(HairpinError::EmptyTrack);
    }

    let mut pieces = Vec::with_capacity(def.pieces.len());
    for (index, piece) in def.pieces.into_iter().enumerate() {
        pieces.push(build_piece(index, piece)?);
    }

    // the lane list is keyed by an explicit index and may arrive unsorted
    let mut lane_offsets = vec![0.0; def.lanes.len()];
    for lane in &def.lanes {
        if lane.index >= lane_offsets.len() {
            return Err(HairpinError::UnknownLane {
                lane: lane.index,
                lanes: lane_offsets.len(),
            });
        }
        lane_offsets[lane.index] = lane.distance_from_center;
    }

    Ok(Track::new(pieces, lane_offsets))
}

/// A piece is either a straight (positive length) or a bend (positive
/// radius, nonzero angle), never both and never neither.
fn build_piece(index: usize, def: PieceDef) -> Result<Piece, HairpinError> {
    let length = def.length.unwrap_or(0.0);
    let radius = def.radius.unwrap_or(0.0);
    let angle = def.angle.unwrap_or(0.0);

    match (length > 0.0, radius > 0.0 && angle != 0.0) {
        (true, false) => Ok(Piece::Straight {
            length,
            switch: def.switch,
        }),
        (false, true) => Ok(Piece::Bend {
            radius,
            angle,
            switch: def.switch,
        }),
        _ => Err(HairpinError::InvalidPiece { index }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_game_init() {
        let line = r#"{"msgType":"gameInit","data":{"race":{"track":{"id":"keimola","name":"Keimola","pieces":[{"length":100.0,"switch":true},{"radius":200,"angle":22.5}],"lanes":[{"distanceFromCenter":-10,"index":0},{"distanceFromCenter":10,"index":1}]},"cars":[],"raceSession":{"laps":3}}}}"#;
        let inbound = parse_line(line).unwrap();
        assert!(inbound.game_tick.is_none());

        let ServerMessage::GameInit { track } = inbound.message else {
            panic!("expected gameInit");
        };
        assert_eq!(track.piece_count(), 2);
        assert_eq!(track.lane_count(), 2);
        assert!(track.piece(0).has_switch());
        assert_eq!(
            *track.piece(1),
            Piece::Bend {
                radius: 200.0,
                angle: 22.5,
                switch: false,
            }
        );
        assert_eq!(track.lane_offset(0).unwrap(), -10.0);
    }

    #[test]
    fn test_parse_car_positions() {
        let line = r#"{"msgType":"carPositions","data":[{"id":{"name":"Hairpin","color":"red"},"angle":0.5,"piecePosition":{"pieceIndex":3,"inPieceDistance":42.5,"lane":{"startLaneIndex":0,"endLaneIndex":1},"lap":0}}],"gameId":"x","gameTick":7}"#;
        let inbound = parse_line(line).unwrap();
        assert_eq!(inbound.game_tick, Some(7));

        let ServerMessage::CarPositions(positions) = inbound.message else {
            panic!("expected carPositions");
        };
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].color, "red");
        assert_eq!(positions[0].piece_index, 3);
        assert_eq!(positions[0].in_piece_distance, 42.5);
        assert_eq!(positions[0].start_lane, 0);
        assert_eq!(positions[0].end_lane, 1);
    }

    #[test]
    fn test_parse_your_car() {
        let line = r#"{"msgType":"yourCar","data":{"name":"Hairpin","color":"red"}}"#;
        let inbound = parse_line(line).unwrap();
        let ServerMessage::YourCar { name, color } = inbound.message else {
            panic!("expected yourCar");
        };
        assert_eq!(name, "Hairpin");
        assert_eq!(color, "red");
    }

    #[test]
    fn test_unknown_message_keeps_tag_and_tick() {
        let line = r#"{"msgType":"turboAvailable","data":{},"gameTick":12}"#;
        let inbound = parse_line(line).unwrap();
        assert_eq!(inbound.game_tick, Some(12));
        let ServerMessage::Unknown(tag) = inbound.message else {
            panic!("expected unknown");
        };
        assert_eq!(tag, "turboAvailable");
    }

    #[test]
    fn test_piece_must_be_straight_or_bend() {
        // both shapes at once
        let line = r#"{"msgType":"gameInit","data":{"race":{"track":{"pieces":[{"length":100.0,"radius":200,"angle":22.5}],"lanes":[{"distanceFromCenter":0,"index":0}]}}}}"#;
        assert!(matches!(
            parse_line(line),
            Err(HairpinError::InvalidPiece { index: 0 })
        ));

        // neither shape
        let line = r#"{"msgType":"gameInit","data":{"race":{"track":{"pieces":[{"switch":true}],"lanes":[{"distanceFromCenter":0,"index":0}]}}}}"#;
        assert!(matches!(
            parse_line(line),
            Err(HairpinError::InvalidPiece { index: 0 })
        ));
    }

    #[test]
    fn test_malformed_payload_is_rejected() {
        let line = r#"{"msgType":"carPositions","data":{"not":"an array"},"gameTick":1}"#;
        assert!(matches!(
            parse_line(line),
            Err(HairpinError::MalformedPayload { .. })
        ));
    }

    #[test]
    fn test_throttle_wire_format() {
        let command = Command::Throttle {
            value: 0.65,
            tick: Some(3),
        };
        assert_eq!(
            command.to_wire(),
            json!({ "msgType": "throttle", "data": 0.65, "gameTick": 3 })
        );

        // without a known tick the field is left out entirely
        let command = Command::Throttle {
            value: 1.0,
            tick: None,
        };
        assert_eq!(
            command.to_wire(),
            json!({ "msgType": "throttle", "data": 1.0 })
        );
    }

    #[test]
    fn test_ping_and_switch_wire_formats() {
        assert_eq!(
            Command::Ping.to_wire(),
            json!({ "msgType": "ping", "data": null })
        );
        assert_eq!(
            Command::SwitchLane(SwitchDirection::Left).to_wire(),
            json!({ "msgType": "switchLane", "data": "Left" })
        );
        assert_eq!(
            Command::SwitchLane(SwitchDirection::Right).to_wire(),
            json!({ "msgType": "switchLane", "data": "Right" })
        );
    }

    #[test]
    fn test_bootstrap_requests() {
        assert_eq!(
            join("Hairpin", "secret"),
            json!({ "msgType": "join", "data": { "name": "Hairpin", "key": "secret" } })
        );

        let created = create_race("Hairpin", "secret", "keimola");
        assert_eq!(created["msgType"], "createRace");
        assert_eq!(created["data"]["trackName"], "keimola");
        assert_eq!(created["data"]["carCount"], 1);

        let joined = join_race("Hairpin", "secret", "keimola", Some("pwd"), 4);
        assert_eq!(joined["msgType"], "joinRace");
        assert_eq!(joined["data"]["password"], "pwd");
        assert_eq!(joined["data"]["carCount"], 4);
    }
}
