// Integration tests for a full race session over wire-format messages
//
// This test suite validates the complete workflow:
// 1. Decode newline-framed server JSON into typed messages
// 2. Feed them through the session dispatcher
// 3. Check the calibration fit, the emitted commands, and the
//    keep-alive invariant for ticked messages

use hairpin::protocol::{self, Command};
use hairpin::session::RaceSession;

fn react(session: &mut RaceSession, line: &str) -> Vec<Command> {
    let inbound = protocol::parse_line(line).expect("server line must decode");
    session.react(&inbound).expect("message must be handled")
}

const GAME_INIT: &str = r#"{"msgType":"gameInit","data":{"race":{"track":{"id":"test","name":"Test","pieces":[{"length":100.0},{"radius":200,"angle":22.5,"switch":true}],"lanes":[{"distanceFromCenter":0,"index":0}]},"cars":[{"id":{"name":"Hairpin","color":"red"}}],"raceSession":{"laps":3}}}}"#;

fn car_positions(tick: Option<u64>, in_piece_distance: f64) -> String {
    let tick = match tick {
        Some(tick) => format!(",\"gameTick\":{tick}"),
        None => String::new(),
    };
    format!(
        r#"{{"msgType":"carPositions","data":[{{"id":{{"name":"Hairpin","color":"red"}},"angle":0.0,"piecePosition":{{"pieceIndex":0,"inPieceDistance":{in_piece_distance},"lane":{{"startLaneIndex":0,"endLaneIndex":0}},"lap":0}}}}]{tick}}}"#
    )
}

#[test]
fn test_race_startup_calibrates_the_motion_model() {
    let mut session = RaceSession::new();

    // acknowledgements without a tick stay silent
    assert!(react(&mut session, r#"{"msgType":"join","data":{}}"#).is_empty());
    assert!(
        react(
            &mut session,
            r#"{"msgType":"yourCar","data":{"name":"Hairpin","color":"red"}}"#,
        )
        .is_empty()
    );
    assert!(react(&mut session, GAME_INIT).is_empty());

    // the grid-position sample arrives before the race starts
    let commands = react(&mut session, &car_positions(None, 0.0));
    assert_eq!(commands.len(), 1);
    assert!(matches!(
        commands[0],
        Command::Throttle { value, tick: None } if value == 1.0
    ));

    // no tick seen yet, so the start primes full throttle for tick 0
    let commands = react(&mut session, r#"{"msgType":"gameStart","data":null}"#);
    assert_eq!(
        commands,
        vec![Command::Throttle {
            value: 1.0,
            tick: Some(0),
        }]
    );

    // two moving ticks at full throttle: speeds 3.0 and then 5.4
    let commands = react(&mut session, &car_positions(Some(1), 3.0));
    assert!(matches!(
        commands[0],
        Command::Throttle { value, tick: Some(1) } if value == 1.0
    ));

    let commands = react(&mut session, &car_positions(Some(2), 8.4));
    assert!(matches!(
        commands[0],
        Command::Throttle { tick: Some(2), .. }
    ));

    let car = session.car().expect("race is underway");
    assert_eq!(car.gain(), 3.0);
    assert!((car.decay() - 0.8).abs() < 1e-12);
    assert!((car.total_travel() - 8.4).abs() < 1e-12);

    // well below the bend limit of 0.6 * sqrt(200), so still flat out
    assert!(matches!(
        commands[0],
        Command::Throttle { value, .. } if value == 1.0
    ));
}

#[test]
fn test_ticked_messages_always_get_an_answer() {
    let mut session = RaceSession::new();

    let commands = react(
        &mut session,
        r#"{"msgType":"tournamentEnd","data":null,"gameTick":42}"#,
    );
    assert_eq!(commands, vec![Command::Ping]);

    let commands = react(&mut session, r#"{"msgType":"tournamentEnd","data":null}"#);
    assert!(commands.is_empty());
}

#[test]
fn test_crash_and_game_end_answer_with_keep_alives() {
    let mut session = RaceSession::new();
    react(
        &mut session,
        r#"{"msgType":"yourCar","data":{"name":"Hairpin","color":"red"}}"#,
    );
    react(&mut session, GAME_INIT);

    let commands = react(
        &mut session,
        r#"{"msgType":"crash","data":{"name":"Hairpin","color":"red"}}"#,
    );
    assert_eq!(commands, vec![Command::Ping]);

    let commands = react(&mut session, r#"{"msgType":"gameEnd","data":{}}"#);
    assert_eq!(commands, vec![Command::Ping]);
    assert!(session.car().is_none());

    // a new race rebuilds the car state from scratch
    react(&mut session, GAME_INIT);
    assert!(session.car().is_some());
    assert_eq!(session.car().unwrap().ticks(), 0);
}
