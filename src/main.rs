use clap::Parser;
use log::{error, info};

use hairpin::connection::ServerConnection;
use hairpin::errors::HairpinError;
use hairpin::protocol::{self, Command};
use hairpin::session::RaceSession;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Race server host
    host: String,

    /// Race server port
    port: u16,

    /// Bot name presented to the server
    name: String,

    /// Bot key issued by the server
    key: String,

    /// Create a private race on this track instead of joining the public
    /// queue
    track: Option<String>,

    /// Password of an existing race to join; requires a track name
    #[arg(short, long)]
    password: Option<String>,

    /// Number of cars in the race to join or create
    #[arg(short, long, default_value_t = 1)]
    car_count: u32,
}

fn run(args: &Args) -> Result<(), HairpinError> {
    let mut connection = ServerConnection::connect(&args.host, args.port)?;

    let bootstrap = match (&args.track, &args.password) {
        (Some(track), Some(password)) => protocol::join_race(
            &args.name,
            &args.key,
            track,
            Some(password),
            args.car_count,
        ),
        (Some(track), None) => protocol::create_race(&args.name, &args.key, track),
        (None, _) => protocol::join(&args.name, &args.key),
    };
    connection.send(&bootstrap)?;

    let mut session = RaceSession::new();
    loop {
        let inbound = match connection.receive() {
            Ok(Some(inbound)) => inbound,
            Ok(None) => {
                info!("connection closed");
                return Ok(());
            }
            Err(e @ (HairpinError::ServerReadError { .. }
            | HairpinError::ServerWriteError { .. })) => return Err(e),
            Err(e) => {
                error!("dropping undecodable message: {e}");
                continue;
            }
        };

        let commands = match session.react(&inbound) {
            Ok(commands) => commands,
            Err(e) => {
                // the core never takes the session down; keep the server fed
                // and move on
                error!("dropping message: {e}");
                if inbound.game_tick.is_some() {
                    vec![Command::Ping]
                } else {
                    Vec::new()
                }
            }
        };
        for command in &commands {
            connection.send(&command.to_wire())?;
        }
    }
}

fn main() {
    colog::init();

    let args = Args::parse();
    ctrlc::set_handler(move || {
        println!("Exiting...");
        std::process::exit(0);
    })
    .expect("Could not set Ctrl-C handler");

    info!(
        "connecting to {}:{} as {}",
        args.host, args.port, args.name
    );
    run(&args).expect("Error while running the race session");
}
