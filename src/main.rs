use clap::{Parser, Subcommand};
use segment_forge::commands::{self, DisplayLoop};
use segment_forge::config::{
    Config, ConnectConfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT,
    DEFAULT_RESPONSE_BUFFER, DEFAULT_SEND_TIMEOUT, DEFAULT_STORE_PATH,
};
use segment_forge::{Result, SessionRegistry};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::error;

#[derive(Debug, Parser)]
#[command(
    name = "segment-forge",
    about = "Build, store and send hand-made TCP segments"
)]
struct Args {
    /// Session store file
    #[arg(long, global = true, default_value = DEFAULT_STORE_PATH)]
    store: PathBuf,

    /// Connect timeout for `connect` (ms)
    #[arg(long, global = true, default_value_t = DEFAULT_CONNECT_TIMEOUT.as_millis() as u64)]
    connect_timeout_ms: u64,

    /// Send timeout for `connect` (ms)
    #[arg(long, global = true, default_value_t = DEFAULT_SEND_TIMEOUT.as_millis() as u64)]
    send_timeout_ms: u64,

    /// How long `connect` waits for a response (ms)
    #[arg(long, global = true, default_value_t = DEFAULT_READ_TIMEOUT.as_millis() as u64)]
    read_timeout_ms: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a packet session
    Create {
        session_id: u32,
        /// Target IPs; the first one is used by `connect`
        #[arg(required = true)]
        target_ips: Vec<String>,
    },
    /// Modify a packet session interactively
    Modify { session_id: u32 },
    /// Display the packet N times (no network traffic)
    Send {
        session_id: u32,
        #[arg(long, default_value_t = 1)]
        num_packets: u32,
        /// Delay between packets (in seconds)
        #[arg(long, default_value_t = 1.0)]
        delay: f64,
    },
    /// Send the packet to the first target and print the response
    Connect { session_id: u32 },
    /// Same as `send`, for test runs
    Test {
        session_id: u32,
        #[arg(long, default_value_t = 1)]
        num_packets: u32,
        /// Delay between packets (in seconds)
        #[arg(long, default_value_t = 1.0)]
        delay: f64,
    },
    /// List stored sessions
    List,
    /// Print one session
    Show { session_id: u32 },
    /// Print the flag table
    Flags,
}

impl Args {
    fn config(&self) -> Config {
        Config {
            store_path: self.store.clone(),
            connect: ConnectConfig {
                connect_timeout: Duration::from_millis(self.connect_timeout_ms),
                send_timeout: Duration::from_millis(self.send_timeout_ms),
                read_timeout: Duration::from_millis(self.read_timeout_ms),
                response_buffer: DEFAULT_RESPONSE_BUFFER,
            },
        }
    }
}

fn display_loop(num_packets: u32, delay: f64) -> DisplayLoop {
    DisplayLoop {
        num_packets,
        delay: Duration::try_from_secs_f64(delay).unwrap_or(Duration::ZERO),
    }
}

fn run(args: Args) -> Result<()> {
    let config = args.config();
    let mut registry = SessionRegistry::restore(&config.store_path);
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let outcome = match args.command {
        Command::Create {
            session_id,
            target_ips,
        } => commands::create(&mut registry, session_id, target_ips, &mut out),
        Command::Modify { session_id } => {
            let stdin = io::stdin();
            commands::modify(&mut registry, session_id, &mut stdin.lock(), &mut out)
        }
        Command::Send {
            session_id,
            num_packets,
            delay,
        } => commands::send(&registry, session_id, display_loop(num_packets, delay), &mut out),
        Command::Connect { session_id } => {
            commands::connect(&registry, session_id, &config.connect, &mut out)
        }
        Command::Test {
            session_id,
            num_packets,
            delay,
        } => commands::test(&registry, session_id, display_loop(num_packets, delay), &mut out),
        Command::List => commands::list(&registry, &mut out),
        Command::Show { session_id } => commands::show(&registry, session_id, &mut out),
        Command::Flags => commands::flags(&mut out),
    };

    // Save even when the command failed, so completed edits are kept.
    let saved = registry.persist();
    outcome.and(saved)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = ?err, "command failed");
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}
