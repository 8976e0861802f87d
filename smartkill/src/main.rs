//! Smart-Kill CLI: list traps, trap history, and account data from the terminal.

mod output;

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use smartkill_lib::client::DEFAULT_BASE_URL;
use smartkill_lib::{
    get_credentials, parse_resource_url, Api, Client, ClientConfig, Entity, UnknownFields,
};
use std::process::ExitCode;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use output::OutputFormat;

#[derive(Parser)]
#[command(name = "smartkill")]
#[command(about = "Victor Smart-Kill CLI: traps, activity, and account data", long_about = None)]
struct Cli {
    /// Output format: plain (human-readable), json (server key casing).
    #[arg(short, long, default_value = "plain", value_enum)]
    output: OutputFormatArg,

    /// Account user name. Defaults to the one stored with the password in the secret backend.
    #[arg(short, long, env = "SMARTKILL_USERNAME")]
    username: Option<String>,

    /// Service base URL.
    #[arg(long, env = "SMARTKILL_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Request timeout in seconds.
    #[arg(long, env = "SMARTKILL_TIMEOUT", default_value = "15")]
    timeout: u64,

    /// What to do with response fields the client does not know: raise, ignore, or include.
    #[arg(long, default_value = "raise")]
    unknown: UnknownFields,

    /// Show timestamps in UTC only. By default timestamps are shown in local timezone.
    #[arg(long)]
    utc: bool,

    /// Log to stderr (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,

    /// Same as -vv.
    #[arg(short, long, conflicts_with = "quiet")]
    debug: bool,

    /// Only log errors.
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormatArg {
    Plain,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// List traps sorted by name
    Traps,
    /// Show one trap with its statistics
    Trap { trap_id: u64 },
    /// Show the activity history of a trap
    History { trap_id: u64 },
    /// List activity log records
    Activity,
    /// Show one activity log record
    ActivityRecord { record_id: u64 },
    /// List users
    Users,
    /// Show one user
    User { user_id: u64 },
    /// List profiles
    Profiles,
    /// Show one profile
    Profile { profile_id: u64 },
    /// List operators
    Operators,
    /// Show one operator
    Operator { operator_id: u64 },
    /// List minimum and recommended mobile app versions
    MobileApps,
    /// Show one mobile app version record
    MobileApp { app_id: u64 },
    /// Fetch an API token to check the credentials (the token is not printed)
    Token,
    /// Parse a Smart-Kill URL and print the resource and id
    ParseUrl { url: String },
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    let format = match cli.output {
        OutputFormatArg::Plain => OutputFormat::Plain,
        OutputFormatArg::Json => OutputFormat::Json,
    };

    match &cli.command {
        Commands::Version => {
            println!("smartkill {}", env!("CARGO_PKG_VERSION"));
            return ExitCode::SUCCESS;
        }
        Commands::ParseUrl { url } => {
            return match parse_resource_url(url).and_then(|p| {
                serde_json::to_value(&p).map_err(|e| e.to_string())
            }) {
                Ok(v) => finish(emit(&v, format)),
                Err(e) => finish(Err(e)),
            };
        }
        _ => {}
    }

    let (credentials, backend) = match get_credentials(cli.username.as_deref()) {
        Ok(c) => c,
        Err(e) => return finish(Err(e)),
    };
    info!(backend = backend.name(), username = credentials.username(), "Resolved credentials");

    let config = ClientConfig {
        base_url: cli.base_url.clone(),
        timeout: Duration::from_secs(cli.timeout),
        ..Default::default()
    };
    let client = match Client::with_config(credentials, config) {
        Ok(c) => c,
        Err(e) => return finish(Err(e.to_string())),
    };
    let api = Api::with_unknown_fields(client, cli.unknown);

    finish(run(&api, cli.command, format, cli.utc).await)
}

fn finish(result: Result<(), String>) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr; quiet by default so plain output stays clean.
fn init_tracing(cli: &Cli) {
    let level = if cli.quiet {
        "error"
    } else if cli.debug {
        "debug"
    } else {
        match cli.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|f| EnvFilter::try_new(f).ok())
        .unwrap_or_else(|| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(cli.verbose >= 3)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}

fn emit(value: &Value, format: OutputFormat) -> Result<(), String> {
    match format {
        OutputFormat::Plain => print!("{}", output::format_plain(value)),
        OutputFormat::Json => println!("{}", output::format_json(value).map_err(|e| e.to_string())?),
    }
    Ok(())
}

fn emit_one<T: Entity>(entity: &T, format: OutputFormat) -> Result<(), String> {
    emit(&entity.to_json().map_err(|e| e.to_string())?, format)
}

fn emit_list<T: Entity>(entities: &[T], format: OutputFormat) -> Result<(), String> {
    emit(
        &output::entities_to_json(entities).map_err(|e| e.to_string())?,
        format,
    )
}

async fn run(api: &Api, cmd: Commands, format: OutputFormat, use_utc: bool) -> Result<(), String> {
    let plain = format == OutputFormat::Plain;

    match cmd {
        Commands::Traps => {
            let traps = api.get_traps().await.map_err(|e| e.to_string())?;
            if plain {
                print!("{}", output::format_traps(&traps));
            } else {
                emit_list(&traps, format)?;
            }
        }
        Commands::Trap { trap_id } => {
            let trap = api.get_trap_by_id(trap_id).await.map_err(|e| e.to_string())?;
            if plain {
                print!("{}", output::format_trap(&trap, use_utc));
            } else {
                emit_one(&trap, format)?;
            }
        }
        Commands::History { trap_id } => {
            let history = api
                .get_trap_history(trap_id)
                .await
                .map_err(|e| e.to_string())?;
            if plain {
                print!("{}", output::format_history(&history, use_utc));
            } else {
                emit_list(&history, format)?;
            }
        }
        Commands::Activity => {
            let records = api.get_activity_logs().await.map_err(|e| e.to_string())?;
            if plain {
                print!("{}", output::format_history(&records, use_utc));
            } else {
                emit_list(&records, format)?;
            }
        }
        Commands::ActivityRecord { record_id } => {
            let record = api
                .get_activity_log_record(record_id)
                .await
                .map_err(|e| e.to_string())?;
            emit_one(&record, format)?;
        }
        Commands::Users => {
            let users = api.get_users().await.map_err(|e| e.to_string())?;
            emit_list(&users, format)?;
        }
        Commands::User { user_id } => {
            let user = api.get_user_by_id(user_id).await.map_err(|e| e.to_string())?;
            emit_one(&user, format)?;
        }
        Commands::Profiles => {
            let profiles = api.get_profiles().await.map_err(|e| e.to_string())?;
            emit_list(&profiles, format)?;
        }
        Commands::Profile { profile_id } => {
            let profile = api
                .get_profile_by_id(profile_id)
                .await
                .map_err(|e| e.to_string())?;
            emit_one(&profile, format)?;
        }
        Commands::Operators => {
            let operators = api.get_operators().await.map_err(|e| e.to_string())?;
            emit_list(&operators, format)?;
        }
        Commands::Operator { operator_id } => {
            let operator = api
                .get_operator_by_id(operator_id)
                .await
                .map_err(|e| e.to_string())?;
            emit_one(&operator, format)?;
        }
        Commands::MobileApps => {
            let apps = api.get_mobile_apps().await.map_err(|e| e.to_string())?;
            emit_list(&apps, format)?;
        }
        Commands::MobileApp { app_id } => {
            let app = api
                .get_mobile_app_by_id(app_id)
                .await
                .map_err(|e| e.to_string())?;
            emit_one(&app, format)?;
        }
        Commands::Token => {
            let client = api.client();
            client.fetch_token().await.map_err(|e| e.to_string())?;
            println!("Token fetched for {}", client.username());
        }
        Commands::ParseUrl { .. } | Commands::Version => {}
    }
    Ok(())
}
