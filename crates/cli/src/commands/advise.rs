use std::io::Read;
use std::path::PathBuf;

use clap::Args;
use fieldcast_agent::AdvisoryPipeline;
use fieldcast_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use fieldcast_core::ports::load_snapshot;
use fieldcast_core::{to_response, ApplicationError};
use fieldcast_integrations::RespTelemetryStore;
use serde_json::Value;
use tracing::warn;

use crate::commands::CommandResult;

pub const EXIT_CONFIG_INVALID: u8 = 2;
pub const EXIT_SNAPSHOT_ABSENT: u8 = 3;
pub const EXIT_TELEMETRY_FAILURE: u8 = 4;
const EXIT_RUNTIME_FAILURE: u8 = 1;

#[derive(Debug, Clone, Default, Args)]
pub struct AdviseArgs {
    #[arg(long, value_name = "JSON", conflicts_with = "from_store", help = "Sensor payload as inline JSON")]
    pub input: Option<String>,
    #[arg(long, help = "Read the latest snapshot from the telemetry store")]
    pub from_store: bool,
    #[arg(long, help = "Print the full pipeline result instead of the response contract")]
    pub raw: bool,
    #[arg(long, value_name = "PATH", help = "Reference document to draw notes from")]
    pub document: Option<PathBuf>,
    #[arg(long, value_name = "NAME", help = "City used for the rain forecast")]
    pub city: Option<String>,
}

enum PayloadSource {
    Text(String),
    Store,
}

pub fn run(args: &AdviseArgs) -> CommandResult {
    run_with_stdin(args, std::io::stdin().lock())
}

/// Runs `advise`, reading the payload from `stdin` when neither `--input` nor `--from-store` is given.
pub fn run_with_stdin(args: &AdviseArgs, stdin: impl Read) -> CommandResult {
    let options = LoadOptions {
        overrides: ConfigOverrides {
            city: args.city.clone(),
            document_path: args.document.clone(),
            ..ConfigOverrides::default()
        },
        ..LoadOptions::default()
    };
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "advise",
                "config_validation",
                error.to_string(),
                EXIT_CONFIG_INVALID,
            );
        }
    };
    crate::logging::init(&config);

    let source = if args.from_store {
        PayloadSource::Store
    } else if let Some(input) = &args.input {
        PayloadSource::Text(input.clone())
    } else {
        PayloadSource::Text(read_all(stdin))
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "advise",
                "runtime",
                format!("failed to initialize async runtime: {error}"),
                EXIT_RUNTIME_FAILURE,
            );
        }
    };

    runtime.block_on(advise(&config, source, args.raw))
}

async fn advise(config: &AppConfig, source: PayloadSource, raw: bool) -> CommandResult {
    let payload = match source {
        PayloadSource::Text(text) => parse_payload(&text),
        PayloadSource::Store => {
            let store = RespTelemetryStore::from_config(&config.telemetry);
            match load_snapshot(&store, &config.telemetry.key).await {
                Ok(payload) => payload,
                Err(error) => return snapshot_failure(error),
            }
        }
    };

    let result = AdvisoryPipeline::from_config(config).run(&payload).await;
    if raw {
        CommandResult::record(0, &result)
    } else {
        CommandResult::record(0, &to_response(&result))
    }
}

fn read_all(mut stdin: impl Read) -> String {
    let mut buffer = String::new();
    if let Err(error) = stdin.read_to_string(&mut buffer) {
        warn!(event_name = "advisory.input.unreadable", error = %error, "could not read stdin");
    }
    buffer
}

/// Unparseable text is malformed input and normalizes like any non-object payload.
fn parse_payload(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|error| {
        warn!(
            event_name = "advisory.input.malformed",
            error = %error,
            "sensor payload is not valid JSON; all readings default to 0"
        );
        Value::Null
    })
}

fn snapshot_failure(error: ApplicationError) -> CommandResult {
    match error {
        ApplicationError::SnapshotAbsent { .. } => {
            CommandResult::failure("advise", "snapshot_absent", error.to_string(), EXIT_SNAPSHOT_ABSENT)
        }
        other => CommandResult::failure(
            "advise",
            "telemetry_store",
            other.to_string(),
            EXIT_TELEMETRY_FAILURE,
        ),
    }
}
