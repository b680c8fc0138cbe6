use std::collections::HashMap;
use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use chrono::NaiveDate;
use clap::{Arg, ArgAction, ArgMatches, Command};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::{
    server, Budget, ChatRequest, ConversationTurn, FormRequest, GatewayConfig, GenerationGateway,
    GenerationRequest, SurpriseRequest,
};

/// CLI entry point for the wanderai gateway
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let matches = command().get_matches();
    let config = load_config(&matches)?;

    match matches.subcommand() {
        Some(("serve", sub)) => {
            let port = sub.get_one::<u16>("port").copied().unwrap_or(config.port);
            let gateway = Arc::new(GenerationGateway::from_config(&config)?);
            let addr = SocketAddr::from(([0, 0, 0, 0], port));
            server::serve(gateway, addr).await?;
        }
        Some((name, sub)) => {
            let request = build_request(name, sub)?;
            let gateway = GenerationGateway::from_config(&config)?;
            info!(
                mode = %request.mode(),
                model = gateway.model_name(),
                credentials = gateway.credential_count(),
                "Running generation"
            );

            match gateway.generate(request).await {
                Ok(result) => {
                    if matches.get_flag("json") {
                        println!("{}", serde_json::to_string_pretty(&result)?);
                    } else {
                        println!("{}", result.render());
                    }
                }
                Err(e) => {
                    error!(code = e.error_code(), "Generation failed: {}", e);
                    return Err(e.into());
                }
            }
        }
        None => unreachable!("subcommand is required"),
    }

    Ok(())
}

fn command() -> Command {
    Command::new("wanderai")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Travel itinerary generation over a rotating pool of Gemini API keys")
        .subcommand_required(true)
        .arg(
            Arg::new("model")
                .short('m')
                .long("model")
                .global(true)
                .value_name("MODEL")
                .help("Gemini model to use (or set GEMINI_MODEL)"),
        )
        .arg(
            Arg::new("api-key")
                .short('k')
                .long("api-key")
                .global(true)
                .value_name("KEY")
                .action(ArgAction::Append)
                .help("API key; repeat to build a pool (replaces GEMINI_API_KEY* env vars)"),
        )
        .arg(
            Arg::new("base-url")
                .short('u')
                .long("base-url")
                .global(true)
                .value_name("URL")
                .help("Gemini API base URL (or set GEMINI_BASE_URL)"),
        )
        .arg(
            Arg::new("timeout")
                .short('t')
                .long("timeout")
                .global(true)
                .value_name("SECONDS")
                .value_parser(clap::value_parser!(u64))
                .help("Per-attempt timeout in seconds, 0 disables it"),
        )
        .arg(
            Arg::new("max-attempts")
                .long("max-attempts")
                .global(true)
                .value_name("COUNT")
                .value_parser(clap::value_parser!(usize))
                .help("Attempts per request (defaults to one per key)"),
        )
        .arg(
            Arg::new("retry-timeouts")
                .long("retry-timeouts")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Rotate to the next key when an attempt times out"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Print the raw result as JSON"),
        )
        .subcommand(
            Command::new("chat")
                .about("Talk to the travel planner")
                .arg(
                    Arg::new("message")
                        .help("Message to send")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("history")
                        .long("history")
                        .value_name("FILE")
                        .help("JSON file with prior turns: [{\"role\": \"user\", \"content\": \"...\"}]"),
                ),
        )
        .subcommand(
            Command::new("form")
                .about("Plan a trip to a chosen destination")
                .arg(
                    Arg::new("destination")
                        .short('d')
                        .long("destination")
                        .required(true),
                )
                .arg(
                    Arg::new("days")
                        .short('n')
                        .long("days")
                        .required(true)
                        .value_parser(clap::value_parser!(u32)),
                )
                .arg(Arg::new("budget").short('b').long("budget"))
                .arg(Arg::new("styles").short('s').long("styles"))
                .arg(
                    Arg::new("start-date")
                        .long("start-date")
                        .value_name("YYYY-MM-DD")
                        .value_parser(parse_date),
                )
                .arg(Arg::new("origin").short('o').long("origin")),
        )
        .subcommand(
            Command::new("surprise")
                .about("Let the planner pick the destination")
                .arg(Arg::new("budget").short('b').long("budget").required(true))
                .arg(Arg::new("vibe").long("vibe"))
                .arg(
                    Arg::new("days")
                        .short('n')
                        .long("days")
                        .value_parser(clap::value_parser!(u32)),
                )
                .arg(Arg::new("origin").short('o').long("origin")),
        )
        .subcommand(
            Command::new("serve").about("Run the HTTP API").arg(
                Arg::new("port")
                    .short('p')
                    .long("port")
                    .value_parser(clap::value_parser!(u16))
                    .help("Listen port (or set PORT)"),
            ),
        )
}

/// Environment configuration with command-line flags layered on top.
fn load_config(matches: &ArgMatches) -> Result<GatewayConfig, Box<dyn std::error::Error>> {
    let mut overrides: HashMap<&str, String> = HashMap::new();

    if let Some(keys) = matches.get_many::<String>("api-key") {
        overrides.insert(
            "GEMINI_API_KEYS",
            keys.map(String::as_str).collect::<Vec<_>>().join(","),
        );
    }
    if let Some(model) = matches.get_one::<String>("model") {
        overrides.insert("GEMINI_MODEL", model.clone());
    }
    if let Some(base_url) = matches.get_one::<String>("base-url") {
        overrides.insert("GEMINI_BASE_URL", base_url.clone());
    }
    if let Some(timeout) = matches.get_one::<u64>("timeout") {
        overrides.insert("WANDERAI_ATTEMPT_TIMEOUT_SECS", timeout.to_string());
    }
    if let Some(max_attempts) = matches.get_one::<usize>("max-attempts") {
        overrides.insert("WANDERAI_MAX_ATTEMPTS", max_attempts.to_string());
    }
    if matches.get_flag("retry-timeouts") {
        overrides.insert("WANDERAI_RETRY_TIMEOUTS", "true".to_string());
    }

    let keys_from_flags = overrides.contains_key("GEMINI_API_KEYS");
    let config = GatewayConfig::from_lookup(|key| {
        if let Some(value) = overrides.get(key) {
            return Some(value.clone());
        }
        // Keys given on the command line replace the environment pool entirely.
        if keys_from_flags && key.starts_with("GEMINI_API_KEY") {
            return None;
        }
        env::var(key).ok()
    })?;

    Ok(config)
}

fn build_request(
    name: &str,
    sub: &ArgMatches,
) -> Result<GenerationRequest, Box<dyn std::error::Error>> {
    let request = match name {
        "chat" => {
            let history = match sub.get_one::<String>("history") {
                Some(path) => {
                    let raw = std::fs::read_to_string(path)?;
                    serde_json::from_str::<Vec<ConversationTurn>>(&raw)?
                }
                None => Vec::new(),
            };
            GenerationRequest::Chat(ChatRequest {
                message: sub.get_one::<String>("message").cloned().unwrap_or_default(),
                history,
            })
        }
        "form" => {
            let destination = sub
                .get_one::<String>("destination")
                .cloned()
                .unwrap_or_default();
            let days = sub.get_one::<u32>("days").copied().unwrap_or_default();
            let mut form = FormRequest::new(destination, days);
            if let Some(budget) = sub.get_one::<String>("budget") {
                form = form.with_budget(budget.parse::<Budget>()?);
            }
            if let Some(styles) = sub.get_one::<String>("styles") {
                form = form.with_styles(styles.clone());
            }
            if let Some(start_date) = sub.get_one::<NaiveDate>("start-date") {
                form = form.with_start_date(*start_date);
            }
            if let Some(origin) = sub.get_one::<String>("origin") {
                form = form.with_origin_city(origin.clone());
            }
            GenerationRequest::Form(form)
        }
        "surprise" => {
            let budget = sub
                .get_one::<String>("budget")
                .map(|budget| budget.parse::<Budget>())
                .transpose()?
                .unwrap_or_default();
            let mut surprise = SurpriseRequest::new(budget);
            if let Some(vibe) = sub.get_one::<String>("vibe") {
                surprise = surprise.with_vibe(vibe.clone());
            }
            if let Some(days) = sub.get_one::<u32>("days") {
                surprise = surprise.with_days(*days);
            }
            if let Some(origin) = sub.get_one::<String>("origin") {
                surprise = surprise.with_origin_city(origin.clone());
            }
            GenerationRequest::Surprise(surprise)
        }
        other => return Err(format!("unknown command: {other}").into()),
    };

    Ok(request)
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|err| format!("expected YYYY-MM-DD: {err}"))
}
