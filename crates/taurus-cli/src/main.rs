//! taurus - command-line access to the eToro API.
//!
//! Sets up the credential file interactively and issues one-off requests
//! against the API gateway, printing JSON responses to stdout.

mod prompt;

use std::io;

use anyhow::{bail, Context, Result};
use taurus_core::{ApiClient, Config, Overwrite, Params, ServiceProfile};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use prompt::StdinPrompt;

const USAGE: &str = "\
Usage: taurus <command> [args]

Commands:
  configure [--force]                 Create the credential file interactively
  show                                Print the credential file location and values
  get <endpoint> [key=value ...]      GET a JSON resource
  post <endpoint> [key=value ...]     POST a form payload
  delete <endpoint> [key=value ...]   Delete a resource
  ticket [service]                    Obtain a service ticket

Set RUST_LOG (e.g. RUST_LOG=debug) to control logging.";

/// Service handled by the command line
const SERVICE: &str = "etoro";

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        eprintln!("{}", USAGE);
        return Ok(());
    };

    let config = Config::load().context("Failed to load configuration")?;
    let service = ServiceProfile::lookup(SERVICE)
        .with_context(|| format!("Unsupported service: {}", SERVICE))?;

    match command.as_str() {
        "configure" => configure(&config, service, args.iter().any(|a| a == "--force")),
        "show" => show(&config, service),
        "get" | "post" | "delete" => {
            let endpoint = args.get(1).context("Missing endpoint")?;
            let params = parse_params(&args[2..])?;
            request(&config, service, command, endpoint, params).await
        }
        "ticket" => {
            let name = args.get(1).map(String::as_str).unwrap_or(SERVICE);
            let client = connect(&config, service).await?;
            println!("{}", client.service_ticket(name).await?);
            Ok(())
        }
        "-h" | "--help" | "help" => {
            println!("{}", USAGE);
            Ok(())
        }
        other => bail!("Unknown command: {}\n\n{}", other, USAGE),
    }
}

fn configure(config: &Config, service: &'static ServiceProfile, force: bool) -> Result<()> {
    let store = config.credential_store(service)?;
    println!("\n=== {} API credentials ===\n", service.name);

    let written = if force {
        let params = store.collect(&mut StdinPrompt)?;
        store.create(&params, Overwrite::Force)?
    } else {
        store.configure(None, &mut StdinPrompt)?
    };

    if written {
        info!(path = %store.path().display(), "Credentials saved");
        println!("Credentials saved to {}", store.path().display());
    } else {
        println!("Configuration aborted, existing file kept.");
    }
    Ok(())
}

fn show(config: &Config, service: &'static ServiceProfile) -> Result<()> {
    let mut store = config.credential_store(service)?;
    println!("{}", store.path().display());
    if !store.exists() {
        println!("(not configured - run `taurus configure`)");
        return Ok(());
    }
    store.load()?;
    println!("{}", store);
    Ok(())
}

async fn connect(config: &Config, service: &'static ServiceProfile) -> Result<ApiClient> {
    let store = config.credential_store(service)?;
    let client = ApiClient::open(store, config.request_timeout())
        .await
        .context("Failed to connect to the eToro API")?;
    Ok(client)
}

async fn request(
    config: &Config,
    service: &'static ServiceProfile,
    method: &str,
    endpoint: &str,
    params: Params,
) -> Result<()> {
    let client = connect(config, service).await?;
    let params = (!params.is_empty()).then_some(&params);

    let response = match method {
        "get" => client.get(endpoint, params).await?,
        "post" => {
            let empty = Params::new();
            client.post(endpoint, params.unwrap_or(&empty)).await?
        }
        _ => {
            client.delete(endpoint, params).await?;
            return Ok(());
        }
    };

    match response {
        Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        None => bail!("Request failed, see log output"),
    }
    Ok(())
}

/// Parse `key=value` arguments in order
fn parse_params(args: &[String]) -> Result<Params> {
    let mut params = Params::new();
    for arg in args {
        let Some((key, value)) = arg.split_once('=') else {
            bail!("Expected key=value, got `{}`", arg);
        };
        params.insert(key.to_string(), value.to_string());
    }
    Ok(params)
}
