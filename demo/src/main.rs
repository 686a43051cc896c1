//! Command-line walkthrough of the networking client.
//!
//! Each subcommand performs one call and prints `<Label> Success...` or
//! `<Label> Error: <message>`. Ctrl+C cancels the call in flight.

mod museum;

use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use networking::{Call, NetworkError, Networking, NetworkingConfig};
use tracing_subscriber::EnvFilter;

use museum::MuseumApi;

const IP_URL: &str = "http://142.250.185.46";
const GOOGLE_URL: &str = "https://www.google.com";
const GET_URL: &str = "https://httpbin.org/get";
const POST_URL: &str = "https://httpbin.org/post";
const POST_BODY: &str = r#"{"demo": "test"}"#;

#[derive(Parser)]
#[command(name = "networking-demo")]
#[command(about = "Exercise the networking client against real endpoints")]
#[command(version)]
struct Cli {
    /// Override connect, read and write timeouts (milliseconds)
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// GET an IP literal, bypassing DNS
    Ip,
    /// GET www.google.com to verify connectivity
    Google,
    /// GET a URL and print the body
    Get {
        #[arg(default_value = GET_URL)]
        url: String,
    },
    /// POST a JSON body and print the response
    Post {
        #[arg(default_value = POST_URL)]
        url: String,
        #[arg(long, default_value = POST_BODY)]
        body: String,
    },
    /// Fetch the museum collection and list its titles
    Museums,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = NetworkingConfig::from_env()?;
    if let Some(ms) = cli.timeout_ms {
        config = config.timeouts(Duration::from_millis(ms));
    }
    let networking = Networking::builder().config(config).build()?;

    let outcome = match cli.command {
        Command::Ip => report("IP Test", run(networking.spawn_get(IP_URL)).await, length),
        Command::Google => report("Google", run(networking.spawn_get(GOOGLE_URL)).await, length),
        Command::Get { url } => report("GET", run(networking.spawn_get(url)).await, full),
        Command::Post { url, body } => {
            report("POST", run(networking.spawn_post(url, body)).await, full)
        }
        Command::Museums => {
            let objects = MuseumApi::new(networking).get_data().await;
            println!("Museums: {} objects", objects.len());
            for object in &objects {
                println!("  {} {}", object.object_id, object.title);
            }
            true
        }
    };

    Ok(if outcome { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Await `call`, cancelling it on Ctrl+C.
async fn run(call: Call) -> Result<String, NetworkError> {
    let cancel = call.cancel_handle();
    tokio::select! {
        result = call => result,
        _ = tokio::signal::ctrl_c() => {
            cancel.cancel();
            Err(NetworkError::Cancelled)
        }
    }
}

fn length(body: &str) -> String {
    format!("Success! Length: {}", body.chars().count())
}

fn full(body: &str) -> String {
    format!("Success:\n{body}")
}

fn report(label: &str, result: Result<String, NetworkError>, show: fn(&str) -> String) -> bool {
    match result {
        Ok(body) => {
            println!("{label} {}", show(&body));
            true
        }
        Err(e) => {
            println!("{label} Error: {e}");
            false
        }
    }
}
