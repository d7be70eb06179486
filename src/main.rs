use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use service::{HandlerOutcome, RequestHandler};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "nlsql")]
#[command(about = "Ask a PostgreSQL database questions in plain English")]
struct Cli {
    /// Config file to use instead of ~/.config/nlsql/config.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve POST /query over HTTP (the default)
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Answer a single question and print the response as JSON
    Ask {
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let conf = config::AppConfig::load(cli.config.as_deref())?;
    let handler = RequestHandler::from_config(&conf)
        .await
        .context("could not set up the SQL agent")?;

    match cli.command.unwrap_or(Command::Serve {
        host: None,
        port: None,
    }) {
        Command::Serve { host, port } => {
            let host = host.unwrap_or(conf.server.host);
            let port = port.unwrap_or(conf.server.port);
            let addr: SocketAddr = format!("{host}:{port}")
                .parse()
                .with_context(|| format!("invalid bind address {host}:{port}"))?;

            service::serve(Arc::new(handler), addr).await?;
        }
        Command::Ask { question } => {
            let question = question.join(" ");
            match handler.handle(&question).await {
                HandlerOutcome::MissingInput => bail!(service::handler::MISSING_QUESTION),
                HandlerOutcome::Answered(response) => {
                    println!("{}", serde_json::to_string_pretty(&response)?);
                }
                HandlerOutcome::Failed(response) => {
                    println!("{}", serde_json::to_string_pretty(&response)?);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
