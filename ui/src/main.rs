use colored::Colorize;
use service::{HandlerOutcome, RequestHandler};
use std::io::{self, Write};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let conf = config::AppConfig::get_or_default();

    println!("Connecting to {}...", conf.database.target().dimmed());
    let handler = RequestHandler::from_config(&conf).await?;
    println!("Done! Using {} (ctrl-c to quit)\n", conf.ai.model.bold());

    while let Ok(question) = inquire::Text::new("You: ").prompt() {
        print!("\n{} ", "[Assistant]".blue());
        let _ = io::stdout().flush();

        match handler.handle(&question).await {
            HandlerOutcome::MissingInput => {
                println!("{}", service::handler::MISSING_QUESTION.yellow());
            }
            HandlerOutcome::Answered(response) => println!("{}", response.answer.blue()),
            HandlerOutcome::Failed(response) => eprintln!("{}", response.answer.red()),
        }

        println!();
    }

    Ok(())
}
