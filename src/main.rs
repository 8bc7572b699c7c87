//! Cortex Agent CLI binary entry point.

use std::io::Write;

use clap::Parser;
use cortex_agent::cli::{AskArgs, Cli, Commands, StreamArgs};
use futures::StreamExt;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Ask(args) => handle_ask(args).await,
        Commands::Stream(args) => handle_stream(args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn handle_ask(args: AskArgs) -> Result<(), Box<dyn std::error::Error>> {
    let client = args.agent.client()?;

    let result = if args.progress {
        let progress = Box::new(|status: &str| eprintln!("… {status}"));
        client.ask_with_progress(&args.question, &[], progress).await?
    } else {
        client.ask(&args.question).await?
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("{}", result.text);
    if result.has_sql() {
        if let Some(sql) = &result.sql {
            eprintln!("\n-- SQL\n{sql}");
        }
    }
    if let Some(rows) = result.rows() {
        eprintln!("-- {} row(s): {}", rows.len(), result.column_names.join(", "));
    }
    eprintln!("-- {} ms", result.duration.as_millis());
    for warning in &result.warnings {
        eprintln!("warning: {warning}");
    }
    Ok(())
}

async fn handle_stream(args: StreamArgs) -> Result<(), Box<dyn std::error::Error>> {
    let client = args.agent.client()?;
    let mut stream = client.stream(&args.question).await?;

    let mut stdout = std::io::stdout();
    while let Some(chunk) = stream.next().await {
        write!(stdout, "{}", chunk?)?;
        stdout.flush()?;
    }
    println!();
    Ok(())
}
