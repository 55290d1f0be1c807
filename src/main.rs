//! Binary entry point: resolve the configuration, open the library database,
//! and serve a line-oriented command prompt on stdin until `exit` or EOF.
use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use library_manager::{BookQueryConditions, Config, Library};
use tracing::info;
use tracing_subscriber::EnvFilter;

const HELP: &str =
    "commands: showCards | queryBook | history <card_id> | resetDatabase | help | exit";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let config = Config::from_env()?;
    info!(?config, "configuration resolved");
    let mut library = Library::open(&config)?;

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut lines = stdin.lock().lines();

    loop {
        write!(stdout, "> ").context("failed to write prompt")?;
        stdout.flush().context("failed to flush prompt")?;

        let Some(line) = lines.next() else { break };
        let line = line.context("failed to read command")?;
        let mut words = line.split_whitespace();

        match (words.next(), words.next()) {
            (None, _) => continue,
            (Some("exit"), _) => break,
            (Some("help"), _) => writeln!(stdout, "{HELP}")?,
            (Some("showCards"), _) => write!(stdout, "{}", library.show_cards())?,
            (Some("resetDatabase"), _) => write!(stdout, "{}", library.reset_database())?,
            (Some("queryBook"), _) => {
                write!(stdout, "{}", library.query_book(&BookQueryConditions::new()))?
            }
            (Some("history"), Some(raw_id)) => match raw_id.parse::<i64>() {
                Ok(card_id) => write!(stdout, "{}", library.show_borrow_history(card_id))?,
                Err(_) => writeln!(stdout, "card id must be a number: {raw_id}")?,
            },
            (Some(command), _) => writeln!(stdout, "Unknown command: {command}. {HELP}")?,
        }
    }

    info!("session closed");
    Ok(())
}
