//! REPL session management

use colored::Colorize;
use eyre::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{debug, info};

use super::command::{ReplCommand, parse_point};
use crate::broker::Message;
use crate::geo::{GeoBroker, GeoRequest, NearestFinder};

/// Interactive command session over a running broker
pub struct ReplSession {
    broker: GeoBroker,
    finder: NearestFinder,
    routing_key: String,
}

impl ReplSession {
    pub fn new(broker: GeoBroker, finder: NearestFinder, routing_key: impl Into<String>) -> Self {
        Self {
            broker,
            finder,
            routing_key: routing_key.into(),
        }
    }

    /// Run the REPL main loop until quit or end of input
    pub async fn run(&mut self) -> Result<()> {
        self.print_welcome();

        let mut rl = DefaultEditor::new().map_err(|e| eyre::eyre!("Failed to initialize readline: {}", e))?;

        loop {
            let readline = rl.readline(&format!("{} ", ">".bright_green()));

            match readline {
                Ok(line) => {
                    let input = line.trim();
                    if input.is_empty() {
                        continue;
                    }
                    let _ = rl.add_history_entry(input);

                    match ReplCommand::parse(input) {
                        Ok(ReplCommand::Quit) => break,
                        Ok(ReplCommand::Nearest(None)) => {
                            let Some(point) = self.ask_point(&mut rl)? else {
                                continue;
                            };
                            self.nearest(point).await?;
                        }
                        Ok(ReplCommand::Nearest(Some(point))) => self.nearest(point).await?,
                        Ok(ReplCommand::Update) => self.update().await?,
                        Ok(ReplCommand::Services) => self.services().await,
                        Ok(ReplCommand::Stats) => self.stats().await,
                        Ok(ReplCommand::Help) => self.print_help(),
                        Err(msg) => {
                            println!("{} {}", "?".yellow(), msg);
                            println!("Type {} for available commands", "help".yellow());
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    // Ctrl+C - just show new prompt
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    println!();
                    break;
                }
                Err(err) => {
                    return Err(eyre::eyre!("Readline error: {}", err));
                }
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    fn ask_point(&self, rl: &mut DefaultEditor) -> Result<Option<(f64, f64)>> {
        match rl.readline("Enter X and Y coordinates separated by comma: ") {
            Ok(line) => match parse_point(line.trim()) {
                Ok(point) => Ok(Some(point)),
                Err(msg) => {
                    println!("{} {}", "?".yellow(), msg);
                    Ok(None)
                }
            },
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
            Err(err) => Err(eyre::eyre!("Readline error: {}", err)),
        }
    }

    async fn nearest(&self, (x, y): (f64, f64)) -> Result<()> {
        debug!(x, y, "ReplSession::nearest: called");
        match self.finder.closest(x, y).await? {
            Some(found) => println!("=> {} ({:.2})", found.service.bright_cyan(), found.dist),
            None => println!("=> {}", "no service answered".dimmed()),
        }
        println!();
        Ok(())
    }

    async fn update(&self) -> Result<()> {
        let body = GeoRequest::UpdatePosition.to_body()?;
        let started = self
            .broker
            .broadcast(&self.routing_key, Message::new(self.finder.name(), body))
            .await;
        info!(started, routing_key = %self.routing_key, "Position update broadcast");
        println!("Position update sent to {} services", started);
        Ok(())
    }

    async fn services(&self) {
        let mut services = self.broker.get_services().await;
        services.sort();
        if services.is_empty() {
            println!("{}", "No services registered".dimmed());
            return;
        }
        for service in services {
            println!("  {}", service);
        }
    }

    async fn stats(&self) {
        let metrics = self.broker.metrics().await;
        println!("  {:18} {}", "registered peers".yellow(), metrics.registered_peers);
        println!("  {:18} {}", "pending requests".yellow(), metrics.pending_requests);
    }

    fn print_welcome(&self) {
        println!();
        println!("{}", "GeoBroker".bright_cyan().bold());
        println!("Type {} for help, {} to quit", "help".yellow(), "quit".yellow());
        self.print_help();
    }

    fn print_help(&self) {
        println!();
        println!("{}", "Commands:".bright_cyan());
        println!("  {:14} Find closest geo service", "1 | nearest X,Y".yellow());
        println!("  {:14} Update geo services' positions", "2 | update".yellow());
        println!("  {:14} List active services", "3 | services".yellow());
        println!("  {:14} Show broker counters", "stats".yellow());
        println!("  {:14} Exit", "quit".yellow());
        println!();
    }
}
