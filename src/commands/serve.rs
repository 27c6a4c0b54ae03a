//! Serve command handler.
//!
//! Reads one JSON request per line from stdin and writes one JSON response
//! per line to stdout. Runs until stdin closes or Ctrl-C, then stops the
//! backup scheduler.

use std::io::{self, BufRead, Write};
use std::sync::mpsc;
use std::thread;

use cadence::config::CadenceConfig;
use cadence::services::{QueryService, RecommendRequest, ServiceContainer};
use serde_json::{Value, json};
use tracing::{info, warn};

use super::render_response;

enum Event {
    Line(String),
    Eof,
    Interrupt,
}

/// Serve command.
pub fn cmd_serve(config: CadenceConfig) -> Result<(), Box<dyn std::error::Error>> {
    let services = ServiceContainer::from_config(config)?;
    let scheduler = services.scheduler();

    if services.config().backup.enabled {
        // The first cycle runs immediately and doubles as the startup backup.
        scheduler.start()?;
    } else {
        info!("Backups disabled");
    }

    let (tx, rx) = mpsc::channel();

    let interrupt_tx = tx.clone();
    ctrlc::set_handler(move || {
        let _ = interrupt_tx.send(Event::Interrupt);
    })?;

    thread::Builder::new()
        .name("cadence-stdin".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(Event::Line(line)).is_err() {
                            return;
                        }
                    },
                    Err(e) => {
                        warn!(error = %e, "Failed to read stdin");
                        break;
                    },
                }
            }
            let _ = tx.send(Event::Eof);
        })?;

    let queries = services.queries();
    info!(songs = services.store().len(), "Ready for requests");

    let result = answer_requests(&queries, &rx);

    let outcome = scheduler.stop();
    info!(?outcome, "Shut down");
    result
}

fn answer_requests(
    queries: &QueryService,
    events: &mpsc::Receiver<Event>,
) -> Result<(), Box<dyn std::error::Error>> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for event in events {
        match event {
            Event::Line(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                writeln!(out, "{}", handle_line(queries, &line))?;
                out.flush()?;
            },
            Event::Eof => {
                info!("Input closed");
                break;
            },
            Event::Interrupt => {
                info!("Interrupt received");
                break;
            },
        }
    }
    Ok(())
}

fn handle_line(queries: &QueryService, line: &str) -> Value {
    match serde_json::from_str::<RecommendRequest>(line) {
        Ok(request) => render_response(&queries.recommend(&request)),
        Err(e) => json!({
            "success": false,
            "error": format!("invalid request: {e}"),
            "kind": "validation",
        }),
    }
}
