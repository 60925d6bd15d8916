use std::io::Write;

use riskflow_core::input::{Reply, classify_reply};
use riskflow_core::{Card, Outcome, Session, SessionConfig, StateRegister, Transcript};
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, BufReader};
use uuid::Uuid;

use crate::gateway::HttpCatalog;
use crate::render;
use crate::util::print_json;

const COMMANDS_HELP: &str = "Comandi: :back (domanda precedente), :cancel (annulla), :new (nuova conversazione), :status, :quit";

#[derive(Debug, PartialEq, Eq)]
enum Line<'a> {
    Back,
    Cancel,
    New,
    Status,
    Quit,
    Unknown(&'a str),
    Input(&'a str),
}

fn parse_line(line: &str) -> Line<'_> {
    let line = line.trim();
    let Some(command) = line.strip_prefix(':') else {
        return Line::Input(line);
    };
    match command.trim().to_lowercase().as_str() {
        "back" | "b" => Line::Back,
        "cancel" | "c" => Line::Cancel,
        "new" | "n" => Line::New,
        "status" | "s" => Line::Status,
        "quit" | "q" | "exit" => Line::Quit,
        _ => Line::Unknown(line),
    }
}

fn status(register: &StateRegister) -> Value {
    let step = register.step();
    json!({
        "step": step.to_string(),
        "progress": render::progress(step),
        "locked": register.lock().is_locked(),
        "history_depth": register.history().depth(),
        "category": register.category().map(|c| c.backend_key()),
        "selected_event": register.guard().selected(),
        "pending_event": register.guard().pending(),
        "answers": register.answers(),
        "cancellation_allowed": step.cancellation_allowed(),
    })
}

fn report(register: &StateRegister) -> Value {
    json!({
        "event": register.assessed(),
        "answers": register.answers(),
    })
}

/// Agent cards appended after `last`, which moves to the newest entry.
/// Ids survive pruning, so cards removed mid-transcript do not hide new ones.
fn unseen<'a>(transcript: &'a Transcript, last: &mut Option<Uuid>) -> Vec<&'a Card> {
    let fresh = transcript.after(*last);
    if let Some(entry) = transcript.entries().last() {
        *last = Some(entry.id);
    }
    fresh
        .iter()
        .map(|e| &e.card)
        .filter(|card| !card.is_from_user())
        .collect()
}

fn flush(transcript: &Transcript, last: &mut Option<Uuid>) {
    for card in unseen(transcript, last) {
        println!("{}\n", render::card(card));
    }
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

pub async fn run(gateway: HttpCatalog, config: SessionConfig) -> i32 {
    tracing::info!(
        api_url = %gateway.base(),
        inactivity_timeout_secs = config.inactivity_timeout.as_secs(),
        "interview started"
    );
    let mut session = Session::new(gateway, Transcript::new(), config);
    let mut expiries = session.inactivity_events();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last = None;
    let mut confirming_cancel = false;

    println!("Scrivi \"rischi\" per iniziare una valutazione.\n{COMMANDS_HELP}\n");
    prompt();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        tracing::error!(error = %e, "failed to read stdin");
                        return 1;
                    }
                };

                if confirming_cancel {
                    confirming_cancel = false;
                    if classify_reply(&line) == Reply::Yes {
                        session.cancel();
                    } else {
                        println!("Ok, continuiamo.\n");
                    }
                } else {
                    match parse_line(&line) {
                        Line::Quit => break,
                        Line::Back => {
                            if !session.go_back() {
                                println!("↩️ Non è possibile tornare indietro da qui.\n");
                            }
                        }
                        Line::Cancel => {
                            if session.step().cancellation_allowed() {
                                confirming_cancel = true;
                                println!("Vuoi davvero annullare la valutazione in corso? (sì/no)\n");
                            } else {
                                println!("⛔ Non è possibile annullare in questa fase.\n");
                            }
                        }
                        Line::New => {
                            session.reset();
                            session.transcript_mut().clear();
                            last = None;
                            println!("🆕 Nuova conversazione. Scrivi \"rischi\" per iniziare.\n");
                        }
                        Line::Status => print_json(&status(session.register())),
                        Line::Unknown(command) => {
                            println!("Comando sconosciuto: {command}\n{COMMANDS_HELP}\n");
                        }
                        Line::Input("") => {}
                        Line::Input(text) => match session.handle_input(text).await {
                            Ok(Outcome::ReportRequested) => print_json(&report(session.register())),
                            Ok(_) => {}
                            Err(err) if err.is_user_visible() => {
                                tracing::debug!(code = err.code(), error = %err, "input not accepted");
                            }
                            Err(err) => tracing::error!(error = %err, "input dropped"),
                        },
                    }
                }
                flush(session.transcript(), &mut last);
                prompt();
            }
            Some(expiry) = expiries.recv() => {
                if session.handle_inactivity(expiry) {
                    confirming_cancel = false;
                    println!("\n⏱️ Sessione scaduta per inattività. Scrivi \"rischi\" per ricominciare.\n");
                    prompt();
                }
            }
        }
    }
    0
}
