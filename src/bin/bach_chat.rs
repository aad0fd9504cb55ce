//! Terminal chat client for the BACH AI relay.
//!
//! Usage:
//!   bach-chat [mode]
//!
//! Commands inside the prompt:
//!   /mode <chat|coding|math|image>   Switch mode and start a new conversation
//!   /new                             Start a new conversation in the same mode
//!   /attach <path>                   Attach a file to the next message
//!   /help                            Show this help
//!   /quit                            Exit
//!
//! Ctrl-C stops the reply being streamed; at the prompt it exits.
//!
//! Environment:
//!   BACH_API_URL   Relay API base (default http://localhost:5000/api)

use anyhow::Context;
use base64::Engine as _;
use bach_relay::{Attachment, ChatMode, ChatSession, RelayClient, SendOutcome};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let mode = match std::env::args().nth(1) {
        Some(arg) => arg.parse::<ChatMode>()?,
        None => ChatMode::Chat,
    };

    let client = RelayClient::from_env().context("failed to build relay client")?;
    let mut session = ChatSession::new(mode);

    let handle = session.cancel_handle();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if !handle.cancel() {
                println!();
                std::process::exit(0);
            }
        }
    });

    println!("BACH AI ({}), relay at {}", session.mode(), client.api_url());
    print_welcome(&session);

    let mut pending: Vec<Attachment> = Vec::new();
    let mut images_saved = 0usize;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        prompt(&session, pending.len());
        let Some(line) = lines.next_line().await? else { break };
        let line = line.trim();

        if let Some(command) = line.strip_prefix('/') {
            let (name, arg) = command.split_once(' ').unwrap_or((command, ""));
            match name {
                "quit" | "exit" => break,
                "help" => print_help(),
                "new" => {
                    session.reset(session.mode());
                    pending.clear();
                    print_welcome(&session);
                }
                "mode" => match arg.parse::<ChatMode>() {
                    Ok(mode) => {
                        session.reset(mode);
                        pending.clear();
                        print_welcome(&session);
                    }
                    Err(e) => eprintln!("{e}"),
                },
                "attach" => match Attachment::from_file(arg.trim()) {
                    Ok(attachment) => {
                        println!("attached {} ({})", arg.trim(), attachment.mime_type);
                        pending.push(attachment);
                    }
                    Err(e) => eprintln!("{e}"),
                },
                other => eprintln!("unknown command /{other}, try /help"),
            }
            continue;
        }

        if line.is_empty() && pending.is_empty() {
            continue;
        }

        let attachments = std::mem::take(&mut pending);
        let outcome = session
            .send(&client, line, attachments, |delta| {
                print!("{delta}");
                let _ = std::io::stdout().flush();
            })
            .await;
        println!();

        match outcome {
            Ok(SendOutcome::Cancelled) => println!("[stopped]"),
            Ok(SendOutcome::Completed) if session.mode().is_image() => {
                if let Some(reply) = session.history().last() {
                    if let Some(image) = &reply.generated_image {
                        images_saved += 1;
                        let path = format!("bach-image-{images_saved}.jpg");
                        save_image(&path, image)?;
                        println!("{}\nsaved {path}", reply.content);
                    }
                }
            }
            Ok(SendOutcome::Completed) => {}
            Err(e) => {
                if let Some(reply) = session.history().last() {
                    println!("{}", reply.content);
                }
                eprintln!("error: {e}");
            }
        }
    }

    Ok(())
}

fn save_image(path: &str, image: &str) -> anyhow::Result<()> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(image)
        .context("relay returned invalid image data")?;
    std::fs::write(path, bytes).with_context(|| format!("failed to write {path}"))?;
    Ok(())
}

fn prompt(session: &ChatSession, attachments: usize) {
    if attachments > 0 {
        print!("[{} +{attachments}]> ", session.mode());
    } else {
        print!("[{}]> ", session.mode());
    }
    let _ = std::io::stdout().flush();
}

fn print_welcome(session: &ChatSession) {
    if let Some(turn) = session.history().first() {
        println!("{}", turn.content);
    }
}

fn print_help() {
    println!(
        r#"COMMANDS:
    /mode <chat|coding|math|image>   Switch mode and start a new conversation
    /new                             Start a new conversation
    /attach <path>                   Attach a file to the next message
    /quit                            Exit

Ctrl-C stops the current reply."#
    );
}
