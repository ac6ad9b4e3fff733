//! Operator loop on stdin/stdout.
//!
//! Lines starting with `/` are commands. Anything else is collected as a
//! paste; an empty line hands the collected text to the controller.

use crate::controller::{Ingested, SessionController};
use crate::peer::Transport;
use crate::surface::OperatorSurface;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

const HELP: &str = "\
commands:
  /media       start local capture
  /start       create an offer (starts capture if needed)
  /hangup      close the current session
  /stop-media  stop local capture
  /status      show role and state
  /quit        hang up and exit
paste an offer, answer or candidates, then an empty line to submit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Media,
    Start,
    HangUp,
    StopMedia,
    Status,
    Help,
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Option<Command> {
        let cmd = match line.trim() {
            "/media" => Command::Media,
            "/start" | "/call" => Command::Start,
            "/hangup" | "/stop" => Command::HangUp,
            "/stop-media" => Command::StopMedia,
            "/status" => Command::Status,
            "/help" | "/?" => Command::Help,
            "/quit" | "/exit" => Command::Quit,
            _ => return None,
        };
        Some(cmd)
    }
}

/// Pasted lines waiting for the terminating blank line.
#[derive(Debug, Default)]
pub struct PasteBuffer {
    lines: Vec<String>,
}

impl PasteBuffer {
    /// Adds a line. Returns the whole paste once a blank line closes it.
    pub fn push(&mut self, line: &str) -> Option<String> {
        if !line.trim().is_empty() {
            self.lines.push(line.to_string());
            return None;
        }
        if self.lines.is_empty() {
            return None;
        }
        let text = self.lines.join("\n");
        self.lines.clear();
        Some(text)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Runs until `/quit` or end of input, then closes the session.
pub async fn run<T, S>(controller: &mut SessionController<T, S>) -> std::io::Result<()>
where
    T: Transport,
    S: OperatorSurface<T::RemoteStream>,
{
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut paste = PasteBuffer::default();
    eprintln!("{HELP}");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    debug!("stdin closed");
                    break;
                };
                if paste.is_empty() {
                    if let Some(cmd) = Command::parse(&line) {
                        if !execute(controller, cmd).await {
                            break;
                        }
                        continue;
                    }
                }
                if let Some(text) = paste.push(&line) {
                    // errors were already shown through the surface
                    if let Ok(Ingested::Candidates { accepted, rejected }) =
                        controller.ingest_text(&text).await
                    {
                        eprintln!("{accepted} candidate(s) accepted, {rejected} rejected");
                    }
                }
            }
            work = controller.next_background() => {
                controller.handle_background(work).await;
            }
        }
    }

    controller.hang_up().await;
    info!("Bye");
    Ok(())
}

/// Returns false when the loop should stop.
async fn execute<T, S>(controller: &mut SessionController<T, S>, cmd: Command) -> bool
where
    T: Transport,
    S: OperatorSurface<T::RemoteStream>,
{
    match cmd {
        Command::Media => {
            let _ = controller.acquire_local_media().await;
        }
        Command::Start => {
            let _ = controller.start().await;
        }
        Command::HangUp => controller.hang_up().await,
        Command::StopMedia => controller.stop_local_media(),
        Command::Status => eprintln!(
            "role: {}, state: {}, local media: {}",
            controller.role(),
            controller.state(),
            if controller.has_local_media() { "on" } else { "off" }
        ),
        Command::Help => eprintln!("{HELP}"),
        Command::Quit => return false,
    }
    true
}
