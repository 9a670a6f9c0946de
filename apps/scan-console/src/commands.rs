//! # Console Input
//!
//! Each input line is either a control command or a simulated frame:
//!
//! ```text
//!   :start  :stop  :retry  :switch     session lifecycle
//!   :pause  :resume                    manual pause
//!   :zoom+  :zoom-  :pan <dx> <dy>     digital zoom
//!   :torch                             video constraint passthrough
//!   :status :cart   :clear  :help      inspection
//!   :quit                              exit
//!   !<message>                         frame error (e.g. "!NotAllowedError")
//!   anything else                      decoded barcode text
//! ```

/// One parsed input line.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Start,
    Stop,
    Retry,
    Switch,
    Pause,
    Resume,
    ZoomIn,
    ZoomOut,
    Pan { dx: f64, dy: f64 },
    Torch,
    Status,
    Cart,
    Clear,
    Help,
    Quit,
    FrameError(String),
    Decoded(String),
    Empty,
    Unknown(String),
}

pub const HELP: &str = "\
:start :stop :retry :switch    session lifecycle
:pause :resume                 manual pause
:zoom+ :zoom- :pan <dx> <dy>   digital zoom
:torch                         turn the torch on
:status :cart :clear           inspect state
:quit                          exit
!<message>                     simulate a frame error
<text>                         simulate a decoded barcode";

impl ConsoleCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return ConsoleCommand::Empty;
        }

        if let Some(message) = line.strip_prefix('!') {
            return ConsoleCommand::FrameError(message.trim().to_string());
        }

        let Some(command) = line.strip_prefix(':') else {
            return ConsoleCommand::Decoded(line.to_string());
        };

        let mut parts = command.split_whitespace();
        match parts.next().unwrap_or_default() {
            "start" => ConsoleCommand::Start,
            "stop" => ConsoleCommand::Stop,
            "retry" => ConsoleCommand::Retry,
            "switch" => ConsoleCommand::Switch,
            "pause" => ConsoleCommand::Pause,
            "resume" => ConsoleCommand::Resume,
            "zoom+" => ConsoleCommand::ZoomIn,
            "zoom-" => ConsoleCommand::ZoomOut,
            "pan" => {
                let dx = parts.next().and_then(|v| v.parse().ok());
                let dy = parts.next().and_then(|v| v.parse().ok());
                match (dx, dy) {
                    (Some(dx), Some(dy)) => ConsoleCommand::Pan { dx, dy },
                    _ => ConsoleCommand::Unknown(line.to_string()),
                }
            }
            "torch" => ConsoleCommand::Torch,
            "status" => ConsoleCommand::Status,
            "cart" => ConsoleCommand::Cart,
            "clear" => ConsoleCommand::Clear,
            "help" | "?" => ConsoleCommand::Help,
            "quit" | "exit" | "q" => ConsoleCommand::Quit,
            _ => ConsoleCommand::Unknown(line.to_string()),
        }
    }
}
