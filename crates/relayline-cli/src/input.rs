//! Stdin command parsing.
//!
//! One command per line:
//!
//! - `<recipient>: <text>` sends `text` to `recipient`
//! - `/open` (re)opens the session
//! - `/status` logs the current status
//! - `/quit` shuts down

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Send a text message
    Send {
        /// Raw recipient, normalized by the client
        to: String,
        /// Message text
        text: String,
    },
    /// Open or reopen the session
    Open,
    /// Report status
    Status,
    /// Shut down
    Quit,
    /// Blank line
    Empty,
    /// Anything else
    Invalid(String),
}

/// Parse one line of input.
pub fn parse_line(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }

    if let Some(command) = line.strip_prefix('/') {
        return match command {
            "open" => Input::Open,
            "status" => Input::Status,
            "quit" | "exit" => Input::Quit,
            other => Input::Invalid(format!("unknown command /{other}")),
        };
    }

    match line.split_once(':') {
        Some((to, text)) if !to.trim().is_empty() => {
            Input::Send { to: to.trim().to_owned(), text: text.trim().to_owned() }
        },
        _ => Input::Invalid("expected `<recipient>: <text>`".to_owned()),
    }
}
