//! Line commands understood by the interactive `remote-client` binary.
//!
//! Each line read from stdin is parsed into a [`Command`].  Action commands
//! map one-to-one onto the typed [`ActionMessage`] constructors; the rest
//! drive the session controller.

use std::path::PathBuf;

use remote_core::protocol::messages::{MediaAction, MouseButton, PresentationAction};
use remote_core::ActionMessage;

/// Help text printed by the `help` command.
pub const HELP: &str = "\
commands:
  move DX DY                  relative cursor move
  click [left|right|middle] [N]
  hold [left|right|middle]    press-and-hold (drag)
  scroll N                    positive scrolls up
  type TEXT...                type literal text
  keys K1 K2...               key chord, e.g. `keys ctrl c`
  media ACTION                play_pause next previous volume_up volume_down mute
  present ACTION              start next previous end blank
  screenshot
  upload PATH                 upload a file to the host
  clip get | clip set TEXT... host clipboard
  pair CODE HOST              pair with another host
  status | connect | disconnect | unpair | help | quit";

/// One parsed line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Action(ActionMessage),
    Upload(PathBuf),
    ClipGet,
    ClipSet(String),
    Pair { code: String, host: String },
    Status,
    Connect,
    Disconnect,
    Unpair,
    Help,
    Quit,
}

/// Parses one input line.  Blank lines yield `Ok(None)`.
///
/// # Errors
///
/// Returns a usage message for unknown commands or bad arguments.
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };
    let args: Vec<&str> = rest.split_whitespace().collect();

    let command = match verb {
        "" => return Ok(None),
        "move" => match args.as_slice() {
            [dx, dy] => Command::Action(ActionMessage::mouse_move(int(dx)?, int(dy)?)),
            _ => return Err("usage: move DX DY".to_string()),
        },
        "click" => {
            let button = button(args.first().copied())?;
            let clicks = match args.get(1) {
                Some(n) => n.parse::<u32>().map_err(|_| format!("invalid click count: {n}"))?,
                None => 1,
            };
            Command::Action(ActionMessage::mouse_click(button, clicks))
        }
        "hold" => Command::Action(ActionMessage::mouse_hold(button(args.first().copied())?)),
        "scroll" => match args.as_slice() {
            [n] => Command::Action(ActionMessage::mouse_scroll(int(n)?)),
            _ => return Err("usage: scroll N".to_string()),
        },
        "type" if !rest.is_empty() => Command::Action(ActionMessage::type_text(rest)),
        "type" => return Err("usage: type TEXT".to_string()),
        "keys" if !args.is_empty() => Command::Action(ActionMessage::key_shortcut(args)),
        "keys" => return Err("usage: keys K1 K2...".to_string()),
        "media" => {
            let action = args
                .first()
                .and_then(|a| MediaAction::try_from(*a).ok())
                .ok_or_else(|| {
                    "usage: media play_pause|next|previous|volume_up|volume_down|mute".to_string()
                })?;
            Command::Action(ActionMessage::media_control(action))
        }
        "present" => {
            let action = args
                .first()
                .and_then(|a| PresentationAction::try_from(*a).ok())
                .ok_or_else(|| "usage: present start|next|previous|end|blank".to_string())?;
            Command::Action(ActionMessage::presentation_control(action))
        }
        "screenshot" => Command::Action(ActionMessage::screenshot()),
        "upload" if !rest.is_empty() => Command::Upload(PathBuf::from(rest)),
        "upload" => return Err("usage: upload PATH".to_string()),
        "clip" => match args.first().copied() {
            Some("get") => Command::ClipGet,
            Some("set") => {
                let text = rest.strip_prefix("set").unwrap_or_default().trim_start();
                Command::ClipSet(text.to_string())
            }
            _ => return Err("usage: clip get | clip set TEXT".to_string()),
        },
        "pair" => match args.as_slice() {
            [code, host] => Command::Pair {
                code: (*code).to_string(),
                host: (*host).to_string(),
            },
            _ => return Err("usage: pair CODE HOST".to_string()),
        },
        "status" => Command::Status,
        "connect" => Command::Connect,
        "disconnect" => Command::Disconnect,
        "unpair" => Command::Unpair,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("unknown command: {other} (try `help`)")),
    };
    Ok(Some(command))
}

fn int(text: &str) -> Result<i32, String> {
    text.parse().map_err(|_| format!("not an integer: {text}"))
}

fn button(name: Option<&str>) -> Result<MouseButton, String> {
    match name {
        None => Ok(MouseButton::Left),
        Some(name) => {
            MouseButton::try_from(name).map_err(|_| format!("unknown mouse button: {name}"))
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
