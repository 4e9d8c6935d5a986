use std::str::FromStr;

use thiserror::Error;

use crate::signaling::protocol::{RoomId, UserId};

/// What the user asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    Join { room_id: RoomId, video: bool },
    Leave,
    Call { user_id: UserId, video: bool },
    Accept,
    Decline,
    End,
    /// Camera on/off: in the call when one is active, else in the room.
    Camera,
    /// Screen share on/off, same routing as `Camera`.
    Screen,
    Mute,
    Deafen,
    Whisper(Option<UserId>),
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command {0:?}")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
}

impl FromStr for ClientCommand {
    type Err = CommandParseError;

    /// One line of user input, e.g. `join general`, `call bob video`.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let cmd = words.next().ok_or(CommandParseError::Empty)?;
        let arg = words.next();
        let video = words.next().is_some_and(|w| w.eq_ignore_ascii_case("video"));
        Ok(match cmd.to_ascii_lowercase().as_str() {
            "join" => Self::Join {
                room_id: arg.ok_or(CommandParseError::Usage("join <room> [video]"))?.to_owned(),
                video,
            },
            "leave" => Self::Leave,
            "call" => Self::Call {
                user_id: arg.ok_or(CommandParseError::Usage("call <user> [video]"))?.to_owned(),
                video,
            },
            "accept" => Self::Accept,
            "decline" => Self::Decline,
            "end" | "hangup" => Self::End,
            "camera" => Self::Camera,
            "screen" => Self::Screen,
            "mute" => Self::Mute,
            "deafen" => Self::Deafen,
            "whisper" => Self::Whisper(arg.map(str::to_owned)),
            "quit" | "exit" => Self::Quit,
            other => return Err(CommandParseError::Unknown(other.to_owned())),
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    #[test]
    fn parses_commands_with_arguments() {
        assert_eq!(
            "call bob video".parse::<ClientCommand>().unwrap(),
            ClientCommand::Call {
                user_id: "bob".into(),
                video: true
            }
        );
        assert_eq!(
            "join general".parse::<ClientCommand>().unwrap(),
            ClientCommand::Join {
                room_id: "general".into(),
                video: false
            }
        );
        assert_eq!(
            "whisper".parse::<ClientCommand>().unwrap(),
            ClientCommand::Whisper(None)
        );
        assert_eq!("  QUIT ".parse::<ClientCommand>().unwrap(), ClientCommand::Quit);
    }

    #[test]
    fn rejects_bad_input() {
        assert_eq!("".parse::<ClientCommand>(), Err(CommandParseError::Empty));
        assert!(matches!(
            "call".parse::<ClientCommand>(),
            Err(CommandParseError::Usage(_))
        ));
        assert!(matches!(
            "dance".parse::<ClientCommand>(),
            Err(CommandParseError::Unknown(_))
        ));
    }
}
