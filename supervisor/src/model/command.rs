use crate::model::{Error, Result};

/// One command on the wire is one ASCII byte; there is no framing and no
/// acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Exit,
    Hangup,
    Interrupt,
}

impl Command {
    pub const fn byte(self) -> u8 {
        match self {
            Command::Start => b'+',
            Command::Stop => b'-',
            Command::Exit => b'x',
            Command::Hangup => b'h',
            Command::Interrupt => b'i',
        }
    }

    pub const fn from_byte(byte: u8) -> Option<Command> {
        match byte {
            b'+' => Some(Command::Start),
            b'-' => Some(Command::Stop),
            b'x' => Some(Command::Exit),
            b'h' => Some(Command::Hangup),
            b'i' => Some(Command::Interrupt),
            _ => None,
        }
    }
}

impl TryFrom<&str> for Command {
    type Error = Error;

    fn try_from(name: &str) -> Result<Self> {
        match name {
            "start" => Ok(Command::Start),
            "stop" => Ok(Command::Stop),
            "exit" => Ok(Command::Exit),
            "hup" => Ok(Command::Hangup),
            "int" => Ok(Command::Interrupt),
            v => Err(Error::UnknownCommand(v.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_map_to_wire_bytes() {
        assert_eq!(Command::try_from("start").unwrap().byte(), b'+');
        assert_eq!(Command::try_from("stop").unwrap().byte(), b'-');
        assert_eq!(Command::try_from("exit").unwrap().byte(), b'x');
        assert_eq!(Command::try_from("hup").unwrap().byte(), b'h');
        assert_eq!(Command::try_from("int").unwrap().byte(), b'i');
    }

    #[test]
    fn bytes_round_trip() {
        for cmd in [
            Command::Start,
            Command::Stop,
            Command::Exit,
            Command::Hangup,
            Command::Interrupt,
        ] {
            assert_eq!(Command::from_byte(cmd.byte()), Some(cmd));
        }
    }

    #[test]
    fn unknown_byte_is_rejected() {
        assert_eq!(Command::from_byte(b'?'), None);
        assert_eq!(Command::from_byte(0), None);
    }

    #[test]
    fn unknown_name_is_rejected() {
        match Command::try_from("restart") {
            Err(Error::UnknownCommand(name)) => assert_eq!(name, "restart"),
            other => panic!("expected UnknownCommand, got {other:?}"),
        }
    }

    #[test]
    fn names_are_case_sensitive() {
        assert!(Command::try_from("Start").is_err());
        assert!(Command::try_from("EXIT").is_err());
    }
}
