/// A caught signal, reified as the single byte the handler pushes through the
/// self-pipe.  The event loop dispatches on the byte, never on the signal
/// itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalToken {
    Alarm,
    Child,
    Hangup,
    Interrupt,
    Terminate,
    User1,
    User2,
}

impl SignalToken {
    pub const fn byte(self) -> u8 {
        match self {
            SignalToken::Alarm => b'A',
            SignalToken::Child => b'C',
            SignalToken::Hangup => b'H',
            SignalToken::Interrupt => b'I',
            SignalToken::Terminate => b'T',
            SignalToken::User1 => b'1',
            SignalToken::User2 => b'2',
        }
    }

    pub const fn from_byte(byte: u8) -> Option<SignalToken> {
        match byte {
            b'A' => Some(SignalToken::Alarm),
            b'C' => Some(SignalToken::Child),
            b'H' => Some(SignalToken::Hangup),
            b'I' => Some(SignalToken::Interrupt),
            b'T' => Some(SignalToken::Terminate),
            b'1' => Some(SignalToken::User1),
            b'2' => Some(SignalToken::User2),
            _ => None,
        }
    }

    /// Map a raw signal number to its token.  Called from the signal handler,
    /// so it must stay a pure table.
    pub const fn from_raw_signal(sig: libc::c_int) -> Option<SignalToken> {
        match sig {
            libc::SIGALRM => Some(SignalToken::Alarm),
            libc::SIGCHLD => Some(SignalToken::Child),
            libc::SIGHUP => Some(SignalToken::Hangup),
            libc::SIGINT => Some(SignalToken::Interrupt),
            libc::SIGTERM => Some(SignalToken::Terminate),
            libc::SIGUSR1 => Some(SignalToken::User1),
            libc::SIGUSR2 => Some(SignalToken::User2),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [SignalToken; 7] = [
        SignalToken::Alarm,
        SignalToken::Child,
        SignalToken::Hangup,
        SignalToken::Interrupt,
        SignalToken::Terminate,
        SignalToken::User1,
        SignalToken::User2,
    ];

    #[test]
    fn bytes_round_trip() {
        for token in ALL {
            assert_eq!(SignalToken::from_byte(token.byte()), Some(token));
        }
    }

    #[test]
    fn tokens_are_distinct() {
        for a in ALL {
            for b in ALL {
                if a != b {
                    assert_ne!(a.byte(), b.byte());
                }
            }
        }
    }

    #[test]
    fn caught_signals_map_to_tokens() {
        assert_eq!(
            SignalToken::from_raw_signal(libc::SIGCHLD),
            Some(SignalToken::Child)
        );
        assert_eq!(
            SignalToken::from_raw_signal(libc::SIGALRM),
            Some(SignalToken::Alarm)
        );
        assert_eq!(SignalToken::from_raw_signal(libc::SIGQUIT), None);
    }

    #[test]
    fn unknown_byte_is_rejected() {
        assert_eq!(SignalToken::from_byte(b'x'), None);
        assert_eq!(SignalToken::from_byte(b'3'), None);
    }
}
