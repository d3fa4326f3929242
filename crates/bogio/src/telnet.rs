//! Telnet IAC stripping.
//!
//! The server speaks plain lines and wants no telnet options at all, so the
//! parser removes IAC sequences from the stream and answers every
//! negotiation with a refusal:
//! - `IAC DO <opt>`   => `IAC WONT <opt>`
//! - `IAC WILL <opt>` => `IAC DONT <opt>`
//!
//! Subnegotiation blocks (`IAC SB ... IAC SE`) are swallowed whole.

const IAC: u8 = 255;
const DONT: u8 = 254;
const DO: u8 = 253;
const WONT: u8 = 252;
const WILL: u8 = 251;
const SB: u8 = 250;
const SE: u8 = 240;

#[derive(Debug, Default)]
pub struct IacParser {
    state: State,
}

#[derive(Debug, Default)]
enum State {
    #[default]
    Data,
    Iac,
    Negotiate {
        cmd: u8,
    },
    Subneg {
        iac_seen: bool,
    },
}

impl IacParser {
    pub fn new() -> Self {
        Self { state: State::Data }
    }

    /// Parse a chunk of bytes, returning `(data, replies)`:
    /// - `data`: the stream with IAC sequences removed
    /// - `replies`: refusal bytes to write back to the peer (may be empty)
    ///
    /// State carries across calls, so sequences split over reads are fine.
    pub fn parse(&mut self, chunk: &[u8]) -> (Vec<u8>, Vec<u8>) {
        let mut data = Vec::with_capacity(chunk.len());
        let mut replies = Vec::new();

        for &b in chunk {
            match &mut self.state {
                State::Data => {
                    if b == IAC {
                        self.state = State::Iac;
                    } else {
                        data.push(b);
                    }
                }
                State::Iac => match b {
                    // Escaped 0xff is a literal 0xff.
                    IAC => {
                        data.push(IAC);
                        self.state = State::Data;
                    }
                    DO | DONT | WILL | WONT => {
                        self.state = State::Negotiate { cmd: b };
                    }
                    SB => {
                        self.state = State::Subneg { iac_seen: false };
                    }
                    // Two-byte commands (NOP, GA, ...) carry nothing we want.
                    _ => {
                        self.state = State::Data;
                    }
                },
                State::Negotiate { cmd } => {
                    match *cmd {
                        // "Please do X" => "I won't".
                        DO => replies.extend_from_slice(&[IAC, WONT, b]),
                        // "I will do X" => "Please don't".
                        WILL => replies.extend_from_slice(&[IAC, DONT, b]),
                        _ => {}
                    }
                    self.state = State::Data;
                }
                State::Subneg { iac_seen } => {
                    if *iac_seen {
                        if b == SE {
                            self.state = State::Data;
                        } else {
                            // IAC IAC inside SB is an escaped payload byte;
                            // anything else we just keep skipping.
                            *iac_seen = false;
                        }
                    } else if b == IAC {
                        *iac_seen = true;
                    }
                }
            }
        }

        (data, replies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_plain_data() {
        let mut p = IacParser::new();
        let (d, r) = p.parse(b"north\r\n");
        assert_eq!(d, b"north\r\n");
        assert!(r.is_empty());
    }

    #[test]
    fn decodes_escaped_iac() {
        let mut p = IacParser::new();
        let (d, r) = p.parse(&[255, 255, b'a']);
        assert_eq!(d, vec![255, b'a']);
        assert!(r.is_empty());
    }

    #[test]
    fn refuses_do_and_will() {
        let mut p = IacParser::new();
        // IAC DO 1, IAC WILL 3, then payload.
        let (d, r) = p.parse(&[255, 253, 1, 255, 251, 3, b'x']);
        assert_eq!(d, vec![b'x']);
        assert_eq!(r, vec![255, 252, 1, 255, 254, 3]);
    }

    #[test]
    fn ignores_wont_and_dont() {
        let mut p = IacParser::new();
        let (d, r) = p.parse(&[255, 252, 1, 255, 254, 3, b'y']);
        assert_eq!(d, vec![b'y']);
        assert!(r.is_empty());
    }

    #[test]
    fn handles_negotiation_split_across_calls() {
        let mut p = IacParser::new();
        let (d1, r1) = p.parse(&[255, 253]);
        assert!(d1.is_empty());
        assert!(r1.is_empty());

        let (d2, r2) = p.parse(&[7, b'z']);
        assert_eq!(d2, vec![b'z']);
        assert_eq!(r2, vec![255, 252, 7]);
    }

    #[test]
    fn strips_subnegotiation() {
        let mut p = IacParser::new();
        // a IAC SB 24 x y IAC SE b
        let (d, r) = p.parse(&[b'a', 255, 250, 24, b'x', b'y', 255, 240, b'b']);
        assert_eq!(d, vec![b'a', b'b']);
        assert!(r.is_empty());
    }

    #[test]
    fn subnegotiation_keeps_escaped_iac_inside() {
        let mut p = IacParser::new();
        // IAC SB 24 IAC IAC IAC SE then data: the doubled IAC must not end the block.
        let (d, r) = p.parse(&[255, 250, 24, 255, 255, 255, 240, b'q']);
        assert_eq!(d, vec![b'q']);
        assert!(r.is_empty());
    }
}
