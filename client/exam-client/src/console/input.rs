use crate::models::FocusSignal;

const FOCUS_IN: &[u8] = b"\x1b[I";
const FOCUS_OUT: &[u8] = b"\x1b[O";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Focus(FocusSignal),
    Line(String),
}

/// Splits raw stdin bytes into submitted lines and terminal focus reports.
///
/// Focus reports (`ESC [ I`, `ESC [ O`) can arrive in the middle of typed text,
/// so they are cut out of the byte stream before line splitting.
#[derive(Debug, Default)]
pub struct InputDecoder {
    pending: Vec<u8>,
}

impl InputDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, bytes: &[u8]) -> Vec<InputEvent> {
        self.pending.extend_from_slice(bytes);
        let mut events = Vec::new();
        let mut line = Vec::new();
        let mut i = 0;

        while i < self.pending.len() {
            let rest = &self.pending[i..];
            if rest.starts_with(FOCUS_OUT) {
                events.push(InputEvent::Focus(FocusSignal::VisibilityLost));
                i += FOCUS_OUT.len();
            } else if rest.starts_with(FOCUS_IN) {
                events.push(InputEvent::Focus(FocusSignal::VisibilityRestored));
                i += FOCUS_IN.len();
            } else if rest[0] == 0x1b && rest.len() < FOCUS_IN.len() && FOCUS_IN.starts_with(rest)
            {
                // partial escape sequence, wait for more bytes
                break;
            } else if rest[0] == b'\n' {
                events.push(InputEvent::Line(decode_line(&line)));
                line.clear();
                i += 1;
            } else {
                line.push(rest[0]);
                i += 1;
            }
        }

        let mut carry = line;
        carry.extend_from_slice(&self.pending[i..]);
        self.pending = carry;
        events
    }

    /// Flushes an unterminated last line at end of input.
    pub fn finish(&mut self) -> Option<InputEvent> {
        if self.pending.is_empty() {
            return None;
        }
        let line = decode_line(&std::mem::take(&mut self.pending));
        Some(InputEvent::Line(line))
    }
}

fn decode_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches('\r')
        .to_string()
}

/// Commands accepted while answering questions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Zero-based option index.
    Choose(usize),
    Next,
    Previous,
    /// Zero-based question index.
    Jump(usize),
    Finish,
    Help,
    Unknown(String),
}

pub fn parse_command(line: &str) -> Command {
    let line = line.trim().to_lowercase();
    let mut parts = line.split_whitespace();
    let head = parts.next().unwrap_or_default();
    let arg = parts.next().and_then(|s| s.parse::<usize>().ok());

    match (head, arg) {
        ("n" | "keyingi", None) => Command::Next,
        ("p" | "oldingi", None) => Command::Previous,
        ("g" | "o'tish", Some(n)) if n > 0 => Command::Jump(n - 1),
        ("t" | "tugatish", None) => Command::Finish,
        ("?" | "yordam", None) => Command::Help,
        (number, None) => match number.parse::<usize>() {
            Ok(n) if n > 0 => Command::Choose(n - 1),
            _ => Command::Unknown(line.clone()),
        },
        _ => Command::Unknown(line.clone()),
    }
}

/// Answer to the finish confirmation; anything other than yes declines.
pub fn parse_confirmation(line: &str) -> bool {
    matches!(line.trim().to_lowercase().as_str(), "ha" | "h" | "yes" | "y")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_lines_and_strips_carriage_returns() {
        let mut decoder = InputDecoder::new();
        let events = decoder.feed(b"Ali Vali\r\n1234\n");
        assert_eq!(
            events,
            vec![
                InputEvent::Line("Ali Vali".into()),
                InputEvent::Line("1234".into())
            ]
        );
    }

    #[test]
    fn focus_reports_are_cut_out_of_typed_text() {
        let mut decoder = InputDecoder::new();
        let events = decoder.feed(b"ke\x1b[Oyin\x1b[Igi\n");
        assert_eq!(
            events,
            vec![
                InputEvent::Focus(FocusSignal::VisibilityLost),
                InputEvent::Focus(FocusSignal::VisibilityRestored),
                InputEvent::Line("keyingi".into()),
            ]
        );
    }

    #[test]
    fn escape_sequence_split_across_reads() {
        let mut decoder = InputDecoder::new();
        assert!(decoder.feed(b"\x1b[").is_empty());
        assert_eq!(
            decoder.feed(b"O"),
            vec![InputEvent::Focus(FocusSignal::VisibilityLost)]
        );
    }

    #[test]
    fn partial_line_is_kept_until_newline_or_finish() {
        let mut decoder = InputDecoder::new();
        assert!(decoder.feed(b"ha").is_empty());
        assert_eq!(decoder.feed(b"\n"), vec![InputEvent::Line("ha".into())]);

        decoder.feed(b"tugatish");
        assert_eq!(decoder.finish(), Some(InputEvent::Line("tugatish".into())));
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn parses_answering_commands() {
        assert_eq!(parse_command("2"), Command::Choose(1));
        assert_eq!(parse_command(" N "), Command::Next);
        assert_eq!(parse_command("oldingi"), Command::Previous);
        assert_eq!(parse_command("g 5"), Command::Jump(4));
        assert_eq!(parse_command("t"), Command::Finish);
        assert_eq!(parse_command("?"), Command::Help);
        assert_eq!(parse_command("0"), Command::Unknown("0".into()));
        assert_eq!(parse_command("g"), Command::Unknown("g".into()));
        assert_eq!(parse_command(""), Command::Unknown(String::new()));
    }

    #[test]
    fn only_explicit_yes_confirms() {
        assert!(parse_confirmation("ha"));
        assert!(parse_confirmation(" HA "));
        assert!(!parse_confirmation("yo'q"));
        assert!(!parse_confirmation(""));
    }
}
