use std::fmt;

use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;

/// Hard ceiling the WebSocket close frame puts on the reason text, in bytes.
pub const REASON_MAX_LEN: usize = 123;

/// Truncate diagnostic text to fit the close frame's reason field.
///
/// Input at or under the limit passes through unchanged; longer input is
/// cut to the longest prefix that fits on a char boundary. Truncation is
/// the contract here: over-long text must never be rejected.
pub fn trim_reason(text: &str) -> String {
    if text.len() <= REASON_MAX_LEN {
        return text.to_string();
    }
    let mut end = REASON_MAX_LEN;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseCode {
    /// Normal completion (1000).
    Normal,
    /// The server encountered an unexpected condition (1011).
    UnexpectedCondition,
    /// Any other code from the wire.
    Other(u16),
}

impl CloseCode {
    pub fn as_u16(self) -> u16 {
        match self {
            CloseCode::Normal => 1000,
            CloseCode::UnexpectedCondition => 1011,
            CloseCode::Other(code) => code,
        }
    }
}

impl From<u16> for CloseCode {
    fn from(code: u16) -> Self {
        match code {
            1000 => CloseCode::Normal,
            1011 => CloseCode::UnexpectedCondition,
            other => CloseCode::Other(other),
        }
    }
}

/// The (code, text) pair attached when proactively terminating a connection.
///
/// The constructor applies [`trim_reason`], so any text stored here already
/// fits the wire limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseReason {
    code: CloseCode,
    text: String,
}

impl CloseReason {
    pub fn new(code: CloseCode, text: impl Into<String>) -> Self {
        Self {
            code,
            text: trim_reason(&text.into()),
        }
    }

    pub fn unexpected(text: impl Into<String>) -> Self {
        Self::new(CloseCode::UnexpectedCondition, text)
    }

    pub fn code(&self) -> CloseCode {
        self.code
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn to_frame(&self) -> CloseFrame<'static> {
        CloseFrame {
            code: WsCloseCode::from(self.code.as_u16()),
            reason: self.text.clone().into(),
        }
    }
}

impl From<CloseFrame<'_>> for CloseReason {
    fn from(frame: CloseFrame<'_>) -> Self {
        Self::new(CloseCode::from(u16::from(frame.code)), frame.reason)
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.code.as_u16(), self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_short_input_is_identity() {
        assert_eq!(trim_reason(""), "");
        assert_eq!(trim_reason("connection reset"), "connection reset");

        let exactly_limit = "x".repeat(REASON_MAX_LEN);
        assert_eq!(trim_reason(&exactly_limit), exactly_limit);
    }

    #[test]
    fn test_trim_long_input_yields_exact_prefix() {
        let long = "y".repeat(REASON_MAX_LEN + 57);
        let trimmed = trim_reason(&long);
        assert_eq!(trimmed.len(), REASON_MAX_LEN);
        assert_eq!(trimmed, long[..REASON_MAX_LEN]);

        let just_over = "z".repeat(REASON_MAX_LEN + 1);
        assert_eq!(trim_reason(&just_over).len(), REASON_MAX_LEN);
    }

    #[test]
    fn test_trim_respects_char_boundaries() {
        // 'é' is two bytes; 62 of them straddle the 123-byte limit.
        let multibyte = "é".repeat(62);
        let trimmed = trim_reason(&multibyte);
        assert!(trimmed.len() <= REASON_MAX_LEN);
        assert_eq!(trimmed, "é".repeat(61));
    }

    #[test]
    fn test_close_reason_truncates_on_construction() {
        let reason = CloseReason::unexpected("e".repeat(500));
        assert_eq!(reason.code(), CloseCode::UnexpectedCondition);
        assert_eq!(reason.text().len(), REASON_MAX_LEN);

        let reason = CloseReason::new(CloseCode::Normal, "bye");
        assert_eq!(reason.text(), "bye");
    }

    #[test]
    fn test_close_code_round_trip() {
        assert_eq!(CloseCode::from(1000), CloseCode::Normal);
        assert_eq!(CloseCode::from(1011), CloseCode::UnexpectedCondition);
        assert_eq!(CloseCode::from(4000), CloseCode::Other(4000));
        assert_eq!(CloseCode::Other(4000).as_u16(), 4000);
        assert_eq!(CloseCode::UnexpectedCondition.as_u16(), 1011);
    }
}
