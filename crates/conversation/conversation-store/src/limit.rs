/// Upper bound on the number of messages kept per conversation.
///
/// When an append pushes a history past the bound, the oldest messages are evicted.
/// Turns are appended in pairs, so an even bound evicts whole turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryLimit {
    #[default]
    Unbounded,
    MaxMessages(usize),
}

impl HistoryLimit {
    /// Default bound used by the bot when configuration does not say otherwise.
    pub const DEFAULT_MAX_MESSAGES: usize = 50;

    /// `0` means unbounded, matching the `HISTORY_MAX_MESSAGES` convention.
    pub fn from_max_messages(max: usize) -> Self {
        if max == 0 {
            HistoryLimit::Unbounded
        } else {
            HistoryLimit::MaxMessages(max)
        }
    }

    pub fn max_messages(&self) -> Option<usize> {
        match self {
            HistoryLimit::Unbounded => None,
            HistoryLimit::MaxMessages(max) => Some(*max),
        }
    }

    /// How many of the oldest messages to drop from a history of length `len`.
    pub fn excess(&self, len: usize) -> usize {
        match self {
            HistoryLimit::Unbounded => 0,
            HistoryLimit::MaxMessages(max) => len.saturating_sub(*max),
        }
    }
}
