//! Callback result: what the consumer should do with a delivered envelope.

use serde::{Deserialize, Serialize};

/// The closed set of answers a callback can give.
///
/// Integer result codes (as used by producers/consumers in other languages) map onto it
/// with [`CallbackResult::from_code`]: 1 is `Requeue`, 2 is `Stop`, and everything else
/// (including 0) is `Ack`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallbackResult {
    /// Done. The envelope was already popped, so nothing else happens.
    #[default]
    Ack,

    /// Deliver again later (tail of the queue), unless the delivery ceiling is reached.
    Requeue,

    /// Finish this item, then leave the consume loop.
    Stop,
}

impl CallbackResult {
    pub const ACK_CODE: i64 = 0;
    pub const REQUEUE_CODE: i64 = 1;
    pub const STOP_CODE: i64 = 2;

    pub fn from_code(code: i64) -> Self {
        match code {
            Self::REQUEUE_CODE => CallbackResult::Requeue,
            Self::STOP_CODE => CallbackResult::Stop,
            _ => CallbackResult::Ack,
        }
    }

    pub fn code(self) -> i64 {
        match self {
            CallbackResult::Ack => Self::ACK_CODE,
            CallbackResult::Requeue => Self::REQUEUE_CODE,
            CallbackResult::Stop => Self::STOP_CODE,
        }
    }
}

impl From<i64> for CallbackResult {
    fn from(code: i64) -> Self {
        Self::from_code(code)
    }
}

/// `()` を返す callback は Ack 扱い
impl From<()> for CallbackResult {
    fn from(_: ()) -> Self {
        CallbackResult::Ack
    }
}

impl From<Option<CallbackResult>> for CallbackResult {
    fn from(result: Option<CallbackResult>) -> Self {
        result.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::zero(0, CallbackResult::Ack)]
    #[case::requeue(1, CallbackResult::Requeue)]
    #[case::stop(2, CallbackResult::Stop)]
    #[case::unknown_positive(3, CallbackResult::Ack)]
    #[case::negative(-1, CallbackResult::Ack)]
    #[case::large(i64::MAX, CallbackResult::Ack)]
    fn codes_map_to_results(#[case] code: i64, #[case] expected: CallbackResult) {
        assert_eq!(CallbackResult::from(code), expected);
    }

    #[test]
    fn none_and_unit_are_ack() {
        assert_eq!(CallbackResult::from(None), CallbackResult::Ack);
        assert_eq!(CallbackResult::from(()), CallbackResult::Ack);
        assert_eq!(
            CallbackResult::from(Some(CallbackResult::Stop)),
            CallbackResult::Stop
        );
    }

    #[test]
    fn code_is_inverse_of_from_code_for_known_results() {
        for result in [CallbackResult::Ack, CallbackResult::Requeue, CallbackResult::Stop] {
            assert_eq!(CallbackResult::from_code(result.code()), result);
        }
    }
}
