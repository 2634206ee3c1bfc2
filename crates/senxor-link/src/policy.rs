use std::time::Duration;

use crate::error::ErrorKind;

/// Retry behavior for one class of link error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorPolicy {
    /// How many times the failed operation is re-attempted.
    pub retries: u32,
    /// Pause between attempts.
    pub retry_interval: Duration,
}

impl ErrorPolicy {
    const RETRY_INTERVAL: Duration = Duration::from_millis(100);

    /// The policy for the given error kind, or `None` for errors that must
    /// surface immediately without closing the link.
    ///
    /// Wire corruption is worth several attempts because the decoder
    /// realigns itself between them. Exhausting a policy's retries marks
    /// the link closed. Validation and no-module errors are outside the
    /// table: they say nothing about the health of the connection.
    pub fn for_kind(kind: ErrorKind) -> Option<Self> {
        let retries = match kind {
            ErrorKind::AckTimeout | ErrorKind::InvalidHeader => 3,
            ErrorKind::InvalidBody | ErrorKind::ChecksumMismatch => 10,
            ErrorKind::LostConnection => 0,
            ErrorKind::NotConnected | ErrorKind::NoModule | ErrorKind::Validation => return None,
        };
        Some(Self {
            retries,
            retry_interval: Self::RETRY_INTERVAL,
        })
    }
}

#[cfg(test)]
mod tests {
    use senxor_wire::WireError;

    use super::*;
    use crate::error::LinkError;

    #[test]
    fn test_timeouts_are_retried() {
        let policy = ErrorPolicy::for_kind(ErrorKind::AckTimeout).unwrap();
        assert_eq!(policy.retries, 3);
        assert_eq!(policy.retry_interval, Duration::from_millis(100));
    }

    #[test]
    fn test_corruption_is_retried_generously() {
        assert_eq!(ErrorPolicy::for_kind(ErrorKind::InvalidBody).unwrap().retries, 10);
        assert_eq!(
            ErrorPolicy::for_kind(ErrorKind::ChecksumMismatch).unwrap().retries,
            10
        );
    }

    #[test]
    fn test_connection_state_errors_are_final() {
        assert_eq!(ErrorPolicy::for_kind(ErrorKind::LostConnection).unwrap().retries, 0);
        assert!(ErrorPolicy::for_kind(ErrorKind::NotConnected).is_none());
        assert!(ErrorPolicy::for_kind(ErrorKind::NoModule).is_none());
        assert!(ErrorPolicy::for_kind(ErrorKind::Validation).is_none());
    }

    #[test]
    fn test_fatal_decode_errors_classify_as_lost_connection() {
        let err = LinkError::Decode(WireError::MisalignedBuffer { attempts: 4 });
        assert_eq!(err.kind(), ErrorKind::LostConnection);
        let err = LinkError::Decode(WireError::ParseFailed { attempts: 4 });
        assert_eq!(err.kind(), ErrorKind::LostConnection);
    }

    #[test]
    fn test_empty_address_list_classifies_as_validation() {
        let err = LinkError::Decode(WireError::NoAddresses);
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(ErrorPolicy::for_kind(err.kind()).is_none());
    }
}
