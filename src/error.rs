use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiningError {
    // 1人だと同じフォークを2回取ることになる
    #[error("a ring needs at least 2 seats, got {seats}")]
    TooFewSeats { seats: usize },

    #[error("{seats} seats but {names} names were given")]
    NameCountMismatch { seats: usize, names: usize },

    #[error("{philosopher} gave up waiting for fork {fork} after {waited:?}")]
    Timeout {
        philosopher: String,
        fork: usize,
        waited: Duration,
    },

    #[error("could not start {philosopher}: {reason}")]
    Spawn { philosopher: String, reason: String },

    #[error("{philosopher} panicked at the table")]
    Panicked { philosopher: String },
}

pub type Result<T> = std::result::Result<T, DiningError>;

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_timeout_message() {
        let err = DiningError::Timeout {
            philosopher: "A4".to_string(),
            fork: 0,
            waited: Duration::from_millis(250),
        };

        let msg = err.to_string();
        assert!(msg.contains("A4"));
        assert!(msg.contains("fork 0"));
        assert!(msg.contains("250ms"));
    }

    #[test]
    fn test_name_count_message() {
        let err = DiningError::NameCountMismatch { seats: 5, names: 3 };
        assert_eq!(err.to_string(), "5 seats but 3 names were given");
    }
}
