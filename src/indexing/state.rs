//! Per-file state machine driving the Incremental Indexer.
//!
//! Grounded on the teacher's `indexing/file_info.rs` hash-based change
//! detection, generalized into the explicit states the spec names.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    Unseen,
    Scheduled,
    Parsed,
    Stored,
    Failed { attempts: u8 },
    Parked,
    Deleted,
}

impl FileState {
    pub fn on_discovered(self) -> Self {
        match self {
            Self::Unseen => Self::Scheduled,
            other => other,
        }
    }

    pub fn on_parsed(self) -> Self {
        Self::Parsed
    }

    pub fn on_committed(self) -> Self {
        Self::Stored
    }

    pub fn on_content_changed(self) -> Self {
        Self::Scheduled
    }

    pub fn on_removed(self) -> Self {
        Self::Deleted
    }

    /// A failed file is retried at most 3 times with exponential backoff,
    /// then parked.
    pub fn on_failure(self) -> Self {
        let attempts = match self {
            Self::Failed { attempts } => attempts + 1,
            _ => 1,
        };
        if attempts >= 3 {
            Self::Parked
        } else {
            Self::Failed { attempts }
        }
    }

    pub fn backoff(attempts: u8) -> std::time::Duration {
        std::time::Duration::from_millis(250 * 2u64.pow(attempts as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_is_retried_three_times_then_parked() {
        let mut state = FileState::Scheduled;
        for expected_attempts in 1..=3u8 {
            state = state.on_failure();
            if expected_attempts < 3 {
                assert_eq!(state, FileState::Failed { attempts: expected_attempts });
            } else {
                assert_eq!(state, FileState::Parked);
            }
        }
    }

    #[test]
    fn backoff_grows_exponentially() {
        assert!(FileState::backoff(2) > FileState::backoff(1));
        assert!(FileState::backoff(1) > FileState::backoff(0));
    }
}
