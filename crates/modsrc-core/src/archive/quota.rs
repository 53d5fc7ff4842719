//! Staging quota tracking.

use crate::QuotaResource;
use crate::ResolveError;
use crate::Result;
use crate::StageLimits;

/// Tracks resource usage while an archive is being staged.
#[derive(Debug, Default)]
pub struct QuotaTracker {
    entries: usize,
    bytes: u64,
}

impl QuotaTracker {
    /// Creates a new quota tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn record_entry(&mut self, limits: &StageLimits) -> Result<()> {
        self.entries = self.entries.saturating_add(1);
        if self.entries > limits.max_entries {
            return Err(ResolveError::QuotaExceeded {
                resource: QuotaResource::EntryCount {
                    current: self.entries,
                    max: limits.max_entries,
                },
            });
        }
        Ok(())
    }

    /// Records a directory entry.
    pub fn record_directory(&mut self, limits: &StageLimits) -> Result<()> {
        self.record_entry(limits)
    }

    /// Records a file entry of the declared size, before its contents are
    /// read.
    pub fn record_file(&mut self, size: u64, limits: &StageLimits) -> Result<()> {
        self.record_entry(limits)?;

        if size > limits.max_entry_size {
            return Err(ResolveError::QuotaExceeded {
                resource: QuotaResource::EntrySize {
                    size,
                    max: limits.max_entry_size,
                },
            });
        }

        self.bytes = self
            .bytes
            .checked_add(size)
            .ok_or(ResolveError::QuotaExceeded {
                resource: QuotaResource::IntegerOverflow,
            })?;

        if self.bytes > limits.max_total_size {
            return Err(ResolveError::QuotaExceeded {
                resource: QuotaResource::TotalSize {
                    current: self.bytes,
                    max: limits.max_total_size,
                },
            });
        }

        Ok(())
    }

    /// Returns the number of entries recorded.
    #[must_use]
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Returns the total declared file bytes recorded.
    #[must_use]
    pub fn bytes(&self) -> u64 {
        self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_within_limits() {
        let mut tracker = QuotaTracker::new();
        let limits = StageLimits::default();

        assert!(tracker.record_directory(&limits).is_ok());
        assert!(tracker.record_file(1000, &limits).is_ok());
        assert_eq!(tracker.entries(), 2);
        assert_eq!(tracker.bytes(), 1000);
    }

    #[test]
    fn test_exceed_entry_count() {
        let mut tracker = QuotaTracker::new();
        let limits = StageLimits {
            max_entries: 2,
            ..Default::default()
        };

        assert!(tracker.record_directory(&limits).is_ok());
        assert!(tracker.record_file(1, &limits).is_ok());
        let result = tracker.record_file(1, &limits);
        assert!(matches!(
            result,
            Err(ResolveError::QuotaExceeded {
                resource: QuotaResource::EntryCount { current: 3, max: 2 }
            })
        ));
    }

    #[test]
    fn test_exceed_entry_size() {
        let mut tracker = QuotaTracker::new();
        let limits = StageLimits {
            max_entry_size: 1000,
            ..Default::default()
        };

        let result = tracker.record_file(2000, &limits);
        assert!(matches!(
            result,
            Err(ResolveError::QuotaExceeded {
                resource: QuotaResource::EntrySize { .. }
            })
        ));
    }

    #[test]
    fn test_exceed_total_size() {
        let mut tracker = QuotaTracker::new();
        let limits = StageLimits {
            max_total_size: 1000,
            ..Default::default()
        };

        assert!(tracker.record_file(600, &limits).is_ok());
        let result = tracker.record_file(500, &limits);
        assert!(matches!(
            result,
            Err(ResolveError::QuotaExceeded {
                resource: QuotaResource::TotalSize { current: 1100, max: 1000 }
            })
        ));
    }

    #[test]
    fn test_overflow_detected() {
        let mut tracker = QuotaTracker::new();
        let limits = StageLimits::unlimited();

        assert!(tracker.record_file(u64::MAX, &limits).is_ok());
        let result = tracker.record_file(1, &limits);
        assert!(matches!(
            result,
            Err(ResolveError::QuotaExceeded {
                resource: QuotaResource::IntegerOverflow
            })
        ));
    }
}
