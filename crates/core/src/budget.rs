//! Time-slice budgets for cooperative, resumable engines.

use std::time::{Duration, Instant};

/// A bounded amount of work an engine may do before returning control.
///
/// A budget ends at a wall-clock deadline, after a number of work units
/// (pair evaluations or candidate probes), or at whichever comes first.
/// Unit-limited budgets make engines fully deterministic in tests.
#[derive(Debug, Clone)]
pub struct Budget {
    deadline: Option<Instant>,
    max_units: Option<usize>,
    used: usize,
}

impl Budget {
    /// A budget that never runs out.
    pub fn unlimited() -> Self {
        Self {
            deadline: None,
            max_units: None,
            used: 0,
        }
    }

    /// A budget ending `ms` milliseconds from now (0 = unlimited).
    pub fn from_millis(ms: u64) -> Self {
        if ms == 0 {
            return Self::unlimited();
        }
        Self::until(Instant::now() + Duration::from_millis(ms))
    }

    /// A budget ending at `deadline`.
    pub fn until(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            max_units: None,
            used: 0,
        }
    }

    /// A budget of exactly `units` work units and no deadline.
    pub fn units(units: usize) -> Self {
        Self {
            deadline: None,
            max_units: Some(units),
            used: 0,
        }
    }

    /// Adds a unit cap to this budget.
    pub fn with_max_units(mut self, units: usize) -> Self {
        self.max_units = Some(units);
        self
    }

    /// Tightens the deadline; the earlier of the two wins.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    /// Records one unit of work.
    #[inline]
    pub fn consume(&mut self) {
        self.used += 1;
    }

    /// Number of units consumed so far.
    #[inline]
    pub fn used(&self) -> usize {
        self.used
    }

    /// The wall-clock deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// True once the unit cap is reached or the deadline has passed.
    pub fn is_exhausted(&self) -> bool {
        if let Some(max) = self.max_units {
            if self.used >= max {
                return true;
            }
        }
        match self.deadline {
            Some(deadline) => Instant::now() >= deadline,
            None => false,
        }
    }
}

impl Default for Budget {
    fn default() -> Self {
        Self::unlimited()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unlimited_never_exhausts() {
        let mut budget = Budget::unlimited();
        for _ in 0..10_000 {
            budget.consume();
        }
        assert!(!budget.is_exhausted());
        assert_eq!(budget.used(), 10_000);
    }

    #[test]
    fn test_unit_budget() {
        let mut budget = Budget::units(3);
        assert!(!budget.is_exhausted());
        budget.consume();
        budget.consume();
        assert!(!budget.is_exhausted());
        budget.consume();
        assert!(budget.is_exhausted());
    }

    #[test]
    fn test_zero_millis_is_unlimited() {
        assert!(Budget::from_millis(0).deadline().is_none());
    }

    #[test]
    fn test_past_deadline_is_exhausted() {
        let budget = Budget::until(Instant::now() - Duration::from_millis(1));
        assert!(budget.is_exhausted());
    }

    #[test]
    fn test_with_deadline_keeps_earliest() {
        let now = Instant::now();
        let early = now + Duration::from_millis(10);
        let late = now + Duration::from_secs(10);
        let budget = Budget::until(early).with_deadline(late);
        assert_eq!(budget.deadline(), Some(early));
    }
}
