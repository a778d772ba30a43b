//! Pressure levels and point-in-time usage snapshots.

/// Coarse classification of how full the manager's budget is.
///
/// The thresholds match the ones documented on the parent module: 70%
/// (Moderate), 85% (High), and 95% (Critical).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PressureLevel {
    /// Usage below the moderate threshold; no action needed.
    Normal,
    /// Usage has crossed the moderate threshold; consumers should consider
    /// spilling or evicting cold state.
    Moderate,
    /// Usage has crossed the high threshold; consumers should spill
    /// aggressively.
    High,
    /// Usage has crossed the critical threshold; new allocations should be
    /// refused until pressure subsides.
    Critical,
}

impl PressureLevel {
    /// Classifies a usage fraction (0.0–1.0+) against the given thresholds.
    #[must_use]
    pub fn classify(fraction: f64, moderate: f64, high: f64, critical: f64) -> Self {
        if fraction >= critical {
            Self::Critical
        } else if fraction >= high {
            Self::High
        } else if fraction >= moderate {
            Self::Moderate
        } else {
            Self::Normal
        }
    }

    /// Whether a [`MemoryConsumer`](super::MemoryConsumer) should respond to
    /// this level by spilling.
    #[must_use]
    pub fn should_spill(self) -> bool {
        self >= Self::Moderate
    }

    /// Whether new allocations should be refused at this level.
    #[must_use]
    pub fn is_critical(self) -> bool {
        self == Self::Critical
    }
}

/// A point-in-time snapshot of the manager's usage.
#[derive(Debug, Clone, Copy)]
pub struct BufferStats {
    /// Bytes currently granted across all regions.
    pub used_bytes: u64,
    /// Total configured budget in bytes.
    pub budget_bytes: u64,
    /// Current pressure classification.
    pub pressure: PressureLevel,
}

impl BufferStats {
    /// Fraction of the budget currently in use.
    #[must_use]
    pub fn fraction(&self) -> f64 {
        if self.budget_bytes == 0 {
            return 0.0;
        }
        self.used_bytes as f64 / self.budget_bytes as f64
    }
}
