//! When proctoring signals mark an attempt as flagged.

use crate::models::attempt::{FlagKind, ProctoringFlag};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagPolicy {
    /// Occurrences of one recurring kind needed before the attempt is flagged.
    pub recurrence_threshold: usize,
}

impl Default for FlagPolicy {
    fn default() -> Self {
        Self {
            recurrence_threshold: 3,
        }
    }
}

impl FlagPolicy {
    /// `flags` is the full history including the newest entry.
    /// `multiple_faces` flags immediately; any other kind once it has been
    /// seen `recurrence_threshold` times.
    pub fn should_flag(&self, flags: &[ProctoringFlag]) -> bool {
        flags.iter().any(|f| f.kind == FlagKind::MultipleFaces)
            || [FlagKind::NoFace, FlagKind::LookingAway, FlagKind::TabSwitch]
                .iter()
                .any(|kind| flags.iter().filter(|f| f.kind == *kind).count() >= self.recurrence_threshold)
    }
}
