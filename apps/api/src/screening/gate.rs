/// Qualification gate: a resume score at or above the threshold earns an exam.
pub fn is_qualified(score: u8, threshold: u8) -> bool {
    score >= threshold
}
