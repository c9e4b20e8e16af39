pub mod attempt;
pub mod exam;
pub mod resume;
pub mod role;
