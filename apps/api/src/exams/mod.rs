pub mod codec;
pub mod generator;
pub mod grader;
pub mod handlers;
pub mod prompts;
pub mod question_source;
pub mod store;
