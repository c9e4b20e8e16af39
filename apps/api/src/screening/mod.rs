pub mod extract;
pub mod gate;
pub mod handlers;
pub mod parser;
pub mod pipeline;
pub mod scoring;
pub mod storage;
pub mod store;
