pub mod flags;
pub mod handlers;
pub mod machine;
pub mod service;
pub mod store;
