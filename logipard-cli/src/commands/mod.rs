//! CLI command implementations.

pub mod compile;
pub mod dump;
pub mod init;

pub use compile::compile_project;
pub use dump::dump_model;
pub use init::init_project;
