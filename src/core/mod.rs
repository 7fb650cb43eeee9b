pub mod config;
pub mod exit_stack;
pub mod launch;
pub mod registry;
pub mod runtime;
pub mod session;
