pub mod autosave;
pub mod cache;
pub mod command;
pub mod remote;
pub mod session;
