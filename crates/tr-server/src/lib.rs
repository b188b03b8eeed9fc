pub mod annotations;
pub mod bootstrap;
pub mod config;
pub mod conversations;
pub mod handler;
pub mod logging;
pub mod projects;
