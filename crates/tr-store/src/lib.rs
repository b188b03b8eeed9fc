pub mod export;
pub mod import;
pub mod models;
pub mod progress;
pub mod store;

pub use export::*;
pub use import::*;
pub use models::*;
pub use progress::*;
pub use store::*;
