mod catalog;
mod error;
mod message;
mod ports;
mod rating;
mod segmenter;
mod state;
mod timer;
mod types;
mod validation;
mod wizard;

pub use catalog::*;
pub use error::*;
pub use message::*;
pub use ports::*;
pub use rating::*;
pub use segmenter::*;
pub use state::*;
pub use timer::*;
pub use types::*;
pub use validation::*;
pub use wizard::*;
