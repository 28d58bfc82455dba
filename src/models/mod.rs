pub mod command;
pub mod state;
pub mod weather;

pub use command::*;
pub use state::*;
pub use weather::*;
