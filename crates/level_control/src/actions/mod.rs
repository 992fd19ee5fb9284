pub mod actions;
pub mod executor;
pub mod queue;
pub mod result_log;
pub mod results;

pub use actions::*;
pub use executor::{execute_level_actions, execute_single};
pub use queue::*;
pub use result_log::{ActionResultLog, LoggedAction};
pub use results::*;

#[cfg(test)]
mod tests;
