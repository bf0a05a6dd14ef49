pub mod cli;
pub mod config;
pub mod coordinator;
pub mod events;
pub mod filter;
pub mod paths;
pub mod sync;
pub mod watcher;

pub use config::*;
pub use coordinator::*;
pub use events::*;
pub use filter::*;
pub use paths::*;
pub use sync::*;
pub use watcher::*;
