pub mod booking;
pub mod catalog;
pub mod credentials;
pub mod events;
pub mod store;
pub mod watcher;

pub use booking::*;
pub use catalog::*;
pub use credentials::*;
pub use events::*;
pub use store::*;
pub use watcher::*;
