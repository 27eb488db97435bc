pub mod listing;
pub mod watcher;
