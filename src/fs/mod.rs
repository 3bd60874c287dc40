pub mod operations;
pub mod path_key;
pub mod tree;
pub mod watcher;
