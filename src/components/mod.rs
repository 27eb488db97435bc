pub mod content;
pub mod header;
pub mod status_bar;
pub mod tree;
