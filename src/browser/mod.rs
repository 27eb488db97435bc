//! Folder browser: tree cache, item paging and the navigation controller.

pub mod controller;
pub mod item;
pub mod paging;
pub mod path;
pub mod source;
pub mod timer;
pub mod tree;

pub use controller::{
    BrowserController, BrowserEvent, BrowserOptions, BrowserView, Entry, LayoutMode, Renderer,
    UpdateState,
};
pub use item::{Describe, DisplayFormat, Item, ItemButton, ItemDescription};
pub use paging::{PageButton, PageState, RenderPlan, SortMethod};
pub use source::{Listing, ListingSource};
pub use tree::{BrowserTree, FlatNode, TreeNode};
