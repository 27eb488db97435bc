use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// A file record produced by a listing source.
///
/// The browser only looks at `name` and `date`; `data` is carried through
/// untouched for the describe callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Path of the file relative to the listing root, slash-delimited.
    pub name: String,
    #[serde(default)]
    pub date: Option<SystemTime>,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl Item {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            date: None,
            data: serde_json::Value::Null,
        }
    }

    pub fn with_date(mut self, date: SystemTime) -> Self {
        self.date = Some(date);
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }

    /// Last path segment of the item name.
    pub fn file_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }
}

/// Click handler attached to an item button.
pub type ButtonAction = Arc<dyn Fn(&Item) + Send + Sync>;

/// An action offered on an item's menu.
#[derive(Clone, Default)]
pub struct ItemButton {
    pub label: String,
    pub href: Option<String>,
    pub is_download: bool,
    pub on_click: Option<ButtonAction>,
}

impl ItemButton {
    pub fn action(label: impl Into<String>, on_click: ButtonAction) -> Self {
        Self {
            label: label.into(),
            on_click: Some(on_click),
            ..Default::default()
        }
    }

    pub fn link(label: impl Into<String>, href: impl Into<String>, is_download: bool) -> Self {
        Self {
            label: label.into(),
            href: Some(href.into()),
            is_download,
            on_click: None,
        }
    }
}

impl fmt::Debug for ItemButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemButton")
            .field("label", &self.label)
            .field("href", &self.href)
            .field("is_download", &self.is_download)
            .field("on_click", &self.on_click.is_some())
            .finish()
    }
}

/// Presentation metadata for one item.
#[derive(Debug, Clone, Default)]
pub struct ItemDescription {
    pub name: String,
    pub display: String,
    /// Text the filter is matched against when entries are rendered.
    pub searchable: String,
    pub description: String,
    pub image: String,
    pub buttons: Vec<ItemButton>,
    pub class_name: String,
    pub drag_image: Option<String>,
}

impl ItemDescription {
    /// Description that only names the item.
    pub fn basic(name: &str) -> Self {
        Self {
            name: name.to_string(),
            display: name.to_string(),
            searchable: name.to_string(),
            ..Default::default()
        }
    }

    /// Text to show for the item: `display` when set, otherwise `name`.
    pub fn label(&self) -> &str {
        if self.display.is_empty() {
            &self.name
        } else {
            &self.display
        }
    }
}

/// Produces presentation metadata for items.
pub trait Describe: Send {
    fn describe(&self, item: &Item) -> ItemDescription;
}

impl<F> Describe for F
where
    F: Fn(&Item) -> ItemDescription + Send,
{
    fn describe(&self, item: &Item) -> ItemDescription {
        self(item)
    }
}

/// Layout used for the content area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayFormat {
    #[default]
    Cards,
    SmallCards,
    BigCards,
    Thumbnails,
    SmallThumbnails,
    BigThumbnails,
    GiantThumbnails,
    List,
}

impl DisplayFormat {
    pub const ALL: [DisplayFormat; 8] = [
        DisplayFormat::Cards,
        DisplayFormat::SmallCards,
        DisplayFormat::BigCards,
        DisplayFormat::Thumbnails,
        DisplayFormat::SmallThumbnails,
        DisplayFormat::BigThumbnails,
        DisplayFormat::GiantThumbnails,
        DisplayFormat::List,
    ];

    /// Label used for display and for the persisted preference value.
    pub fn label(&self) -> &'static str {
        match self {
            DisplayFormat::Cards => "Cards",
            DisplayFormat::SmallCards => "Small Cards",
            DisplayFormat::BigCards => "Big Cards",
            DisplayFormat::Thumbnails => "Thumbnails",
            DisplayFormat::SmallThumbnails => "Small Thumbnails",
            DisplayFormat::BigThumbnails => "Big Thumbnails",
            DisplayFormat::GiantThumbnails => "Giant Thumbnails",
            DisplayFormat::List => "List",
        }
    }

    /// Parse a label back into a format.
    pub fn parse(label: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.label() == label)
    }

    /// Cycle to the next format.
    pub fn next(&self) -> Self {
        let idx = Self::ALL.iter().position(|f| f == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn is_cards(&self) -> bool {
        matches!(
            self,
            DisplayFormat::Cards | DisplayFormat::SmallCards | DisplayFormat::BigCards
        )
    }

    pub fn is_thumbnails(&self) -> bool {
        matches!(
            self,
            DisplayFormat::Thumbnails
                | DisplayFormat::SmallThumbnails
                | DisplayFormat::BigThumbnails
                | DisplayFormat::GiantThumbnails
        )
    }

    /// Relative thumbnail width (in rem in the web layout, columns here).
    pub fn thumbnail_factor(&self) -> u16 {
        match self {
            DisplayFormat::SmallThumbnails => 5,
            DisplayFormat::BigThumbnails => 15,
            DisplayFormat::GiantThumbnails => 25,
            _ => 8,
        }
    }
}
