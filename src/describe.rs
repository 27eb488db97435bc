//! Presentation of output files for the terminal front end.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use genpage_browser::browser::path;
use genpage_browser::browser::{Item, ItemButton, ItemDescription};
use tokio::sync::mpsc;

use crate::event::Event;

/// Format bytes into human-readable size string.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Coarse age of `date` relative to `now`, e.g. `3h ago`.
pub fn format_age(date: SystemTime, now: SystemTime) -> String {
    let age = now.duration_since(date).unwrap_or(Duration::ZERO).as_secs();
    match age {
        0..=59 => "just now".to_string(),
        60..=3599 => format!("{}m ago", age / 60),
        3600..=86_399 => format!("{}h ago", age / 3600),
        _ => format!("{}d ago", age / 86_400),
    }
}

/// Describe callback for files listed from an output folder.
///
/// Buttons report back through `tx`: one opens the folder holding the item,
/// the other shows its full path.
pub fn output_describer(tx: mpsc::UnboundedSender<Event>) -> impl Fn(&Item) -> ItemDescription + Send {
    move |item: &Item| {
        let mut details = Vec::new();
        if let Some(size) = item.data.get("size").and_then(|v| v.as_u64()) {
            details.push(format_size(size));
        }
        if let Some(date) = item.date {
            details.push(format_age(date, SystemTime::now()));
        }

        let open_tx = tx.clone();
        let notice_tx = tx.clone();
        ItemDescription {
            name: item.name.clone(),
            display: item.file_name().to_string(),
            searchable: item.name.clone(),
            description: details.join(" · "),
            image: item.name.clone(),
            buttons: vec![
                ItemButton::action(
                    "Open folder",
                    Arc::new(move |item: &Item| {
                        let _ = open_tx.send(Event::OpenFolder(path::parent(&item.name).to_string()));
                    }),
                ),
                ItemButton::action(
                    "Show path",
                    Arc::new(move |item: &Item| {
                        let _ = notice_tx.send(Event::Notice(item.name.clone()));
                    }),
                ),
            ],
            class_name: String::new(),
            drag_image: Some(item.name.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn format_size_units() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(1024 * 1024), "1.00 MB");
        assert_eq!(format_size(1024 * 1024 * 1024), "1.00 GB");
    }

    #[test]
    fn format_age_buckets() {
        let now = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000_000);
        assert_eq!(format_age(now, now), "just now");
        assert_eq!(format_age(now - Duration::from_secs(120), now), "2m ago");
        assert_eq!(format_age(now - Duration::from_secs(7200), now), "2h ago");
        assert_eq!(format_age(now - Duration::from_secs(3 * 86_400), now), "3d ago");
        assert_eq!(format_age(now + Duration::from_secs(60), now), "just now");
    }

    #[test]
    fn description_shows_file_name_and_size() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let describe = output_describer(tx);
        let item = Item::new("day/batch/img.png").with_data(json!({ "size": 2048 }));
        let desc = describe(&item);
        assert_eq!(desc.label(), "img.png");
        assert_eq!(desc.searchable, "day/batch/img.png");
        assert_eq!(desc.description, "2.00 KB");
        assert_eq!(desc.buttons.len(), 2);
    }

    #[test]
    fn buttons_post_events() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let describe = output_describer(tx);
        let item = Item::new("day/img.png");
        let desc = describe(&item);

        let open = desc.buttons[0].on_click.as_ref().expect("action");
        open(&item);
        assert!(matches!(rx.try_recv(), Ok(Event::OpenFolder(ref f)) if f == "day"));

        let show = desc.buttons[1].on_click.as_ref().expect("action");
        show(&item);
        assert!(matches!(rx.try_recv(), Ok(Event::Notice(ref n)) if n == "day/img.png"));
    }
}
