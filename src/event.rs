use std::path::PathBuf;
use std::time::Duration;

use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, MouseEvent};
use genpage_browser::browser::BrowserEvent;
use genpage_browser::error::{BrowserError, Result};
use tokio::sync::mpsc;

/// Application events.
#[derive(Debug)]
pub enum Event {
    /// A key press event.
    Key(KeyEvent),
    /// A mouse event.
    Mouse(MouseEvent),
    /// A periodic tick for rendering.
    Tick,
    /// Terminal resize event.
    Resize(u16, u16),
    /// Work finished by the browser in the background.
    Browser(BrowserEvent),
    /// Filesystem change detected by watcher.
    FsChange(Vec<PathBuf>),
    /// An item button asked to open the folder holding an item.
    OpenFolder(String),
    /// An item button produced a message for the status bar.
    Notice(String),
}

/// Async event handler that polls crossterm events and forwards them via a channel.
pub struct EventHandler {
    rx: mpsc::UnboundedReceiver<Event>,
    tx: mpsc::UnboundedSender<Event>,
}

impl EventHandler {
    /// Create a new EventHandler with the given tick rate.
    pub fn new(tick_rate: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let event_tx = tx.clone();

        tokio::spawn(async move {
            loop {
                if event::poll(tick_rate).unwrap_or(false) {
                    let forwarded = match event::read() {
                        Ok(CrosstermEvent::Key(key)) => event_tx.send(Event::Key(key)),
                        Ok(CrosstermEvent::Mouse(mouse)) => event_tx.send(Event::Mouse(mouse)),
                        Ok(CrosstermEvent::Resize(w, h)) => event_tx.send(Event::Resize(w, h)),
                        _ => Ok(()),
                    };
                    if forwarded.is_err() {
                        break;
                    }
                } else if event_tx.send(Event::Tick).is_err() {
                    break;
                }
            }
        });

        Self { rx, tx }
    }

    /// Sender clone for watchers, item buttons and forwarders.
    pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
        self.tx.clone()
    }

    /// Receive the next event (blocks until available).
    pub async fn next(&mut self) -> Result<Event> {
        self.rx
            .recv()
            .await
            .ok_or_else(|| BrowserError::Terminal("Event channel closed".into()))
    }
}

/// Pipe the browser's own event channel into the application channel.
pub fn forward_browser_events(
    mut browser_rx: mpsc::UnboundedReceiver<BrowserEvent>,
    tx: mpsc::UnboundedSender<Event>,
) {
    tokio::spawn(async move {
        while let Some(event) = browser_rx.recv().await {
            if tx.send(Event::Browser(event)).is_err() {
                break;
            }
        }
    });
}
