//! Fixed colors of the terminal front end (Catppuccin Mocha).

use ratatui::style::Color;

pub const TEXT: Color = Color::Rgb(205, 214, 244);
pub const SURFACE: Color = Color::Rgb(69, 71, 90);
pub const BASE: Color = Color::Rgb(30, 30, 46);
pub const BORDER: Color = Color::Rgb(88, 91, 112);
pub const BORDER_FOCUSED: Color = Color::Rgb(137, 180, 250);
pub const FOLDER: Color = Color::Rgb(137, 180, 250);
pub const DIM: Color = Color::Rgb(108, 112, 134);
pub const ERROR: Color = Color::Rgb(243, 139, 168);
pub const WARNING: Color = Color::Rgb(249, 226, 175);
pub const SUCCESS: Color = Color::Rgb(166, 227, 161);
pub const ACCENT: Color = Color::Rgb(203, 166, 247);
