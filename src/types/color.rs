// ABOUTME: Blue/green deployment slot colors and the scheduling rules between them.
// ABOUTME: Pure functions only; persisted form is the lowercase color name.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid color '{0}' (expected 'blue' or 'green')")]
pub struct ColorError(pub String);

/// One of the two parallel deployment slots.
///
/// "No active color" is modelled as `Option<Color>::None` rather than a third
/// variant, so operations that need an active slot take a `Color` directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Blue,
    Green,
}

impl Color {
    pub const ALL: [Color; 2] = [Color::Blue, Color::Green];

    /// Color to deploy into next. The first deployment ever lands on blue.
    pub fn next(current: Option<Color>) -> Color {
        match current {
            None => Color::Blue,
            Some(color) => color.opposite(),
        }
    }

    pub fn opposite(self) -> Color {
        match self {
            Color::Blue => Color::Green,
            Color::Green => Color::Blue,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Color::Blue => "blue",
            Color::Green => "green",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Color {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "blue" => Ok(Color::Blue),
            "green" => Ok(Color::Green),
            other => Err(ColorError(other.to_string())),
        }
    }
}
