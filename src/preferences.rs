//! Light/dark theme preference

use log::warn;
use std::fmt;
use std::str::FromStr;
use std::sync::RwLock;

use loja_rust_storage::JsonStore;

use crate::error::{Error, Result};
use crate::keys;
use crate::lock;

/// Colour theme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    pub fn palette(&self) -> Palette {
        match self {
            Self::Light => Palette {
                background: "#f8f9fa",
                surface: "#ffffff",
                text: "#1a1a1a",
                text_secondary: "#666666",
                primary: "#ff6b35",
                border: "#e5e7eb",
                card: "#ffffff",
                shadow: "rgba(0, 0, 0, 0.1)",
            },
            Self::Dark => Palette {
                background: "#121212",
                surface: "#1e1e1e",
                text: "#ffffff",
                text_secondary: "#b3b3b3",
                primary: "#ff8c66",
                border: "#333333",
                card: "#2d2d2d",
                shadow: "rgba(0, 0, 0, 0.3)",
            },
        }
    }
}

impl FromStr for Theme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(Error::validation(format!("Unknown theme: {}", other))),
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Colours for one theme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: &'static str,
    pub surface: &'static str,
    pub text: &'static str,
    pub text_secondary: &'static str,
    pub primary: &'static str,
    pub border: &'static str,
    pub card: &'static str,
    pub shadow: &'static str,
}

/// Theme preference, stored as a bare `light` / `dark` string under `theme`
pub struct ThemeStore {
    store: JsonStore,
    theme: RwLock<Theme>,
}

impl ThemeStore {
    pub fn new(store: JsonStore) -> Self {
        Self {
            store,
            theme: RwLock::new(Theme::default()),
        }
    }

    /// Read the saved theme. Anything but `light` or `dark` means light.
    pub async fn load(&self) -> Result<Theme> {
        let theme = match self.store.get_raw(keys::THEME).await? {
            Some(saved) => saved.parse().unwrap_or_else(|err| {
                warn!("ignoring saved theme: {}", err);
                Theme::Light
            }),
            None => Theme::Light,
        };
        *lock::write(&self.theme) = theme;
        Ok(theme)
    }

    pub fn theme(&self) -> Theme {
        *lock::read(&self.theme)
    }

    pub fn palette(&self) -> Palette {
        self.theme().palette()
    }

    pub fn is_dark(&self) -> bool {
        self.theme() == Theme::Dark
    }

    pub async fn set(&self, theme: Theme) -> Result<()> {
        *lock::write(&self.theme) = theme;
        self.store.set_raw(keys::THEME, theme.as_str()).await?;
        Ok(())
    }

    /// Switch between light and dark and return the new theme
    pub async fn toggle(&self) -> Result<Theme> {
        let theme = {
            let mut current = lock::write(&self.theme);
            *current = current.toggled();
            *current
        };
        self.store.set_raw(keys::THEME, theme.as_str()).await?;
        Ok(theme)
    }
}
