use crate::mirror::{Mirror, THEME_KEY};
use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
    sync::{Arc, Mutex},
};

/// The colour scheme actually being displayed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn system(prefers_dark: bool) -> Theme {
        if prefers_dark {
            Theme::Dark
        } else {
            Theme::Light
        }
    }

    fn opposite(self) -> Theme {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

/// The user's preference.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ThemeMode {
    Light,
    Dark,
    /// Follow whatever the operating system prefers.
    System,
}

impl ThemeMode {
    pub fn resolve(self, system_prefers_dark: bool) -> Theme {
        match self {
            ThemeMode::Light => Theme::Light,
            ThemeMode::Dark => Theme::Dark,
            ThemeMode::System => Theme::system(system_prefers_dark),
        }
    }
}

impl From<Theme> for ThemeMode {
    fn from(theme: Theme) -> ThemeMode {
        match theme {
            Theme::Light => ThemeMode::Light,
            Theme::Dark => ThemeMode::Dark,
        }
    }
}

impl Default for ThemeMode {
    fn default() -> Self { ThemeMode::System }
}

impl Display for ThemeMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
            ThemeMode::System => "system",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Expected \"light\", \"dark\" or \"system\" but found \"{0}\"")]
pub struct UnknownThemeMode(pub String);

impl FromStr for ThemeMode {
    type Err = UnknownThemeMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "light" => Ok(ThemeMode::Light),
            "dark" => Ok(ThemeMode::Dark),
            "system" => Ok(ThemeMode::System),
            other => Err(UnknownThemeMode(other.to_string())),
        }
    }
}

/// The persisted appearance preference.
#[derive(Debug)]
pub struct ThemeStore {
    mode: Mutex<ThemeMode>,
    mirror: Arc<dyn Mirror>,
}

impl ThemeStore {
    /// Read the preference, falling back to [`ThemeMode::System`] when it is
    /// missing or unrecognised.
    pub fn load(mirror: Arc<dyn Mirror>) -> Self {
        let mode = mirror
            .load(THEME_KEY)
            .and_then(|raw| raw.parse().ok())
            .unwrap_or_default();

        ThemeStore {
            mode: Mutex::new(mode),
            mirror,
        }
    }

    pub fn mode(&self) -> ThemeMode {
        match self.mode.lock() {
            Ok(mode) => *mode,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    pub fn resolved(&self, system_prefers_dark: bool) -> Theme {
        self.mode().resolve(system_prefers_dark)
    }

    pub fn set_mode(&self, mode: ThemeMode) {
        match self.mode.lock() {
            Ok(mut current) => *current = mode,
            Err(poisoned) => *poisoned.into_inner() = mode,
        }

        if let Err(e) = self.mirror.store(THEME_KEY, &mode.to_string()) {
            log::warn!("Unable to save the theme preference: {}", e);
        }
    }

    /// Flip between light and dark, pinning the preference if it was
    /// following the system.
    pub fn toggle(&self, system_prefers_dark: bool) -> Theme {
        let next = self.resolved(system_prefers_dark).opposite();
        self.set_mode(next.into());
        next
    }
}
