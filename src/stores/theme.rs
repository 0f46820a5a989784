//! Theme Store
//!
//! Light/dark preference, persisted under the `theme` key on every change.

use crate::storage::{KeyValueStore, THEME_KEY};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(format!("Unknown theme: {}", other)),
        }
    }
}

pub struct ThemeStore {
    store: Arc<dyn KeyValueStore>,
    prefers_dark: bool,
    theme: RwLock<Theme>,
}

impl ThemeStore {
    /// `prefers_dark` is the platform preference used when nothing is saved
    pub fn new(store: Arc<dyn KeyValueStore>, prefers_dark: bool) -> Self {
        let theme = Self::initial(store.as_ref(), prefers_dark);
        Self {
            store,
            prefers_dark,
            theme: RwLock::new(theme),
        }
    }

    fn initial(store: &dyn KeyValueStore, prefers_dark: bool) -> Theme {
        match store.get(THEME_KEY).as_deref().map(Theme::from_str) {
            Some(Ok(theme)) => theme,
            _ if prefers_dark => Theme::Dark,
            _ => Theme::Light,
        }
    }

    pub fn theme(&self) -> Theme {
        match self.theme.read() {
            Ok(theme) => *theme,
            Err(poisoned) => {
                tracing::warn!("Theme lock poisoned, recovering");
                **poisoned.get_ref()
            }
        }
    }

    fn current_mut(&self) -> RwLockWriteGuard<'_, Theme> {
        self.theme.write().unwrap_or_else(|poisoned| {
            tracing::warn!("Theme lock poisoned, recovering");
            PoisonError::into_inner(poisoned)
        })
    }

    pub fn set(&self, theme: Theme) {
        *self.current_mut() = theme;
        if let Err(e) = self.store.set(THEME_KEY, theme.as_str()) {
            tracing::error!(error = %e, "Failed to save theme");
        }
        tracing::debug!(theme = %theme, "Theme changed");
    }

    /// Flip between light and dark, returning the new theme
    pub fn toggle(&self) -> Theme {
        let next = self.theme().toggled();
        self.set(next);
        next
    }

    /// Re-read the preference from storage
    pub fn reload(&self) -> Theme {
        let theme = Self::initial(self.store.as_ref(), self.prefers_dark);
        *self.current_mut() = theme;
        theme
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileStore, MemoryStore};
    use tempfile::tempdir;

    #[test]
    fn test_initial_from_storage() {
        let store = Arc::new(MemoryStore::with_entries([(THEME_KEY, "dark")]));
        assert_eq!(ThemeStore::new(store, false).theme(), Theme::Dark);
    }

    #[test]
    fn test_initial_from_preference() {
        let store = Arc::new(MemoryStore::new());
        assert_eq!(ThemeStore::new(store.clone(), true).theme(), Theme::Dark);
        assert_eq!(ThemeStore::new(store, false).theme(), Theme::Light);
    }

    #[test]
    fn test_invalid_stored_value_ignored() {
        let store = Arc::new(MemoryStore::with_entries([(THEME_KEY, "sepia")]));
        assert_eq!(ThemeStore::new(store, false).theme(), Theme::Light);
    }

    #[test]
    fn test_toggle_persists() {
        let store = Arc::new(MemoryStore::new());
        let themes = ThemeStore::new(store.clone(), false);

        assert_eq!(themes.toggle(), Theme::Dark);
        assert_eq!(store.get(THEME_KEY).as_deref(), Some("dark"));
        assert_eq!(themes.toggle(), Theme::Light);
        assert_eq!(store.get(THEME_KEY).as_deref(), Some("light"));
    }

    #[test]
    fn test_set_survives_reload_from_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        let themes = ThemeStore::new(Arc::new(FileStore::open(&path).unwrap()), false);
        themes.set(Theme::Dark);
        assert_eq!(themes.reload(), Theme::Dark);

        let reopened = ThemeStore::new(Arc::new(FileStore::open(&path).unwrap()), false);
        assert_eq!(reopened.theme(), Theme::Dark);
    }

    #[test]
    fn test_poisoned_lock_still_tracks_changes() {
        let store = Arc::new(MemoryStore::new());
        let themes = Arc::new(ThemeStore::new(store.clone(), false));

        let holder = themes.clone();
        let result = std::thread::spawn(move || {
            let _guard = holder.theme.write().unwrap();
            panic!("writer died holding the lock");
        })
        .join();
        assert!(result.is_err());
        assert!(themes.theme.is_poisoned());

        themes.set(Theme::Dark);
        assert_eq!(themes.theme(), Theme::Dark);
        assert_eq!(store.get(THEME_KEY).as_deref(), Some("dark"));
        assert_eq!(themes.toggle(), Theme::Light);
    }

    #[test]
    fn test_parse() {
        assert_eq!("light".parse::<Theme>(), Ok(Theme::Light));
        assert!("blue".parse::<Theme>().is_err());
    }
}
