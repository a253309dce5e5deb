use std::{env, num::NonZeroUsize, path::PathBuf, sync::LazyLock, time::Duration};

use crate::components::cell::ClassifyOptions;

pub const APP_ID: &str = "io.github.chat_window";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Messages paged in per backward load, also the size of the initial window.
pub const DEFAULT_PAGE_SIZE: NonZeroUsize = NonZeroUsize::new(20).unwrap();
/// Delay between a qualifying scroll and the load it triggers.
pub const LOAD_PREVIOUS_DELAY: Duration = Duration::from_millis(500);

/// Environment variable overriding the database location.
pub const DATABASE_ENV: &str = "CHAT_WINDOW_DB";

/// Data directory (e.g., ~/.local/share/chat-window on Linux).
pub static DATA_DIR: LazyLock<PathBuf> = LazyLock::new(|| {
    dirs::data_dir()
        .unwrap_or_else(|| {
            let fallback = env::temp_dir();
            tracing::warn!(
                "No user data directory, storing data under {}",
                fallback.display()
            );
            fallback
        })
        .join("chat-window")
});

/// Location of the message database.
pub fn database_path() -> PathBuf {
    env::var_os(DATABASE_ENV).map_or_else(|| DATA_DIR.join("chat.db"), PathBuf::from)
}

/// Tunables of the chat screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChatViewSettings {
    pub page_size: NonZeroUsize,
    pub load_previous_delay: Duration,
    pub classify: ClassifyOptions,
}

impl Default for ChatViewSettings {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            load_previous_delay: LOAD_PREVIOUS_DELAY,
            classify: ClassifyOptions::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_dir_follows_the_platform() {
        let base = dirs::data_dir().unwrap_or_else(env::temp_dir);
        assert_eq!(*DATA_DIR, base.join("chat-window"));
    }

    #[test]
    fn defaults_come_from_constants() {
        let settings = ChatViewSettings::default();
        assert_eq!(settings.page_size.get(), 20);
        assert_eq!(settings.load_previous_delay, Duration::from_millis(500));
    }
}
