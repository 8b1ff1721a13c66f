use serde::{Deserialize, Serialize};

/// Foreground application and window title, read fresh on every poll.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowInfo {
    pub app_name: String,
    pub window_title: String,
}

impl WindowInfo {
    pub fn new(app_name: impl Into<String>, window_title: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            window_title: window_title.into(),
        }
    }
}

/// Channel context derived from a chat client's window title.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackContext {
    pub channel: Option<String>,
    pub workspace: Option<String>,
    pub dm_user: Option<String>,
    pub is_thread: bool,
}
