//! User-agent classification into [`Category`].

use crate::models::Category;

/// Marker identifying the platform's own app.
pub const NATIVE_MARKER: &str = "spotify";

/// Browser and engine markers; any one of them makes a user agent `Web`.
pub const WEB_MARKERS: &[&str] = &[
    "chrome", "firefox", "safari", "edge", "msie", "opera", "mobile",
];

impl Category {
    /// Classify a user agent by case-insensitive substring match.
    ///
    /// The native marker wins over browser markers, so an in-app webview
    /// reporting both counts as `Native`.
    pub fn from_user_agent(user_agent: &str) -> Self {
        let lower = user_agent.to_lowercase();
        if lower.contains(NATIVE_MARKER) {
            Category::Native
        } else if WEB_MARKERS.iter().any(|marker| lower.contains(marker)) {
            Category::Web
        } else {
            Category::Other
        }
    }
}
