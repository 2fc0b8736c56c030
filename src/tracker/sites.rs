// src/tracker/sites.rs

//! Site shape recognition heuristics.
//!
//! All checks operate on cleaned, lowercased content. These are content
//! sniffers, not URL routers: tracked pages are often mirrored or proxied,
//! so the body is the more reliable signal.

/// Marker present on art-community pages served behind the login wall.
pub const LOGIN_WALL_MARKER: &str = "<p class=\"link-override\">the owner of this page has elected to make it available to registered users only.";

/// Content looks like a Fur Affinity page.
pub fn is_fur_affinity(content: &str) -> bool {
    content.contains("furaffinity.net")
}

/// Content looks like a Fur Affinity user profile page.
pub fn is_fur_affinity_user_profile(content: &str) -> bool {
    is_fur_affinity(content) && content.contains("page-userpage")
}

/// Content looks like a Twitter profile page.
pub fn is_twitter(content: &str) -> bool {
    content.contains("twitter.com") || content.contains("twimg.com")
}

/// Content looks like an Instagram page.
pub fn is_instagram(content: &str) -> bool {
    content.contains("instagram.com")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_fur_affinity_profile() {
        let content = r#"<link href="https://www.furaffinity.net/themes/a.css"><div id="page-userpage"></div>"#;
        assert!(is_fur_affinity(content));
        assert!(is_fur_affinity_user_profile(content));
    }

    #[test]
    fn plain_page_is_not_recognized() {
        let content = "<html><body>commissions are open</body></html>";
        assert!(!is_fur_affinity(content));
        assert!(!is_twitter(content));
        assert!(!is_instagram(content));
    }
}
