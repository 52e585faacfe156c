//! Window discovery by title.

use regex::Regex;

use crate::config::TitleMatching;
use crate::error::{CaptureError, Result};
use crate::platform::{Enumeration, PlatformCapture, WindowHandle};

/// A compiled title predicate.
#[derive(Clone, Debug)]
pub enum TitleMatcher {
    Exact(String),
    Prefix(String),
    Suffix(String),
    Contains(String),
    Regex(Regex),
}

impl TitleMatcher {
    /// Compiles `pattern` for the given matching mode.
    ///
    /// Plain modes compare case-insensitively; a regular expression is used as
    /// written.
    pub fn new(mode: TitleMatching, pattern: &str) -> Result<Self> {
        let folded = pattern.to_lowercase();
        Ok(match mode {
            TitleMatching::PerfectMatch => TitleMatcher::Exact(folded),
            TitleMatching::ForwardMatch => TitleMatcher::Prefix(folded),
            TitleMatching::BackwardMatch => TitleMatcher::Suffix(folded),
            TitleMatching::PartialMatch => TitleMatcher::Contains(folded),
            TitleMatching::RegularExpression => {
                let regex = Regex::new(pattern).map_err(|source| CaptureError::InvalidPattern {
                    pattern: pattern.to_string(),
                    source,
                })?;
                TitleMatcher::Regex(regex)
            }
        })
    }

    pub fn is_match(&self, title: &str) -> bool {
        match self {
            TitleMatcher::Exact(p) => title.to_lowercase() == *p,
            TitleMatcher::Prefix(p) => title.to_lowercase().starts_with(p.as_str()),
            TitleMatcher::Suffix(p) => title.to_lowercase().ends_with(p.as_str()),
            TitleMatcher::Contains(p) => title.to_lowercase().contains(p.as_str()),
            TitleMatcher::Regex(r) => r.is_match(title),
        }
    }
}

/// Returns the first window, in enumeration order, whose title matches.
///
/// Windows without a title are skipped. Enumeration stops at the first match.
pub fn locate<P: PlatformCapture + ?Sized>(
    platform: &P,
    matcher: &TitleMatcher,
) -> Option<WindowHandle> {
    let mut found = None;
    platform.enumerate_windows(&mut |window| {
        let Some(title) = platform.window_title(window) else {
            return Enumeration::Continue;
        };
        if title.is_empty() || !matcher.is_match(&title) {
            return Enumeration::Continue;
        }

        tracing::info!("Found target window {:?}: \"{}\"", window, title);
        found = Some(window);
        Enumeration::Stop
    });
    found
}

/// Lists every titled top-level window in enumeration order.
pub fn list_window_titles<P: PlatformCapture + ?Sized>(platform: &P) -> Vec<(WindowHandle, String)> {
    let mut windows = Vec::new();
    platform.enumerate_windows(&mut |window| {
        if let Some(title) = platform.window_title(window).filter(|t| !t.is_empty()) {
            windows.push((window, title));
        }
        Enumeration::Continue
    });
    windows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::region::Rect;
    use crate::platform::fake::{FakePlatform, FakeWindow};

    fn platform_with(titles: &[&str]) -> FakePlatform {
        let platform = FakePlatform::new();
        for title in titles {
            platform.add_window(FakeWindow::new(title, Rect::new(0, 0, 100, 100)));
        }
        platform
    }

    fn find(platform: &FakePlatform, mode: TitleMatching, pattern: &str) -> Option<String> {
        let matcher = TitleMatcher::new(mode, pattern).unwrap();
        locate(platform, &matcher).and_then(|w| platform.window_title(w))
    }

    #[test]
    fn test_perfect_match_is_case_insensitive_full_equality() {
        let platform = platform_with(&["Notepad++", "untitled - NOTEPAD", "Calculator"]);

        assert_eq!(
            find(&platform, TitleMatching::PerfectMatch, "Untitled - Notepad"),
            Some("untitled - NOTEPAD".to_string())
        );
        assert_eq!(find(&platform, TitleMatching::PerfectMatch, "Notepad"), None);
        assert_eq!(find(&platform, TitleMatching::PerfectMatch, "calc"), None);
    }

    #[test]
    fn test_partial_match_returns_first_in_enumeration_order() {
        let platform = platform_with(&["Untitled - Notepad", "Notepad++"]);

        assert_eq!(
            find(&platform, TitleMatching::PartialMatch, "Notepad"),
            Some("Untitled - Notepad".to_string())
        );
    }

    #[test]
    fn test_locate_stops_after_first_match() {
        let platform = platform_with(&["Alpha", "Beta", "Gamma", "Beta 2", "Delta"]);
        let matcher = TitleMatcher::new(TitleMatching::ForwardMatch, "beta").unwrap();

        let found = locate(&platform, &matcher);

        assert_eq!(found, Some(WindowHandle(2)));
        assert_eq!(platform.visited(), 2);
    }

    #[test]
    fn test_locate_visits_everything_when_nothing_matches() {
        let platform = platform_with(&["Alpha", "Beta", "Gamma"]);
        let matcher = TitleMatcher::new(TitleMatching::PartialMatch, "zeta").unwrap();

        assert_eq!(locate(&platform, &matcher), None);
        assert_eq!(platform.visited(), 3);
    }

    #[test]
    fn test_forward_and_backward_match() {
        let platform = platform_with(&["Project - Visual Studio Code", "Visual Studio"]);

        assert_eq!(
            find(&platform, TitleMatching::ForwardMatch, "visual"),
            Some("Visual Studio".to_string())
        );
        assert_eq!(
            find(&platform, TitleMatching::BackwardMatch, "STUDIO CODE"),
            Some("Project - Visual Studio Code".to_string())
        );
    }

    #[test]
    fn test_regular_expression_matches_anywhere() {
        let platform = platform_with(&["Build 41 - Game", "Game [Build 42]"]);

        assert_eq!(
            find(&platform, TitleMatching::RegularExpression, r"\[Build \d+\]"),
            Some("Game [Build 42]".to_string())
        );
    }

    #[test]
    fn test_invalid_regular_expression_is_rejected() {
        let result = TitleMatcher::new(TitleMatching::RegularExpression, "([unclosed");
        assert!(matches!(result, Err(CaptureError::InvalidPattern { .. })));
    }

    #[test]
    fn test_empty_titles_are_skipped() {
        let platform = platform_with(&["", "Ünïcödé ウィンドウ"]);

        // An empty pattern under PerfectMatch would equal the empty title
        assert_eq!(find(&platform, TitleMatching::PerfectMatch, ""), None);
        assert_eq!(
            find(&platform, TitleMatching::PartialMatch, "ウィンドウ"),
            Some("Ünïcödé ウィンドウ".to_string())
        );
        assert_eq!(
            find(&platform, TitleMatching::ForwardMatch, "ünïcödé"),
            Some("Ünïcödé ウィンドウ".to_string())
        );
    }

    #[test]
    fn test_list_window_titles_skips_untitled() {
        let platform = platform_with(&["One", "", "Two"]);
        let titles: Vec<String> = list_window_titles(&platform)
            .into_iter()
            .map(|(_, t)| t)
            .collect();
        assert_eq!(titles, vec!["One", "Two"]);
    }
}
