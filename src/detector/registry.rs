//! Known meeting applications and the matching rules against probe output.

use super::probe::WindowInfo;

/// A meeting-capable application the detector recognizes.
#[derive(Debug, Clone)]
pub struct MeetingApp {
    pub name: &'static str,
    /// Substrings matched against process names, case-insensitive.
    pub process_names: &'static [&'static str],
    /// Substrings matched against window titles, case-insensitive.
    pub window_titles: &'static [&'static str],
    /// Process names that must ALL be running for the process-only fallback
    /// to report this app. Empty slice: not detectable by fallback.
    pub fallback_process_names: &'static [&'static str],
}

pub fn default_registry() -> Vec<MeetingApp> {
    vec![
        MeetingApp {
            name: "Zoom",
            process_names: &["zoom.us", "CptHost"],
            window_titles: &["Zoom Meeting", "Zoom Webinar"],
            fallback_process_names: &["zoom.us", "cpthost"],
        },
        MeetingApp {
            name: "Google Meet",
            process_names: &["Google Chrome", "Arc", "Safari", "Firefox", "Microsoft Edge"],
            window_titles: &["Meet -", "meet.google.com"],
            fallback_process_names: &[],
        },
        MeetingApp {
            name: "Microsoft Teams",
            process_names: &["Microsoft Teams", "Teams"],
            window_titles: &["Microsoft Teams"],
            fallback_process_names: &["microsoft teams"],
        },
        MeetingApp {
            name: "Slack Huddle",
            process_names: &["Slack"],
            window_titles: &["Huddle"],
            fallback_process_names: &[],
        },
        MeetingApp {
            name: "Discord",
            process_names: &["Discord"],
            window_titles: &["Voice Connected"],
            fallback_process_names: &[],
        },
    ]
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    let haystack = haystack.to_lowercase();
    needles.iter().any(|n| haystack.contains(&n.to_lowercase()))
}

/// Match the window list against the registry. An entry matches a window when
/// both its process rule and its title rule hit; the first matching entry
/// (in registry order) wins.
pub fn match_windows(registry: &[MeetingApp], windows: &[WindowInfo]) -> Option<String> {
    for window in windows {
        for app in registry {
            if contains_any(&window.process, app.process_names)
                && contains_any(&window.title, app.window_titles)
            {
                return Some(app.name.to_string());
            }
        }
    }
    None
}

/// Process-only fallback matching for the reduced registry subset.
pub fn match_processes(registry: &[MeetingApp], processes: &[String]) -> Option<String> {
    let running = processes.join("\n").to_lowercase();
    for app in registry {
        if app.fallback_process_names.is_empty() {
            continue;
        }
        if app
            .fallback_process_names
            .iter()
            .all(|name| running.contains(&name.to_lowercase()))
        {
            return Some(app.name.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(process: &str, title: &str) -> WindowInfo {
        WindowInfo {
            process: process.to_string(),
            title: title.to_string(),
        }
    }

    #[test]
    fn test_zoom_requires_process_and_title() {
        let registry = default_registry();

        let detected = match_windows(
            &registry,
            &[window("zoom.us helper", "Zoom Meeting - Standup")],
        );
        assert_eq!(detected, Some("Zoom".to_string()));

        // Process alone is not a meeting
        let detected = match_windows(&registry, &[window("zoom.us helper", "Preferences")]);
        assert_eq!(detected, None);
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let registry = default_registry();
        let detected = match_windows(&registry, &[window("ZOOM.US", "zoom meeting")]);
        assert_eq!(detected, Some("Zoom".to_string()));
    }

    #[test]
    fn test_meet_in_browser() {
        let registry = default_registry();
        let detected = match_windows(
            &registry,
            &[
                window("Finder", "Downloads"),
                window("Google Chrome", "Weekly Sync - Meet - chrome"),
            ],
        );
        assert_eq!(detected, Some("Google Meet".to_string()));
    }

    #[test]
    fn test_no_windows_no_detection() {
        let registry = default_registry();
        assert_eq!(match_windows(&registry, &[]), None);
    }

    #[test]
    fn test_fallback_requires_all_names() {
        let registry = default_registry();

        let detected = match_processes(
            &registry,
            &["zoom.us".to_string(), "CptHost".to_string(), "Finder".to_string()],
        );
        assert_eq!(detected, Some("Zoom".to_string()));

        // zoom.us without the in-meeting helper process is not a meeting
        let detected = match_processes(&registry, &["zoom.us".to_string()]);
        assert_eq!(detected, None);
    }

    #[test]
    fn test_fallback_teams() {
        let registry = default_registry();
        let detected = match_processes(&registry, &["Microsoft Teams".to_string()]);
        assert_eq!(detected, Some("Microsoft Teams".to_string()));
    }

    #[test]
    fn test_fallback_ignores_window_only_apps() {
        let registry = default_registry();
        // Slack running does not mean a huddle is active
        let detected = match_processes(&registry, &["Slack".to_string(), "Discord".to_string()]);
        assert_eq!(detected, None);
    }
}
