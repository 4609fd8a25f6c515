//! Browser executable detection and install guidance.

use std::{
    fmt,
    path::{Path, PathBuf},
};

/// Chromium-based executable names looked up on `PATH`. All of them speak CDP.
const CHROMIUM_EXECUTABLES: &[&str] = &[
    "google-chrome-stable",
    "google-chrome",
    "chrome",
    "chromium",
    "chromium-browser",
    "headless-shell",
    "microsoft-edge-stable",
    "msedge",
    "brave-browser",
];

#[cfg(target_os = "linux")]
const PLATFORM_PATHS: &[&str] = &[
    "/opt/google/chrome/chrome",
    "/usr/lib/chromium/chromium",
    "/snap/bin/chromium",
];

#[cfg(target_os = "macos")]
const PLATFORM_PATHS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
    "/Applications/Brave Browser.app/Contents/MacOS/Brave Browser",
];

#[cfg(target_os = "windows")]
const PLATFORM_PATHS: &[&str] = &[
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
];

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
const PLATFORM_PATHS: &[&str] = &[];

/// Where a detected executable came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectedBy {
    /// `browser.chrome_path` (or `SUMARIZA_CHROME_PATH`).
    Config,
    /// The `CHROME` environment variable.
    ChromeEnv,
    /// A well-known installation path for this platform.
    PlatformPath,
    /// An executable name found on `PATH`.
    SearchPath,
}

impl fmt::Display for DetectedBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Config => "config",
            Self::ChromeEnv => "CHROME env",
            Self::PlatformPath => "platform path",
            Self::SearchPath => "PATH",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedBrowser {
    pub path: PathBuf,
    pub source: DetectedBy,
}

/// Locate a Chromium-based browser.
///
/// Checks, in order: the configured path, the `CHROME` environment variable,
/// platform installation paths, then known executable names on `PATH`.
/// Platform paths come before `PATH` because `PATH` can hold broken wrapper
/// scripts.
pub fn detect_browser(custom_path: Option<&str>) -> Option<DetectedBrowser> {
    detect_browser_with(custom_path, std::env::var("CHROME").ok().as_deref(), |name| {
        which::which(name).ok()
    })
}

fn detect_browser_with(
    custom_path: Option<&str>,
    chrome_env: Option<&str>,
    search_path: impl Fn(&str) -> Option<PathBuf>,
) -> Option<DetectedBrowser> {
    let existing = |raw: &str, source| {
        let path = Path::new(raw);
        path.exists().then(|| DetectedBrowser {
            path: path.to_path_buf(),
            source,
        })
    };

    if let Some(found) = custom_path.and_then(|p| existing(p, DetectedBy::Config)) {
        return Some(found);
    }
    if let Some(path) = custom_path {
        tracing::warn!(path, "configured browser path does not exist, searching");
    }

    chrome_env
        .and_then(|p| existing(p, DetectedBy::ChromeEnv))
        .or_else(|| {
            PLATFORM_PATHS
                .iter()
                .find_map(|p| existing(p, DetectedBy::PlatformPath))
        })
        .or_else(|| {
            CHROMIUM_EXECUTABLES.iter().find_map(|name| {
                search_path(name).map(|path| DetectedBrowser {
                    path,
                    source: DetectedBy::SearchPath,
                })
            })
        })
}

/// Platform-specific install instructions.
pub fn install_instructions() -> String {
    let instructions = if cfg!(target_os = "macos") {
        "  brew install --cask google-chrome\n  \
         # Alternatives: chromium, brave-browser, microsoft-edge"
    } else if cfg!(target_os = "linux") {
        "  Debian/Ubuntu: sudo apt install chromium\n  \
         Fedora:         sudo dnf install chromium\n  \
         Arch:           sudo pacman -S chromium\n  \
         Alpine:         apk add chromium"
    } else if cfg!(target_os = "windows") {
        "  winget install Google.Chrome"
    } else {
        "  Download from https://www.google.com/chrome/"
    };

    format!(
        "No Chromium-based browser found. Install one:\n\n\
         {instructions}\n\n\
         Or point to an executable:\n  \
         [browser]\n  \
         chrome_path = \"/path/to/chrome\"\n\n\
         or set SUMARIZA_CHROME_PATH (or CHROME)."
    )
}

/// Check browser availability at startup and warn if none is found.
pub fn check_and_warn(custom_path: Option<&str>) -> bool {
    match detect_browser(custom_path) {
        Some(found) => {
            tracing::info!(path = %found.path.display(), source = %found.source, "browser detected");
            true
        },
        None => {
            tracing::warn!("no Chromium-based browser found\n{}", install_instructions());
            false
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn nothing_on_path(_: &str) -> Option<PathBuf> {
        None
    }

    #[test]
    fn install_instructions_mention_override() {
        let hint = install_instructions();
        assert!(hint.contains("chrome_path"));
        assert!(hint.contains("SUMARIZA_CHROME_PATH"));

        #[cfg(target_os = "linux")]
        assert!(hint.contains("apt") || hint.contains("dnf") || hint.contains("pacman"));
    }

    #[test]
    fn configured_path_wins() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap();

        let found = detect_browser_with(Some(path), Some("/also/ignored"), nothing_on_path).unwrap();
        assert_eq!(found.source, DetectedBy::Config);
        assert_eq!(found.path, file.path());
    }

    #[test]
    fn chrome_env_is_second() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let env = file.path().to_str().unwrap();

        let found =
            detect_browser_with(Some("/nonexistent/chrome"), Some(env), nothing_on_path).unwrap();
        assert_eq!(found.source, DetectedBy::ChromeEnv);
    }

    #[test]
    fn search_path_is_consulted_by_name() {
        let found = detect_browser_with(None, None, |name| {
            (name == "chromium").then(|| PathBuf::from("/usr/bin/chromium"))
        });
        // A platform path on the test machine may legitimately win first.
        if let Some(found) = found
            && found.source == DetectedBy::SearchPath
        {
            assert_eq!(found.path, PathBuf::from("/usr/bin/chromium"));
        }
    }

    #[test]
    fn nothing_found() {
        if PLATFORM_PATHS.iter().any(|p| Path::new(p).exists()) {
            return;
        }
        assert!(detect_browser_with(Some("/nonexistent"), None, nothing_on_path).is_none());
    }
}
