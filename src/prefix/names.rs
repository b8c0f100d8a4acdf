use std::fmt;
use thiserror::Error;

/// Characters Windows refuses in any path component
const WINDOWS_RESERVED_CHARS: [char; 9] = ['<', '>', ':', '"', '|', '?', '*', '/', '\\'];

/// Device names Windows reserves regardless of extension
const WINDOWS_RESERVED_STEMS: [&str; 26] = [
    "CON", "PRN", "AUX", "NUL", "CONIN$", "CONOUT$", "COM0", "COM1", "COM2", "COM3", "COM4",
    "COM5", "COM6", "COM7", "COM8", "COM9", "LPT0", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5",
    "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Naming rules a target name must satisfy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamePlatform {
    Windows,
    MacOs,
    Unix,
}

impl NamePlatform {
    pub fn current() -> Self {
        if cfg!(windows) {
            NamePlatform::Windows
        } else if cfg!(target_os = "macos") {
            NamePlatform::MacOs
        } else {
            NamePlatform::Unix
        }
    }
}

impl fmt::Display for NamePlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NamePlatform::Windows => "Windows",
            NamePlatform::MacOs => "macOS",
            NamePlatform::Unix => "Unix",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameRules {
    pub platform: NamePlatform,
    /// Maximum component length: UTF-16 units on Windows, bytes elsewhere
    pub max_length: usize,
}

impl Default for NameRules {
    fn default() -> Self {
        Self {
            platform: NamePlatform::current(),
            max_length: 255,
        }
    }
}

impl NameRules {
    pub fn new(platform: NamePlatform, max_length: usize) -> Self {
        Self {
            platform,
            max_length,
        }
    }

    fn measure(&self, name: &str) -> usize {
        match self.platform {
            NamePlatform::Windows => name.encode_utf16().count(),
            NamePlatform::MacOs | NamePlatform::Unix => name.len(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidName {
    #[error("name is empty")]
    Empty,

    #[error("'.' and '..' are not valid names")]
    DotName,

    #[error("name is {length} long, limit is {max}")]
    TooLong { length: usize, max: usize },

    #[error("name contains a control character")]
    ControlCharacter,

    #[error("name contains a path separator")]
    PathSeparator,

    #[error("name contains '{0}', which {1} does not allow")]
    ReservedCharacter(char, NamePlatform),

    #[error("name ends with a dot or space")]
    TrailingDotOrSpace,

    #[error("'{0}' is a reserved device name")]
    ReservedDeviceName(String),
}

/// Check a single path component against the platform's naming rules
pub fn validate_name(name: &str, rules: &NameRules) -> Result<(), InvalidName> {
    if name.is_empty() {
        return Err(InvalidName::Empty);
    }

    if name == "." || name == ".." {
        return Err(InvalidName::DotName);
    }

    if name.chars().any(char::is_control) {
        return Err(InvalidName::ControlCharacter);
    }

    if name.contains('/') {
        return Err(InvalidName::PathSeparator);
    }

    let length = rules.measure(name);
    if length > rules.max_length {
        return Err(InvalidName::TooLong {
            length,
            max: rules.max_length,
        });
    }

    // ':' is legal through the POSIX layer on APFS and HFS+
    match rules.platform {
        NamePlatform::Windows => validate_windows(name),
        NamePlatform::MacOs | NamePlatform::Unix => Ok(()),
    }
}

fn validate_windows(name: &str) -> Result<(), InvalidName> {
    if name.contains('\\') {
        return Err(InvalidName::PathSeparator);
    }

    if let Some(c) = name.chars().find(|c| WINDOWS_RESERVED_CHARS.contains(c)) {
        return Err(InvalidName::ReservedCharacter(c, NamePlatform::Windows));
    }

    if name.ends_with('.') || name.ends_with(' ') {
        return Err(InvalidName::TrailingDotOrSpace);
    }

    let stem = name.split('.').next().unwrap_or(name).trim_end();
    if WINDOWS_RESERVED_STEMS
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(stem))
    {
        return Err(InvalidName::ReservedDeviceName(stem.to_string()));
    }

    Ok(())
}

pub fn is_valid_name(name: &str, rules: &NameRules) -> bool {
    validate_name(name, rules).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn windows() -> NameRules {
        NameRules::new(NamePlatform::Windows, 255)
    }

    fn unix() -> NameRules {
        NameRules::new(NamePlatform::Unix, 255)
    }

    #[test]
    fn test_ordinary_names_valid() {
        for rules in [windows(), unix(), NameRules::new(NamePlatform::MacOs, 255)] {
            assert!(is_valid_name("2024-03-01_a.txt", &rules));
            assert!(is_valid_name("2024-03-01_My Folder", &rules));
        }
    }

    #[test]
    fn test_control_characters_rejected() {
        assert_eq!(
            validate_name("2024-03-01_a\u{7}b", &unix()),
            Err(InvalidName::ControlCharacter)
        );
        assert_eq!(
            validate_name("a\0b", &windows()),
            Err(InvalidName::ControlCharacter)
        );
    }

    #[test]
    fn test_path_separators_rejected() {
        assert_eq!(validate_name("a/b", &unix()), Err(InvalidName::PathSeparator));
        assert_eq!(validate_name("a\\b", &windows()), Err(InvalidName::PathSeparator));
        assert!(is_valid_name("a\\b", &unix()));
    }

    #[test]
    fn test_windows_reserved_characters() {
        for c in ['<', '>', ':', '"', '|', '?', '*'] {
            let name = format!("2024-03-01_a{}b", c);
            assert!(!is_valid_name(&name, &windows()), "{} should be rejected", c);
            assert!(is_valid_name(&name, &unix()));
        }
    }

    #[test]
    fn test_windows_trailing_dot_or_space() {
        assert_eq!(
            validate_name("2024-03-01_name.", &windows()),
            Err(InvalidName::TrailingDotOrSpace)
        );
        assert_eq!(
            validate_name("2024-03-01_name ", &windows()),
            Err(InvalidName::TrailingDotOrSpace)
        );
        assert!(is_valid_name("2024-03-01_name.", &unix()));
    }

    #[test]
    fn test_windows_reserved_device_names() {
        assert!(matches!(
            validate_name("con.txt", &windows()),
            Err(InvalidName::ReservedDeviceName(_))
        ));
        assert!(matches!(
            validate_name("LPT1", &windows()),
            Err(InvalidName::ReservedDeviceName(_))
        ));
        // A prefixed device name is an ordinary name
        assert!(is_valid_name("2024-03-01_CON", &windows()));
    }

    #[test]
    fn test_windows_zero_and_console_device_names() {
        for name in ["COM0", "lpt0.log", "CONIN$", "conout$.txt"] {
            assert!(
                matches!(
                    validate_name(name, &windows()),
                    Err(InvalidName::ReservedDeviceName(_))
                ),
                "{} should be reserved",
                name
            );
            assert!(is_valid_name(name, &unix()));
        }
        assert!(is_valid_name("COM10", &windows()));
    }

    #[test]
    fn test_length_limit() {
        let rules = NameRules::new(NamePlatform::Unix, 20);
        assert!(is_valid_name(&"a".repeat(20), &rules));
        assert_eq!(
            validate_name(&"a".repeat(21), &rules),
            Err(InvalidName::TooLong { length: 21, max: 20 })
        );
    }

    #[test]
    fn test_length_measured_per_platform() {
        // Four bytes in UTF-8, two UTF-16 units
        let name = "\u{1F600}";
        assert!(!is_valid_name(name, &NameRules::new(NamePlatform::Unix, 3)));
        assert!(is_valid_name(name, &NameRules::new(NamePlatform::Windows, 3)));
    }

    #[test]
    fn test_empty_and_dot_names() {
        assert_eq!(validate_name("", &unix()), Err(InvalidName::Empty));
        assert_eq!(validate_name("..", &unix()), Err(InvalidName::DotName));
    }

    #[test]
    fn test_macos_allows_colon() {
        let rules = NameRules::new(NamePlatform::MacOs, 255);
        assert!(is_valid_name("2024-03-01_10:30 meeting", &rules));
        assert_eq!(validate_name("a/b", &rules), Err(InvalidName::PathSeparator));
    }
}
