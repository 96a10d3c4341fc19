//! Source classification.

/// Prefix marking a Telegram file reference
pub const PLATFORM_PREFIX: &str = "tg:";

/// Where a photo comes from, decided once per fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotoSource<'a> {
    /// Platform-hosted file, resolved through a [`FileResolver`](super::FileResolver)
    Platform { file_id: &'a str },
    /// Anything else is treated as an HTTP(S) URL
    Url(&'a str),
}

impl<'a> PhotoSource<'a> {
    /// Classify a raw source string.
    ///
    /// Returns `None` for empty or whitespace-only input, including a bare
    /// platform prefix with no file id.
    pub fn parse(raw: &'a str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        match raw.strip_prefix(PLATFORM_PREFIX) {
            Some(file_id) => {
                let file_id = file_id.trim();
                if file_id.is_empty() {
                    return None;
                }
                Some(PhotoSource::Platform { file_id })
            }
            None => Some(PhotoSource::Url(raw)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sources_are_rejected() {
        assert_eq!(PhotoSource::parse(""), None);
        assert_eq!(PhotoSource::parse("   "), None);
    }

    #[test]
    fn bare_prefix_is_empty() {
        assert_eq!(PhotoSource::parse("tg:"), None);
        assert_eq!(PhotoSource::parse(" tg:  "), None);
        assert_eq!(
            PhotoSource::parse("tg: ABC123"),
            Some(PhotoSource::Platform { file_id: "ABC123" })
        );
    }

    #[test]
    fn prefix_selects_platform() {
        assert_eq!(
            PhotoSource::parse("tg:ABC123"),
            Some(PhotoSource::Platform { file_id: "ABC123" })
        );
    }

    #[test]
    fn everything_else_is_a_url() {
        assert_eq!(
            PhotoSource::parse(" https://example.com/cat.jpg "),
            Some(PhotoSource::Url("https://example.com/cat.jpg"))
        );
        // Prefix match is case-sensitive
        assert_eq!(PhotoSource::parse("TG:abc"), Some(PhotoSource::Url("TG:abc")));
    }
}
