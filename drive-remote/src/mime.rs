use regex::Regex;

const EXTENSION_PATTERNS: &[(&str, &str)] = &[
    ("csv", "text/csv"),
    ("html?", "text/html"),
    ("te?xt", "text/plain"),
    ("gif", "image/gif"),
    ("png", "image/png"),
    ("svg", "image/svg+xml"),
    ("jpe?g", "image/jpeg"),
    ("odt", "application/vnd.oasis.opendocument.text"),
    ("rtf", "application/rtf"),
    ("pdf", "application/pdf"),
    (
        "docx?",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    (
        "pptx?",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    ),
    (
        "xlsx?",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    ),
];

/// Extension to content-type lookup, compiled once per instance.
#[derive(Debug, Clone)]
pub struct MimeResolver {
    table: Vec<(Regex, &'static str)>,
}

impl MimeResolver {
    pub fn new() -> Self {
        let table = EXTENSION_PATTERNS
            .iter()
            .filter_map(|(pattern, mime)| {
                Regex::new(&format!("(?i)^(?:{pattern})$"))
                    .ok()
                    .map(|re| (re, *mime))
            })
            .collect();
        Self { table }
    }

    /// Returns the content type for `ext` (with or without the leading dot),
    /// or an empty string when nothing matches.
    pub fn from_extension(&self, ext: &str) -> &'static str {
        let ext = ext.trim_start_matches('.');
        self.table
            .iter()
            .find(|(re, _)| re.is_match(ext))
            .map(|(_, mime)| *mime)
            .unwrap_or("")
    }

    pub fn from_name(&self, name: &str) -> &'static str {
        match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => self.from_extension(ext),
            _ => "",
        }
    }
}

impl Default for MimeResolver {
    fn default() -> Self {
        Self::new()
    }
}
