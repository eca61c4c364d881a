use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_LOCALE: &str = "en";
pub const LOCALE_FILE_PREFIX: &str = "locale_file_";
pub const LOCALE_FILE_EXTENSION: &str = "txt";

/// `key=value` translation table for spoken class and direction names.
///
/// Lookups never fail: unknown keys translate to an empty string.
#[derive(Clone, Debug, Default)]
pub struct Translator {
    locale: String,
    dir: Option<PathBuf>,
    translations: HashMap<String, String>,
}

impl Translator {
    /// Load `locale_file_<locale>.txt` from `dir`.
    ///
    /// A missing or unreadable file is logged and leaves the table empty.
    pub fn load(dir: impl Into<PathBuf>, locale: &str) -> Self {
        let mut translator = Self {
            locale: locale.to_string(),
            dir: Some(dir.into()),
            translations: HashMap::new(),
        };
        translator.reload();
        translator
    }

    /// Build a translator from an in-memory table.
    pub fn from_table(locale: &str, raw: &str) -> Self {
        Self {
            locale: locale.to_string(),
            dir: None,
            translations: parse_table(raw),
        }
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Switch locale and reload the table from the locale directory.
    pub fn set_locale(&mut self, locale: &str) {
        self.locale = locale.to_string();
        self.reload();
    }

    pub fn lookup(&self, key: &str) -> &str {
        self.translations.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.translations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.translations.is_empty()
    }

    fn reload(&mut self) {
        let Some(dir) = &self.dir else {
            return;
        };
        let path = locale_file_path(dir, &self.locale);
        match std::fs::read_to_string(&path) {
            Ok(raw) => {
                self.translations = parse_table(&raw);
                log::debug!(
                    "loaded {} translations for locale '{}'",
                    self.translations.len(),
                    self.locale
                );
            }
            Err(err) => {
                log::warn!("failed to read locale file {}: {}", path.display(), err);
                self.translations.clear();
            }
        }
    }
}

pub fn locale_file_path(dir: &Path, locale: &str) -> PathBuf {
    dir.join(format!(
        "{}{}.{}",
        LOCALE_FILE_PREFIX, locale, LOCALE_FILE_EXTENSION
    ))
}

/// Parse `key=value` lines. Blank lines and `#` comments are skipped, lines
/// without `=` are ignored, and only the first `=` splits.
pub fn parse_table(raw: &str) -> HashMap<String, String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comments_blanks_and_first_equals() {
        let table = parse_table("# header\n\nchair = stul\nbad line\nsign=a=b\n  left=vlevo  ");
        assert_eq!(table.len(), 3);
        assert_eq!(table["chair"], "stul");
        assert_eq!(table["sign"], "a=b");
        assert_eq!(table["left"], "vlevo");
    }

    #[test]
    fn unknown_keys_translate_to_empty() {
        let translator = Translator::from_table("en", "chair=chair");
        assert_eq!(translator.lookup("chair"), "chair");
        assert_eq!(translator.lookup("sofa"), "");
    }

    #[test]
    fn locale_file_name_follows_convention() {
        let path = locale_file_path(Path::new("/assets"), "cs");
        assert_eq!(path, PathBuf::from("/assets/locale_file_cs.txt"));
    }

    #[test]
    fn missing_locale_file_leaves_empty_table() {
        let translator = Translator::load("/nonexistent", "xx");
        assert!(translator.is_empty());
        assert_eq!(translator.locale(), "xx");
    }
}
