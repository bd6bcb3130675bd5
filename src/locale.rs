//! Localisation lookup: per-language message catalogues keyed by the
//! supported-locales setting. Lookup misses pass the message through.

use std::collections::HashMap;
use std::path::Path;

#[derive(Clone, Debug, Default)]
pub struct MessageCatalog {
    languages: Vec<String>,
    messages: HashMap<String, HashMap<String, String>>,
}

impl MessageCatalog {
    pub fn new(languages: Vec<String>) -> Self {
        MessageCatalog {
            languages,
            messages: HashMap::new(),
        }
    }

    pub fn insert(&mut self, lang: &str, msg: &str, translation: &str) {
        self.messages
            .entry(lang.to_string())
            .or_default()
            .insert(msg.to_string(), translation.to_string());
    }

    pub fn translate<'a>(&'a self, lang: &str, msg: &'a str) -> &'a str {
        self.messages
            .get(lang)
            .and_then(|m| m.get(msg))
            .map(String::as_str)
            .unwrap_or(msg)
    }

    pub fn supports(&self, lang: &str) -> bool {
        self.languages.iter().any(|l| l == lang)
    }

    /// Reload catalogues from `<dir>/<lang>.json` files (flat string maps).
    /// Missing files leave that language's catalogue empty.
    pub fn refresh_from_dir(&mut self, dir: &Path) -> std::io::Result<usize> {
        let mut loaded = 0;
        for lang in self.languages.clone() {
            let path = dir.join(format!("{}.json", lang));
            if !path.exists() {
                continue;
            }
            let raw = std::fs::read_to_string(&path)?;
            let map: HashMap<String, String> = serde_json::from_str(&raw)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
            loaded += map.len();
            self.messages.insert(lang, map);
        }
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translate_falls_back_to_message() {
        let mut c = MessageCatalog::new(vec!["en".into(), "fr".into()]);
        c.insert("fr", "Course added", "Cours ajouté");
        assert_eq!(c.translate("fr", "Course added"), "Cours ajouté");
        assert_eq!(c.translate("fr", "Unknown"), "Unknown");
        assert_eq!(c.translate("de", "Course added"), "Course added");
    }
}
