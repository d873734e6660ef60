use crate::backends::Voice;

/// The set of available voices as last reported by the engine.
///
/// Replaced wholesale on every refresh; sorted case-insensitively by name
/// with ties keeping the engine's enumeration order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    voices: Vec<Voice>,
}

impl Catalog {
    pub fn from_unsorted(mut voices: Vec<Voice>) -> Self {
        // Vec::sort_by is stable, which preserves enumeration order for ties.
        voices.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Self { voices }
    }

    /// Default selection policy, in priority order: Arabic, then US English,
    /// then the "Albert" voice, then whatever sorts first.
    pub fn default_selection(&self) -> Option<&Voice> {
        self.voices
            .iter()
            .find(|v| v.lang.starts_with("ar"))
            .or_else(|| self.voices.iter().find(|v| v.lang.starts_with("en-US")))
            .or_else(|| self.voices.iter().find(|v| v.name == "Albert"))
            .or_else(|| self.voices.first())
    }

    pub fn find(&self, name: &str) -> Option<&Voice> {
        self.voices.iter().find(|v| v.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    pub fn get(&self, index: usize) -> Option<&Voice> {
        self.voices.get(index)
    }

    pub fn first(&self) -> Option<&Voice> {
        self.voices.first()
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Voice> {
        self.voices.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(name: &str, lang: &str) -> Voice {
        Voice::new(name, lang)
    }

    #[test]
    fn sorts_case_insensitively() {
        let catalog = Catalog::from_unsorted(vec![
            v("bob", "en-GB"),
            v("Alice", "en-GB"),
            v("adam", "en-GB"),
        ]);
        let names: Vec<&str> = catalog.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, ["adam", "Alice", "bob"]);
    }

    #[test]
    fn sort_is_stable_for_equal_names() {
        let catalog = Catalog::from_unsorted(vec![
            v("Echo", "fr-FR"),
            v("echo", "de-DE"),
            v("ECHO", "en-US"),
        ]);
        let langs: Vec<&str> = catalog.iter().map(|v| v.lang.as_str()).collect();
        assert_eq!(langs, ["fr-FR", "de-DE", "en-US"]);
    }

    #[test]
    fn default_prefers_arabic() {
        let catalog = Catalog::from_unsorted(vec![
            v("Samantha", "en-US"),
            v("Hoda", "ar-EG"),
            v("Albert", "de-DE"),
        ]);
        assert_eq!(catalog.default_selection().unwrap().name, "Hoda");
    }

    #[test]
    fn default_falls_back_to_en_us_over_albert() {
        // Sorted order puts Albert first; the tiered policy must still pick
        // the US English voice.
        let catalog = Catalog::from_unsorted(vec![
            v("X", "fr-FR"),
            v("Y", "en-US"),
            v("Albert", "de-DE"),
        ]);
        assert_eq!(catalog.default_selection().unwrap().name, "Y");
    }

    #[test]
    fn default_falls_back_to_albert_then_first() {
        let catalog = Catalog::from_unsorted(vec![v("Zoe", "fr-FR"), v("Albert", "de-DE")]);
        assert_eq!(catalog.default_selection().unwrap().name, "Albert");

        let catalog = Catalog::from_unsorted(vec![v("Zoe", "fr-FR"), v("Mina", "ja-JP")]);
        assert_eq!(catalog.default_selection().unwrap().name, "Mina");
    }

    #[test]
    fn empty_catalog_has_no_default() {
        assert!(Catalog::default().default_selection().is_none());
    }
}
