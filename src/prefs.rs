use crate::config::Config;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LearningStyle {
    Spatial,
    Linguistic,
}

impl LearningStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            LearningStyle::Spatial => "spatial",
            LearningStyle::Linguistic => "linguistic",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "spatial" => Some(LearningStyle::Spatial),
            "linguistic" => Some(LearningStyle::Linguistic),
            _ => None,
        }
    }

    pub fn all() -> Vec<LearningStyle> {
        vec![LearningStyle::Spatial, LearningStyle::Linguistic]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            LearningStyle::Spatial => "Spatial",
            LearningStyle::Linguistic => "Linguistic",
        }
    }

    /// The fixed list of enhancements offered for this style. Order matters:
    /// the first entry is the default whenever the style is (re)selected.
    pub fn enhancements(&self) -> &'static [&'static str] {
        match self {
            LearningStyle::Spatial => &[
                "Spatial Representations",
                "Chunking Information",
                "Interactive Quizzes",
            ],
            LearningStyle::Linguistic => &[
                "Personalized Summaries",
                "Interactive Q&A",
                "Contextual Examples",
            ],
        }
    }

    pub fn default_enhancement(&self) -> &'static str {
        self.enhancements()[0]
    }
}

/// Resolve stored preferences into a usable pair, applying defaults for
/// missing keys. A stored enhancement that does not belong to the resolved
/// style's list falls back to that list's first entry, so the pair always
/// satisfies the membership invariant.
pub fn resolve(config: &Config) -> (LearningStyle, String) {
    let style = config
        .learning_style
        .as_deref()
        .and_then(LearningStyle::from_str)
        .unwrap_or(LearningStyle::Spatial);

    let enhancement = config
        .enhancement_type
        .as_deref()
        .filter(|e| style.enhancements().contains(e))
        .unwrap_or(style.default_enhancement())
        .to_string();

    (style, enhancement)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_round_trip() {
        for style in LearningStyle::all() {
            assert_eq!(LearningStyle::from_str(style.as_str()), Some(style));
        }
        assert_eq!(LearningStyle::from_str("Spatial"), Some(LearningStyle::Spatial));
        assert_eq!(LearningStyle::from_str("kinesthetic"), None);
    }

    #[test]
    fn test_enhancement_lists() {
        assert_eq!(
            LearningStyle::Spatial.enhancements(),
            &["Spatial Representations", "Chunking Information", "Interactive Quizzes"]
        );
        assert_eq!(
            LearningStyle::Linguistic.enhancements(),
            &["Personalized Summaries", "Interactive Q&A", "Contextual Examples"]
        );
        assert_eq!(LearningStyle::Spatial.default_enhancement(), "Spatial Representations");
    }

    #[test]
    fn test_resolve_empty_config_uses_defaults() {
        let config = Config::new();
        let (style, enhancement) = resolve(&config);
        assert_eq!(style, LearningStyle::Spatial);
        assert_eq!(enhancement, "Spatial Representations");
    }

    #[test]
    fn test_resolve_stored_pair() {
        let mut config = Config::new();
        config.learning_style = Some("linguistic".to_string());
        config.enhancement_type = Some("Contextual Examples".to_string());
        let (style, enhancement) = resolve(&config);
        assert_eq!(style, LearningStyle::Linguistic);
        assert_eq!(enhancement, "Contextual Examples");
    }

    #[test]
    fn test_resolve_enhancement_outside_style_list() {
        // A spatial enhancement stored alongside a linguistic style violates
        // the membership invariant; the style's own first entry wins.
        let mut config = Config::new();
        config.learning_style = Some("linguistic".to_string());
        config.enhancement_type = Some("Spatial Representations".to_string());
        let (style, enhancement) = resolve(&config);
        assert_eq!(style, LearningStyle::Linguistic);
        assert_eq!(enhancement, "Personalized Summaries");
    }

    #[test]
    fn test_resolve_unknown_style_falls_back() {
        let mut config = Config::new();
        config.learning_style = Some("auditory".to_string());
        let (style, enhancement) = resolve(&config);
        assert_eq!(style, LearningStyle::Spatial);
        assert_eq!(enhancement, "Spatial Representations");
    }
}
