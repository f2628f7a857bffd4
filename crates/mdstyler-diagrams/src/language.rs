//! Diagram languages.

/// Language used when a block is tagged with the default identifier.
pub const DEFAULT_LANGUAGE: DiagramLanguage = DiagramLanguage::Mermaid;

/// Supported diagram languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagramLanguage {
    Mermaid,
    PlantUml,
    C4PlantUml,
    GraphViz,
    D2,
    Ditaa,
    Bpmn,
    BlockDiag,
    Erd,
    Nomnoml,
    Svgbob,
    Vega,
    VegaLite,
    WaveDrom,
}

impl DiagramLanguage {
    /// Every supported language.
    pub const ALL: [Self; 14] = [
        Self::Mermaid,
        Self::PlantUml,
        Self::C4PlantUml,
        Self::GraphViz,
        Self::D2,
        Self::Ditaa,
        Self::Bpmn,
        Self::BlockDiag,
        Self::Erd,
        Self::Nomnoml,
        Self::Svgbob,
        Self::Vega,
        Self::VegaLite,
        Self::WaveDrom,
    ];

    /// Parse a code fence language tag.
    ///
    /// Accepts the plain name (`mermaid`) and the `kroki-` prefixed form
    /// (`kroki-mermaid`). Tags are matched case-insensitively.
    #[must_use]
    pub fn parse(tag: &str) -> Option<Self> {
        let tag = tag.trim().to_ascii_lowercase();
        let name = tag.strip_prefix("kroki-").unwrap_or(&tag);

        match name {
            "mermaid" => Some(Self::Mermaid),
            "plantuml" | "puml" => Some(Self::PlantUml),
            "c4plantuml" => Some(Self::C4PlantUml),
            "graphviz" | "dot" => Some(Self::GraphViz),
            "d2" => Some(Self::D2),
            "ditaa" => Some(Self::Ditaa),
            "bpmn" => Some(Self::Bpmn),
            "blockdiag" => Some(Self::BlockDiag),
            "erd" => Some(Self::Erd),
            "nomnoml" => Some(Self::Nomnoml),
            "svgbob" => Some(Self::Svgbob),
            "vega" => Some(Self::Vega),
            "vegalite" => Some(Self::VegaLite),
            "wavedrom" => Some(Self::WaveDrom),
            _ => None,
        }
    }

    /// Canonical name, also the Kroki endpoint and the wrapper class suffix.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Mermaid => "mermaid",
            Self::PlantUml => "plantuml",
            Self::C4PlantUml => "c4plantuml",
            Self::GraphViz => "graphviz",
            Self::D2 => "d2",
            Self::Ditaa => "ditaa",
            Self::Bpmn => "bpmn",
            Self::BlockDiag => "blockdiag",
            Self::Erd => "erd",
            Self::Nomnoml => "nomnoml",
            Self::Svgbob => "svgbob",
            Self::Vega => "vega",
            Self::VegaLite => "vegalite",
            Self::WaveDrom => "wavedrom",
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_parse_plain_and_prefixed() {
        for language in DiagramLanguage::ALL {
            let name = language.name();
            assert_eq!(DiagramLanguage::parse(name), Some(language), "{name}");
            assert_eq!(
                DiagramLanguage::parse(&format!("kroki-{name}")),
                Some(language),
                "kroki-{name}"
            );
        }
    }

    #[test]
    fn test_aliases_and_case() {
        assert_eq!(DiagramLanguage::parse("dot"), Some(DiagramLanguage::GraphViz));
        assert_eq!(DiagramLanguage::parse("Mermaid"), Some(DiagramLanguage::Mermaid));
        assert_eq!(DiagramLanguage::parse("puml"), Some(DiagramLanguage::PlantUml));
        assert_eq!(DEFAULT_LANGUAGE.name(), "mermaid");
    }

    #[test]
    fn test_unknown_languages() {
        assert_eq!(DiagramLanguage::parse("rust"), None);
        assert_eq!(DiagramLanguage::parse("kroki-unknown"), None);
        assert_eq!(DiagramLanguage::parse("kroki-"), None);
        assert_eq!(DiagramLanguage::parse(""), None);
    }
}
