use serde::{Deserialize, Serialize};

/// Diagram family, decided once from the header keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FamilyHint {
    Flowchart,
    Sequence,
    EntityRelation,
    Timeline,
    Mindmap,
    Unknown,
}

impl FamilyHint {
    pub const ALL: [FamilyHint; 6] = [
        FamilyHint::Flowchart,
        FamilyHint::Sequence,
        FamilyHint::EntityRelation,
        FamilyHint::Timeline,
        FamilyHint::Mindmap,
        FamilyHint::Unknown,
    ];

    /// Classify a diagram from its first non-blank, non-comment line.
    pub fn classify<'a>(lines: impl IntoIterator<Item = &'a str>) -> Self {
        let header = lines
            .into_iter()
            .map(str::trim)
            .find(|l| !l.is_empty() && !l.starts_with("%%"));
        match header {
            Some(line) => Self::from_keyword(line.split_whitespace().next().unwrap_or_default()),
            None => FamilyHint::Unknown,
        }
    }

    /// Map a header keyword (`graph`, `sequenceDiagram`, ...) to its family.
    pub fn from_keyword(keyword: &str) -> Self {
        match keyword.to_ascii_lowercase().as_str() {
            "flowchart" | "graph" => FamilyHint::Flowchart,
            "sequencediagram" => FamilyHint::Sequence,
            "erdiagram" => FamilyHint::EntityRelation,
            "gantt" => FamilyHint::Timeline,
            "mindmap" => FamilyHint::Mindmap,
            _ => FamilyHint::Unknown,
        }
    }

    /// Header keyword a generated diagram of this family must start with.
    pub fn header_keyword(self) -> Option<&'static str> {
        match self {
            FamilyHint::Flowchart => Some("flowchart"),
            FamilyHint::Sequence => Some("sequenceDiagram"),
            FamilyHint::EntityRelation => Some("erDiagram"),
            FamilyHint::Timeline => Some("gantt"),
            FamilyHint::Mindmap => Some("mindmap"),
            FamilyHint::Unknown => None,
        }
    }

    /// Human-readable name used in prompts and history titles.
    pub fn display_name(self) -> &'static str {
        match self {
            FamilyHint::Flowchart => "Flowchart",
            FamilyHint::Sequence => "Sequence Diagram",
            FamilyHint::EntityRelation => "ER Diagram",
            FamilyHint::Timeline => "Gantt Chart",
            FamilyHint::Mindmap => "Mindmap",
            FamilyHint::Unknown => "Diagram",
        }
    }
}

impl std::fmt::Display for FamilyHint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

impl std::str::FromStr for FamilyHint {
    type Err = String;

    /// Accepts the kebab-case names plus the header keywords.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "flowchart" | "graph" => Ok(FamilyHint::Flowchart),
            "sequence" | "sequencediagram" => Ok(FamilyHint::Sequence),
            "entity-relation" | "er" | "erdiagram" => Ok(FamilyHint::EntityRelation),
            "timeline" | "gantt" => Ok(FamilyHint::Timeline),
            "mindmap" => Ok(FamilyHint::Mindmap),
            "unknown" => Ok(FamilyHint::Unknown),
            other => Err(format!("unknown diagram family: {other}")),
        }
    }
}

/// One diagram description as an ordered list of lines.
///
/// Lines are only ever rewritten in place; their order and count are
/// preserved by every transform in this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagramSource {
    pub family: FamilyHint,
    pub lines: Vec<String>,
}

impl DiagramSource {
    /// Build a source from lines, classifying the family from the header.
    pub fn new(lines: Vec<String>) -> Self {
        let family = FamilyHint::classify(lines.iter().map(String::as_str));
        Self { family, lines }
    }

    pub fn empty() -> Self {
        Self {
            family: FamilyHint::Unknown,
            lines: Vec::new(),
        }
    }

    pub fn from_text(text: &str) -> Self {
        if text.is_empty() {
            return Self::empty();
        }
        Self::new(text.lines().map(String::from).collect())
    }

    /// Copy of this source with the lines replaced. The family hint carries
    /// over unchanged.
    pub fn with_lines(&self, lines: Vec<String>) -> Self {
        Self {
            family: self.family,
            lines,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|l| l.trim().is_empty())
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

impl Default for DiagramSource {
    fn default() -> Self {
        Self::empty()
    }
}

impl std::fmt::Display for DiagramSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text())
    }
}
