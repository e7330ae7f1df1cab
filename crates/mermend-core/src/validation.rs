use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{DiagramSource, FamilyHint};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCategory {
    StyleSpacing,
    UnbalancedBlock,
    InvalidCommentMarker,
    ReservedKeywordMisuse,
    TrailingTextAfterNode,
    UnquotedSpecialCharacters,
    MissingDateOrDuration,
    DanglingConnector,
    MalformedAttributeOrder,
}

impl ErrorCategory {
    pub fn label(self) -> &'static str {
        match self {
            ErrorCategory::StyleSpacing => "Style Error",
            ErrorCategory::UnbalancedBlock => "Block Error",
            ErrorCategory::InvalidCommentMarker => "Comment Error",
            ErrorCategory::ReservedKeywordMisuse => "Gantt Error",
            ErrorCategory::TrailingTextAfterNode => "Mindmap Error",
            ErrorCategory::UnquotedSpecialCharacters => "Mindmap Error",
            ErrorCategory::MissingDateOrDuration => "Gantt Error",
            ErrorCategory::DanglingConnector => "Flowchart Error",
            ErrorCategory::MalformedAttributeOrder => "ER Diagram Error",
        }
    }
}

/// One detected problem. `line_number` is 1-based; 0 means the whole document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub line_number: usize,
    pub category: ErrorCategory,
    pub message: String,
}

impl Finding {
    pub fn is_document_level(&self) -> bool {
        self.line_number == 0
    }
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_document_level() {
            write!(f, "{}: {}", self.category.label(), self.message)
        } else {
            write!(
                f,
                "{} (Line {}): {}",
                self.category.label(),
                self.line_number,
                self.message
            )
        }
    }
}

// ── Patterns ────────────────────────────────────────────────────

static STYLE_COMMA_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":[#a-zA-Z0-9]+,\s+").expect("style pattern"));
static TODAY_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^today\b").expect("today pattern"));
static ABSOLUTE_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}-\d{2}-\d{2}").expect("date pattern"));
static DURATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d+(?:ms|[smhdwMy])\b").expect("duration pattern"));
static AFTER_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bafter\b").expect("after pattern"));
static TRAILING_CONNECTOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(-{2,}>?|\.-+>|={2,}>)\s*$").expect("connector pattern"));
static ER_RELATIONSHIP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[}|o](--|\.\.)[}|o]").expect("relationship pattern"));

const STYLE_KEYWORDS: &[&str] = &["style", "classDef", "linkStyle"];
const MINDMAP_CONNECTORS: &[&str] = &["-->", "---"];
const KEY_MARKERS: &[&str] = &["PK", "FK"];
const GANTT_METADATA: &[&str] = &[
    "title",
    "dateFormat",
    "axisFormat",
    "section",
    "excludes",
    "includes",
    "todayMarker",
    "tickInterval",
    "weekday",
    "accTitle",
    "accDescr",
];

// ── Dispatch table ──────────────────────────────────────────────

enum Rule {
    /// Runs on every non-comment line, returns a message for an offending line.
    Line(fn(&str) -> Option<String>),
    /// Runs once on the whole source.
    Document(fn(&DiagramSource) -> Option<String>),
}

struct Check {
    category: ErrorCategory,
    rule: Rule,
}

const STYLE_SPACING: Check = Check {
    category: ErrorCategory::StyleSpacing,
    rule: Rule::Line(style_spacing),
};
const UNBALANCED_BLOCK: Check = Check {
    category: ErrorCategory::UnbalancedBlock,
    rule: Rule::Document(unbalanced_block),
};
const INVALID_COMMENT_MARKER: Check = Check {
    category: ErrorCategory::InvalidCommentMarker,
    rule: Rule::Line(invalid_comment_marker),
};
const RESERVED_KEYWORD: Check = Check {
    category: ErrorCategory::ReservedKeywordMisuse,
    rule: Rule::Line(reserved_today),
};
const TRAILING_TEXT: Check = Check {
    category: ErrorCategory::TrailingTextAfterNode,
    rule: Rule::Line(trailing_text_after_node),
};
const UNQUOTED_SPECIALS: Check = Check {
    category: ErrorCategory::UnquotedSpecialCharacters,
    rule: Rule::Line(unquoted_special_characters),
};
const MISSING_DATE: Check = Check {
    category: ErrorCategory::MissingDateOrDuration,
    rule: Rule::Line(missing_date_or_duration),
};
const DANGLING_CONNECTOR: Check = Check {
    category: ErrorCategory::DanglingConnector,
    rule: Rule::Line(dangling_connector),
};
const MALFORMED_ATTRIBUTE: Check = Check {
    category: ErrorCategory::MalformedAttributeOrder,
    rule: Rule::Line(malformed_attribute_order),
};

const FLOWCHART_CHECKS: &[Check] = &[
    STYLE_SPACING,
    UNBALANCED_BLOCK,
    INVALID_COMMENT_MARKER,
    DANGLING_CONNECTOR,
];
const SEQUENCE_CHECKS: &[Check] = &[STYLE_SPACING, UNBALANCED_BLOCK, INVALID_COMMENT_MARKER];
const ENTITY_RELATION_CHECKS: &[Check] = &[
    STYLE_SPACING,
    UNBALANCED_BLOCK,
    INVALID_COMMENT_MARKER,
    MALFORMED_ATTRIBUTE,
];
const TIMELINE_CHECKS: &[Check] = &[
    STYLE_SPACING,
    UNBALANCED_BLOCK,
    INVALID_COMMENT_MARKER,
    RESERVED_KEYWORD,
    MISSING_DATE,
];
const MINDMAP_CHECKS: &[Check] = &[
    STYLE_SPACING,
    UNBALANCED_BLOCK,
    INVALID_COMMENT_MARKER,
    TRAILING_TEXT,
    UNQUOTED_SPECIALS,
];
const UNKNOWN_CHECKS: &[Check] = &[STYLE_SPACING, UNBALANCED_BLOCK, INVALID_COMMENT_MARKER];

fn checks_for(family: FamilyHint) -> &'static [Check] {
    match family {
        FamilyHint::Flowchart => FLOWCHART_CHECKS,
        FamilyHint::Sequence => SEQUENCE_CHECKS,
        FamilyHint::EntityRelation => ENTITY_RELATION_CHECKS,
        FamilyHint::Timeline => TIMELINE_CHECKS,
        FamilyHint::Mindmap => MINDMAP_CHECKS,
        FamilyHint::Unknown => UNKNOWN_CHECKS,
    }
}

/// Keywords that open a block closed by `end`, per family.
fn block_keywords(family: FamilyHint) -> &'static [&'static str] {
    match family {
        FamilyHint::Flowchart => &["subgraph"],
        FamilyHint::Sequence => &["loop", "opt", "alt", "par", "rect", "critical", "break"],
        FamilyHint::Unknown => &[
            "subgraph", "loop", "opt", "alt", "par", "rect", "critical", "break",
        ],
        FamilyHint::EntityRelation | FamilyHint::Timeline | FamilyHint::Mindmap => &[],
    }
}

/// Scan a source for known syntax problems.
///
/// Every check for the source's family runs; findings come back grouped by
/// check, in line order within a check. Nothing is modified.
pub fn validate(source: &DiagramSource) -> Vec<Finding> {
    let mut findings = Vec::new();

    for check in checks_for(source.family) {
        match check.rule {
            Rule::Line(rule) => {
                for (i, line) in source.lines.iter().enumerate() {
                    if is_comment(line) {
                        continue;
                    }
                    if let Some(message) = rule(line) {
                        findings.push(Finding {
                            line_number: i + 1,
                            category: check.category,
                            message,
                        });
                    }
                }
            }
            Rule::Document(rule) => {
                if let Some(message) = rule(source) {
                    findings.push(Finding {
                        line_number: 0,
                        category: check.category,
                        message,
                    });
                }
            }
        }
    }

    debug!(
        family = %source.family,
        lines = source.len(),
        findings = findings.len(),
        "Validated diagram source"
    );
    findings
}

fn is_comment(line: &str) -> bool {
    line.trim_start().starts_with("%%")
}

fn first_token(line: &str) -> Option<&str> {
    line.split_whitespace().next()
}

// ── Checks ──────────────────────────────────────────────────────

fn style_spacing(line: &str) -> Option<String> {
    let keyword = first_token(line)?;
    if !STYLE_KEYWORDS.contains(&keyword) || !STYLE_COMMA_SPACE.is_match(line) {
        return None;
    }
    Some(
        "Remove spaces after commas in style definitions (use 'fill:#fff,stroke:#000', not 'fill:#fff, stroke:#000')."
            .to_string(),
    )
}

fn unbalanced_block(source: &DiagramSource) -> Option<String> {
    let keywords = block_keywords(source.family);
    if keywords.is_empty() {
        return None;
    }

    let mut opens = 0usize;
    let mut ends = 0usize;
    for line in source.lines.iter().filter(|l| !is_comment(l)) {
        match first_token(line) {
            Some("end") => ends += 1,
            Some(token) if keywords.contains(&token) => opens += 1,
            _ => {}
        }
    }

    (opens != ends).then(|| {
        format!(
            "Found {opens} opening blocks but {ends} 'end' statements. Check that every {} block is closed.",
            keywords.join("/")
        )
    })
}

fn invalid_comment_marker(line: &str) -> Option<String> {
    // `scheme://` inside links is not a comment.
    let has_marker = line
        .match_indices("//")
        .any(|(idx, _)| !line[..idx].ends_with(':'));
    has_marker.then(|| {
        "Mermaid uses '%%' for comments, not '//'. Replace '//' with '%%' or remove the comment."
            .to_string()
    })
}

fn reserved_today(line: &str) -> Option<String> {
    TODAY_LINE.is_match(line.trim()).then(|| {
        "Line starts with 'today'. Mermaid does not support defining 'today' manually; remove this line and use absolute dates."
            .to_string()
    })
}

fn trailing_text_after_node(line: &str) -> Option<String> {
    if MINDMAP_CONNECTORS.iter().any(|c| line.contains(c)) {
        return None;
    }
    let last_close = line.rfind([')', ']', '}'])?;
    if line[last_close + 1..].trim().is_empty() {
        return None;
    }
    Some(format!(
        "Found text after node definition. Put each node on its own line. (Content: '{}')",
        line.trim()
    ))
}

fn unquoted_special_characters(line: &str) -> Option<String> {
    if line.contains('"') {
        return None;
    }
    let flagged = delimited_interiors(line)
        .into_iter()
        .any(|interior| interior.contains(['(', ')', ',']));
    flagged.then(|| {
        "Text containing brackets '()' or commas must be wrapped in double quotes (use `Node(\"Text (Detail)\")`, not `Node(Text (Detail))`)."
            .to_string()
    })
}

/// Interiors of every delimiter shell on the line, left to right. A doubled
/// opener such as `((` counts as one shell.
fn delimited_interiors(line: &str) -> Vec<&str> {
    let mut interiors = Vec::new();
    let mut from = 0;
    while let Some(offset) = line[from..].find(['(', '[', '{']) {
        let Some((interior, end)) = shell_at(line, from + offset) else {
            break;
        };
        interiors.push(interior);
        from = end + 1;
    }
    interiors
}

/// The shell opened at byte `start`: its interior and the index of the closer
/// that balances it.
fn shell_at(line: &str, start: usize) -> Option<(&str, usize)> {
    let bytes = line.as_bytes();
    let open = bytes[start];
    let close = match open {
        b'(' => b')',
        b'[' => b']',
        _ => b'}',
    };
    let doubled = bytes.get(start + 1) == Some(&open);
    let width = if doubled { 2 } else { 1 };

    let mut depth = 0usize;
    let mut end = None;
    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if b == open {
            depth += 1;
        } else if b == close {
            depth -= 1;
            if depth == 0 {
                end = Some(i);
                break;
            }
        }
    }
    let end = end?;

    let inner_end = if doubled && bytes[end - 1] == close {
        end - 1
    } else {
        end
    };
    if inner_end < start + width {
        return None;
    }
    Some((&line[start + width..inner_end], end))
}

fn missing_date_or_duration(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || GANTT_METADATA.iter().any(|m| trimmed.starts_with(m)) {
        return None;
    }
    if !trimmed.contains(':') {
        return None;
    }
    if ABSOLUTE_DATE.is_match(trimmed) || DURATION.is_match(trimmed) || AFTER_KEYWORD.is_match(trimmed)
    {
        return None;
    }
    Some(format!(
        "Task seems to be missing a start date (YYYY-MM-DD), a duration (e.g. 5d) or an 'after' dependency. (Content: '{trimmed}')"
    ))
}

fn dangling_connector(line: &str) -> Option<String> {
    let trimmed = line.trim();
    TRAILING_CONNECTOR.is_match(trimmed).then(|| {
        format!("Line ends with a connector/arrow but has no target node. (Content: '{trimmed}')")
    })
}

fn malformed_attribute_order(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if ER_RELATIONSHIP.is_match(trimmed) || trimmed.contains(['{', '}']) {
        return None;
    }
    let words: Vec<&str> = trimmed.split_whitespace().collect();
    if words.len() < 3 || !KEY_MARKERS.contains(&words[1]) {
        return None;
    }
    Some(format!(
        "Attribute seems malformed. Format should be `type name [PK/FK]`. (Found: '{trimmed}')"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn findings(text: &str) -> Vec<Finding> {
        validate(&DiagramSource::from_text(text))
    }

    fn categories(text: &str) -> Vec<(usize, ErrorCategory)> {
        findings(text)
            .into_iter()
            .map(|f| (f.line_number, f.category))
            .collect()
    }

    #[test]
    fn clean_flowchart_has_no_findings() {
        let text = "flowchart TD\n  A[\"Start (here)\"] --> B[Next]\n  style A fill:#f9f,stroke:#333";
        assert!(findings(text).is_empty());
    }

    #[test]
    fn style_spacing_flagged() {
        let text = "graph TD\n  A --> B\n  style A fill:#f9f, stroke:#333";
        assert_eq!(categories(text), vec![(3, ErrorCategory::StyleSpacing)]);
    }

    #[test]
    fn style_spacing_ignores_messages() {
        let text = "sequenceDiagram\n  A->>B: step:1, then 2";
        assert!(findings(text).is_empty());
    }

    #[test]
    fn unbalanced_subgraph_is_document_level() {
        let text = "flowchart LR\n  subgraph one\n    A --> B\n  subgraph two\n    C --> D\n  end";
        let found = findings(text);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].line_number, 0);
        assert_eq!(found[0].category, ErrorCategory::UnbalancedBlock);
        assert!(found[0].message.contains("Found 2 opening blocks but 1 'end'"));
        assert!(found[0].is_document_level());
    }

    #[test]
    fn balanced_sequence_blocks() {
        let text = "sequenceDiagram\n  loop Every minute\n    A->>B: ping\n  end\n  alt ok\n    B->>A: pong\n  else fail\n    B->>A: error\n  end";
        assert!(findings(text).is_empty());
    }

    #[test]
    fn block_words_inside_labels_are_not_counted() {
        let text = "flowchart TD\n  A[Feedback loop] --> B[End]";
        assert!(findings(text).is_empty());
    }

    #[test]
    fn double_slash_comment_flagged_but_not_urls() {
        let text = "flowchart TD\n  A --> B // next step\n  click A \"https://example.com\"";
        assert_eq!(categories(text), vec![(2, ErrorCategory::InvalidCommentMarker)]);
    }

    #[test]
    fn double_slash_after_space_still_flagged() {
        let text = "flowchart TD\n  A --> B //: note\n  C --> D %% ok";
        assert_eq!(categories(text), vec![(2, ErrorCategory::InvalidCommentMarker)]);
        assert!(invalid_comment_marker("  click A \"ftp://files\" // open").is_some());
        assert!(invalid_comment_marker("  click A \"ftp://files\"").is_none());
    }

    #[test]
    fn gantt_today_line_flagged() {
        let text = "gantt\n  dateFormat YYYY-MM-DD\n  today 2024-01-01\n  todayMarker off";
        assert_eq!(categories(text), vec![(3, ErrorCategory::ReservedKeywordMisuse)]);
    }

    #[test]
    fn gantt_task_without_date_flagged() {
        let text = "gantt\n  title Rollout\n  dateFormat YYYY-MM-DD\n  section Build\n  Design : des1, 2024-01-06, 3d\n  Build : bld1, after des1, 5d\n  Test : tst1, crit\n  Ship : 2w";
        assert_eq!(categories(text), vec![(7, ErrorCategory::MissingDateOrDuration)]);
    }

    #[test]
    fn today_rule_only_for_timeline() {
        let text = "flowchart TD\n  today --> tomorrow";
        assert!(findings(text).is_empty());
    }

    #[test]
    fn mindmap_trailing_text_flagged() {
        let text = "mindmap\n  root((\"Garment Factory\"))\n    Branch1(\"Work Centers (Sewing, Decoration, Finishing Lines)\")        \"Work Orde";
        assert_eq!(categories(text), vec![(3, ErrorCategory::TrailingTextAfterNode)]);
    }

    #[test]
    fn mindmap_one_finding_per_offending_line() {
        let text = "mindmap\n  root\n    A(x) B\n    C[y] D";
        assert_eq!(
            categories(text),
            vec![
                (3, ErrorCategory::TrailingTextAfterNode),
                (4, ErrorCategory::TrailingTextAfterNode),
            ]
        );
    }

    #[test]
    fn mindmap_connector_lines_skip_trailing_check() {
        let text = "mindmap\n  A(x) --> B(y)";
        assert!(
            findings(text)
                .iter()
                .all(|f| f.category != ErrorCategory::TrailingTextAfterNode)
        );
    }

    #[test]
    fn mindmap_unquoted_specials_flagged() {
        let text = "mindmap\n  root((Garment, Factory))\n    Process(Garment Production (Cutting,Sewing))\n    Done(\"Packing (Final)\")";
        assert_eq!(
            categories(text),
            vec![
                (2, ErrorCategory::UnquotedSpecialCharacters),
                (3, ErrorCategory::UnquotedSpecialCharacters),
            ]
        );
    }

    #[test]
    fn mindmap_double_shell_is_one_delimiter() {
        let text = "mindmap\n  root((Garment Factory))\n    A[Cutting]\n    B{{Sewing}}";
        assert!(findings(text).is_empty());
    }

    #[test]
    fn mindmap_scenario_after_repair_is_clean() {
        let text = "mindmap\n  root((Garment Factory))\n    Process(\"Garment Production (Cutting,Sewing)\")";
        assert!(findings(text).is_empty());
    }

    #[test]
    fn flowchart_dangling_connector() {
        let text = "flowchart TD\n  start[\"Customer PO (from SAP)\"] --> \n  A -.-> B\n  B ==>\n  C ---";
        assert_eq!(
            categories(text),
            vec![
                (2, ErrorCategory::DanglingConnector),
                (4, ErrorCategory::DanglingConnector),
                (5, ErrorCategory::DanglingConnector),
            ]
        );
    }

    #[test]
    fn er_attribute_order() {
        let text = "erDiagram\n  CUSTOMER ||--o{ ORDER : places\n  ORDER {\n    string id PK\n    Packing_WCID FK        VARCHAR S\n  }";
        assert_eq!(categories(text), vec![(5, ErrorCategory::MalformedAttributeOrder)]);
    }

    #[test]
    fn er_two_token_lines_are_fine() {
        let text = "erDiagram\n  ORDER {\n    id PK\n  }";
        assert!(findings(text).is_empty());
    }

    #[test]
    fn comment_lines_are_skipped() {
        let text = "gantt\n  %% Task : missing everything // really\n  Kickoff : 2024-01-01, 1d";
        assert!(findings(text).is_empty());
    }

    #[test]
    fn checks_report_in_order() {
        let text = "flowchart TD\n  A --> // dangling\n  style A fill:#fff, stroke:#000\n  subgraph S";
        let cats: Vec<_> = findings(text).into_iter().map(|f| f.category).collect();
        assert_eq!(
            cats,
            vec![
                ErrorCategory::StyleSpacing,
                ErrorCategory::UnbalancedBlock,
                ErrorCategory::InvalidCommentMarker,
            ]
        );
    }

    #[test]
    fn validate_is_deterministic() {
        let text = "mindmap\n  root((A, B)) tail\n  C(d (e))\n  // bad";
        let src = DiagramSource::from_text(text);
        assert_eq!(validate(&src), validate(&src));
        assert!(!validate(&src).is_empty());
    }

    #[test]
    fn empty_source_has_no_findings() {
        assert!(validate(&DiagramSource::empty()).is_empty());
    }

    #[test]
    fn finding_display_includes_line_and_label() {
        let finding = Finding {
            line_number: 4,
            category: ErrorCategory::DanglingConnector,
            message: "dangling".to_string(),
        };
        assert_eq!(finding.to_string(), "Flowchart Error (Line 4): dangling");
    }

    #[test]
    fn delimited_interior_shapes() {
        assert_eq!(delimited_interiors("root((Garment Factory))"), vec!["Garment Factory"]);
        assert_eq!(delimited_interiors("A(x (y))"), vec!["x (y)"]);
        assert_eq!(delimited_interiors("B{{hex}}"), vec!["hex"]);
        assert_eq!(delimited_interiors("Cut[Fabric] Sew(a, b)"), vec!["Fabric", "a, b"]);
        assert!(delimited_interiors("plain text").is_empty());
        assert!(delimited_interiors("bang)x(").is_empty());
    }

    #[test]
    fn mindmap_later_shell_with_specials_flagged() {
        let text = "mindmap\n  root\n    Cut[Fabric] Sew(a, b)";
        assert_eq!(categories(text), vec![(3, ErrorCategory::UnquotedSpecialCharacters)]);
    }
}
