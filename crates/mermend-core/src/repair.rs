use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, info};

use crate::{DiagramSource, FamilyHint};

const COMMENT_MARKER: &str = "%%";

/// `prefix((content))suffix` with no quotes in the content.
static DOUBLE_PAREN_NODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(\s*[^(\n]*)\(\(([^"]*)\)\)(\s*)$"#).expect("double paren pattern")
});

/// `prefix(content)suffix` where the content has a paren or comma and no quotes.
static PAREN_NODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(\s*[^(\n]*)\(([^"]*[(),][^"]*)\)(\s*)$"#).expect("paren pattern")
});

/// `id[content]` where the content has a paren and no quotes. The id never
/// crosses another bracket, so every label on a line is its own match; a
/// `[[` subroutine shell keeps its inner bracket.
static BRACKET_NODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([^\s\[\]"]+\[?)\[([^"\[\]]*[()][^"\[\]]*)\]"#).expect("bracket pattern")
});

/// One line-level rewrite. Every pass sees a single line and nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RepairPass {
    StripTrailingComment,
    QuoteDoubleParenLabel,
    QuoteParenLabel,
    QuoteBracketLabel,
}

impl RepairPass {
    /// Returns the rewritten line, or `None` when the pass does not apply.
    pub fn apply(self, line: &str) -> Option<String> {
        match self {
            RepairPass::StripTrailingComment => strip_trailing_comment(line),
            RepairPass::QuoteDoubleParenLabel => quote_double_paren_label(line),
            RepairPass::QuoteParenLabel => quote_paren_label(line),
            RepairPass::QuoteBracketLabel => quote_bracket_label(line),
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            RepairPass::StripTrailingComment => "removed trailing %% comment",
            RepairPass::QuoteDoubleParenLabel => "quoted (( )) node text",
            RepairPass::QuoteParenLabel => "quoted ( ) node text",
            RepairPass::QuoteBracketLabel => "quoted [ ] node label",
        }
    }
}

const MINDMAP_PASSES: &[RepairPass] = &[
    // Must run before the single-paren pass, which skips `((` lines.
    RepairPass::QuoteDoubleParenLabel,
    RepairPass::QuoteParenLabel,
];

const FLOWCHART_PASSES: &[RepairPass] = &[RepairPass::QuoteBracketLabel];

fn family_passes(family: FamilyHint) -> &'static [RepairPass] {
    match family {
        FamilyHint::Mindmap => MINDMAP_PASSES,
        FamilyHint::Flowchart => FLOWCHART_PASSES,
        FamilyHint::Sequence
        | FamilyHint::EntityRelation
        | FamilyHint::Timeline
        | FamilyHint::Unknown => &[],
    }
}

/// Ordered passes for a family: comment stripping first, then the family's own.
pub fn passes_for(family: FamilyHint) -> impl Iterator<Item = RepairPass> {
    std::iter::once(RepairPass::StripTrailingComment).chain(family_passes(family).iter().copied())
}

/// A pass that changed a line. Line numbers are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedFix {
    pub line_number: usize,
    pub pass: RepairPass,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepairResult {
    pub before: DiagramSource,
    pub after: DiagramSource,
    pub changed: bool,
    pub fixes: Vec<AppliedFix>,
}

/// Run every applicable pass over every line.
///
/// The result has exactly as many lines as the input, and repairing the
/// output again changes nothing.
pub fn repair(source: &DiagramSource) -> RepairResult {
    let mut fixes = Vec::new();
    let mut lines = Vec::with_capacity(source.lines.len());

    for (i, original) in source.lines.iter().enumerate() {
        let mut line = original.clone();
        for pass in passes_for(source.family) {
            if let Some(rewritten) = pass.apply(&line) {
                debug!(line = i + 1, ?pass, from = %line, to = %rewritten, "repair pass applied");
                fixes.push(AppliedFix {
                    line_number: i + 1,
                    pass,
                });
                line = rewritten;
            }
        }
        lines.push(line);
    }

    let after = source.with_lines(lines);
    let changed = after.lines != source.lines;
    if changed {
        info!(
            family = %source.family,
            fixes = fixes.len(),
            "Repaired diagram source"
        );
    }

    RepairResult {
        before: source.clone(),
        after,
        changed,
        fixes,
    }
}

fn strip_trailing_comment(line: &str) -> Option<String> {
    let idx = line.find(COMMENT_MARKER)?;
    if line.trim_start().starts_with(COMMENT_MARKER) {
        return None;
    }
    Some(line[..idx].trim_end().to_string())
}

fn needs_quotes(content: &str) -> bool {
    content.contains(['(', ')', ','])
}

fn quote_double_paren_label(line: &str) -> Option<String> {
    let caps = DOUBLE_PAREN_NODE.captures(line)?;
    let content = &caps[2];
    if !needs_quotes(content) {
        return None;
    }
    Some(format!("{}((\"{}\")){}", &caps[1], content, &caps[3]))
}

fn quote_paren_label(line: &str) -> Option<String> {
    if line.contains("((") {
        return None;
    }
    let caps = PAREN_NODE.captures(line)?;
    Some(format!("{}(\"{}\"){}", &caps[1], &caps[2], &caps[3]))
}

fn quote_bracket_label(line: &str) -> Option<String> {
    if !BRACKET_NODE.is_match(line) {
        return None;
    }
    Some(
        BRACKET_NODE
            .replace_all(line, r#"${1}["${2}"]"#)
            .into_owned(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(text: &str) -> DiagramSource {
        DiagramSource::from_text(text)
    }

    fn repaired_line(text: &str, index: usize) -> String {
        repair(&source(text)).after.lines[index].clone()
    }

    #[test]
    fn strips_trailing_comment() {
        assert_eq!(
            strip_trailing_comment("deactivate Odoo %% Deactivating Odoo").as_deref(),
            Some("deactivate Odoo")
        );
        assert_eq!(
            strip_trailing_comment("        string type %% RawMaterial, FBB,").as_deref(),
            Some("        string type")
        );
    }

    #[test]
    fn whole_line_comment_untouched() {
        assert_eq!(strip_trailing_comment("%% full comment"), None);
        assert_eq!(strip_trailing_comment("    %% indented comment"), None);
        assert_eq!(strip_trailing_comment("%%{init: {\"theme\":\"dark\"} }%%"), None);
        assert_eq!(strip_trailing_comment("A --> B"), None);
    }

    #[test]
    fn double_paren_without_specials_is_safe() {
        assert_eq!(quote_double_paren_label("  root((Garment Factory))"), None);
        assert_eq!(quote_paren_label("  root((Garment Factory))"), None);
    }

    #[test]
    fn double_paren_with_comma_is_quoted() {
        assert_eq!(
            quote_double_paren_label("root((Garment, Factory))").as_deref(),
            Some(r#"root(("Garment, Factory"))"#)
        );
    }

    #[test]
    fn double_paren_with_nested_parens_is_quoted() {
        assert_eq!(
            quote_double_paren_label("  hub((Plant (North)))").as_deref(),
            Some(r#"  hub(("Plant (North)"))"#)
        );
    }

    #[test]
    fn single_paren_pass_skips_double_shell() {
        assert_eq!(quote_paren_label("root((Garment, Factory))"), None);
    }

    #[test]
    fn single_paren_with_nested_parens_is_quoted() {
        assert_eq!(
            quote_paren_label("    Process(Garment Production (Cutting,Sewing))").as_deref(),
            Some(r#"    Process("Garment Production (Cutting,Sewing)")"#)
        );
    }

    #[test]
    fn single_paren_plain_text_untouched() {
        assert_eq!(quote_paren_label("    Process(Garment Production)"), None);
        assert_eq!(quote_paren_label(r#"    Process("Cutting (Sewing)")"#), None);
    }

    #[test]
    fn bracket_label_with_parens_is_quoted() {
        assert_eq!(
            quote_bracket_label("    A[Material to Production (Barcode Scan)]    ").as_deref(),
            Some(r#"    A["Material to Production (Barcode Scan)"]    "#)
        );
    }

    #[test]
    fn every_bracket_label_on_a_line_is_quoted() {
        assert_eq!(
            quote_bracket_label("A[Cut (CNC)] --> B[Sew (Line 2)]").as_deref(),
            Some(r#"A["Cut (CNC)"] --> B["Sew (Line 2)"]"#)
        );
    }

    #[test]
    fn adjacent_bracket_labels_without_spaces() {
        assert_eq!(
            quote_bracket_label("A[Step(1)]-->B[Step(2)]").as_deref(),
            Some(r#"A["Step(1)"]-->B["Step(2)"]"#)
        );
    }

    #[test]
    fn subroutine_shell_keeps_inner_bracket() {
        assert_eq!(
            quote_bracket_label("  C[[Sub (x)]]").as_deref(),
            Some(r#"  C[["Sub (x)"]]"#)
        );
    }

    #[test]
    fn quoted_or_plain_brackets_untouched() {
        assert_eq!(quote_bracket_label(r#"A["Already (quoted)"]"#), None);
        assert_eq!(quote_bracket_label("A[Plain label] --> B[Other]"), None);
    }

    #[test]
    fn mindmap_scenario() {
        let result = repair(&source(
            "mindmap\n  root((Garment Factory))\n    Process(Garment Production (Cutting,Sewing))",
        ));
        assert!(result.changed);
        assert_eq!(result.after.lines[1], "  root((Garment Factory))");
        assert_eq!(
            result.after.lines[2],
            r#"    Process("Garment Production (Cutting,Sewing)")"#
        );
        assert_eq!(
            result.fixes,
            vec![AppliedFix {
                line_number: 3,
                pass: RepairPass::QuoteParenLabel
            }]
        );
    }

    #[test]
    fn mindmap_double_paren_precedence() {
        assert_eq!(
            repaired_line("mindmap\n  root((Garment, Factory))", 1),
            r#"  root(("Garment, Factory"))"#
        );
        assert_eq!(
            repaired_line("mindmap\n  root((Garment Factory))", 1),
            "  root((Garment Factory))"
        );
    }

    #[test]
    fn flowchart_scenario() {
        assert_eq!(
            repaired_line("flowchart TD\nA[Material to Production (Barcode Scan)]", 1),
            r#"A["Material to Production (Barcode Scan)"]"#
        );
    }

    #[test]
    fn family_gating() {
        // Bracket quoting is a flowchart rule; mindmap paren quoting is not.
        let seq = "sequenceDiagram\n  A[x (y)]\n  B(x, y)";
        assert!(!repair(&source(seq)).changed);
        let flow = "flowchart LR\n  B(x, y)";
        assert!(!repair(&source(flow)).changed);
    }

    #[test]
    fn comment_stripping_runs_for_every_family() {
        let text = "sequenceDiagram\n    participant Odoo\n    deactivate Odoo %% Deactivating Odoo\n%% full comment";
        let result = repair(&source(text));
        assert_eq!(result.after.lines[2], "    deactivate Odoo");
        assert_eq!(result.after.lines[3], "%% full comment");
    }

    #[test]
    fn comment_stripped_before_quoting() {
        assert_eq!(
            repaired_line("mindmap\n  Ops(Cut, Sew) %% main line", 1),
            r#"  Ops("Cut, Sew")"#
        );
    }

    #[test]
    fn line_count_preserved() {
        let text = "mindmap\n\n  root((A, B))\n  %% note\n  C(d (e)) %% x\n";
        let src = source(text);
        let result = repair(&src);
        assert_eq!(result.after.len(), src.len());
        assert_eq!(result.before, src);
    }

    #[test]
    fn repair_reaches_fixed_point() {
        let inputs = [
            "mindmap\n  root((Garment, Factory))\n    Process(Garment Production (Cutting,Sewing))\n    Q(a, b) %% c",
            "flowchart TD\n  A[Cut (CNC)] --> B[Sew (Line 2)] %% flow\n  C[[Sub (x)]]",
            "flowchart TD\n  A[Step(1)]-->B[Step(2)]-->C[Step(3)]",
            "sequenceDiagram\n  deactivate Odoo %% done\n  %% only comment",
            "erDiagram\n  Item {\n    string type %% RawMaterial, FBB,\n  }",
            "",
        ];
        for input in inputs {
            let first = repair(&source(input));
            let second = repair(&first.after);
            assert!(!second.changed, "not a fixed point: {input:?}");
            assert!(second.fixes.is_empty());
        }
    }

    #[test]
    fn unchanged_source_reports_no_change() {
        let result = repair(&source("graph TD\n  A --> B"));
        assert!(!result.changed);
        assert_eq!(result.before, result.after);
    }

    #[test]
    fn pass_order_per_family() {
        let mindmap: Vec<_> = passes_for(FamilyHint::Mindmap).collect();
        assert_eq!(
            mindmap,
            vec![
                RepairPass::StripTrailingComment,
                RepairPass::QuoteDoubleParenLabel,
                RepairPass::QuoteParenLabel,
            ]
        );
        let unknown: Vec<_> = passes_for(FamilyHint::Unknown).collect();
        assert_eq!(unknown, vec![RepairPass::StripTrailingComment]);
    }
}
