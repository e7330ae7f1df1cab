use crate::DiagramSource;

const FENCE: &str = "```";
const TAGGED_FENCE: &str = "```mermaid";

/// Pull the diagram source out of a model response.
///
/// A ```` ```mermaid ```` fenced block wins when one is present and closed;
/// only its interior is kept. Otherwise every fence token is dropped and the
/// remaining text is used as-is.
pub fn extract(raw: &str) -> DiagramSource {
    if let Some(block) = fenced_block(raw) {
        return DiagramSource::new(trim_blank_lines(block));
    }

    let stripped = raw.replace(TAGGED_FENCE, "").replace(FENCE, "");
    DiagramSource::from_text(stripped.trim())
}

/// Interior of the first closed ```` ```mermaid ```` block, if any.
fn fenced_block(raw: &str) -> Option<&str> {
    let mut from = 0;
    while let Some(offset) = raw[from..].find(TAGGED_FENCE) {
        let after_tag = &raw[from + offset + TAGGED_FENCE.len()..];
        // The tag must be followed by whitespace, not e.g. ```mermaidjs.
        if after_tag.starts_with(char::is_whitespace) {
            let end = after_tag.find(FENCE)?;
            return Some(&after_tag[..end]);
        }
        from += offset + TAGGED_FENCE.len();
    }
    None
}

fn trim_blank_lines(block: &str) -> Vec<String> {
    let lines: Vec<&str> = block.lines().collect();
    let first = lines.iter().position(|l| !l.trim().is_empty());
    let last = lines.iter().rposition(|l| !l.trim().is_empty());
    match (first, last) {
        (Some(first), Some(last)) => lines[first..=last]
            .iter()
            .map(|l| l.trim_end().to_string())
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FamilyHint;

    #[test]
    fn fenced_block_interior_only() {
        let raw = "Here is your diagram:\n\n```mermaid\nmindmap\n  root((Garment Factory))\n    Process(Garment Production (Cutting,Sewing))\n```\n\nLet me know!";
        let src = extract(raw);
        assert_eq!(
            src.lines,
            vec![
                "mindmap",
                "  root((Garment Factory))",
                "    Process(Garment Production (Cutting,Sewing))",
            ]
        );
        assert_eq!(src.family, FamilyHint::Mindmap);
    }

    #[test]
    fn blank_lines_around_block_are_trimmed() {
        let raw = "```mermaid\n\n\ngraph TD\n  A-->B\n\n```";
        assert_eq!(extract(raw).lines, vec!["graph TD", "  A-->B"]);
    }

    #[test]
    fn indentation_of_first_line_is_kept() {
        let raw = "```mermaid\n  graph TD\n    A-->B\n```";
        assert_eq!(extract(raw).lines, vec!["  graph TD", "    A-->B"]);
    }

    #[test]
    fn unfenced_text_is_returned_trimmed() {
        let src = extract("\n  sequenceDiagram\n    A->>B: hi\n");
        assert_eq!(src.lines, vec!["sequenceDiagram", "    A->>B: hi"]);
        assert_eq!(src.family, FamilyHint::Sequence);
    }

    #[test]
    fn unclosed_fence_markers_are_stripped() {
        let src = extract("```mermaid\ngantt\n  title Plan");
        assert_eq!(src.lines, vec!["gantt", "  title Plan"]);
    }

    #[test]
    fn untagged_fence_is_stripped() {
        let src = extract("```\nerDiagram\n  A ||--o{ B : has\n```");
        assert_eq!(src.lines, vec!["erDiagram", "  A ||--o{ B : has"]);
    }

    #[test]
    fn lookalike_tag_is_skipped_for_later_block() {
        let raw = "```mermaidjs\nconsole.log(1)\n```\n\n```mermaid\nflowchart TD\n  A --> B\n```";
        let src = extract(raw);
        assert_eq!(src.lines, vec!["flowchart TD", "  A --> B"]);
        assert_eq!(src.family, FamilyHint::Flowchart);
    }

    #[test]
    fn empty_input_gives_empty_source() {
        assert!(extract("").lines.is_empty());
        assert!(extract("```mermaid\n```").lines.is_empty());
        assert!(extract("   \n ").lines.is_empty());
    }
}
