use chrono::NaiveDate;
use mermend_core::{DiagramSource, FamilyHint, Finding};

const OUTPUT_RULES: &str = r#"You are a Mermaid diagram code generator with ZERO tolerance for syntax errors.

## CRITICAL RULES - FOLLOW EVERY TIME:

1. **Output Format**
   - Generate ONLY valid Mermaid syntax
   - Wrap code in ```mermaid fences
   - Never add explanations inside the code block

2. **Syntax Strictness**
   - Node IDs: Use alphanumeric only (no spaces). Match case exactly throughout.
   - Style/Class: No spaces after commas: color:#000,stroke:#fff (NOT color: #000, stroke: #fff)
   - Blocks: Always close with 'end' statement
   - Comments: Use `%%` for comments, on their own line. NEVER use `//` or `#`, and never put a comment after a statement."#;

const FLOWCHART_RULES: &str = r#"   - **Flowchart**:
     * Arrows: --> (solid), -.-> (dotted), ==> (thick). Every arrow MUST have a target node.
     * Place every node definition on a NEW LINE.
     * Do NOT put multiple nodes on one line like `A[Label] B[Label]`.
     * Quote labels with special characters: `A["Label (Text)"]`.
     * Close every `subgraph` with `end`."#;

const SEQUENCE_RULES: &str = r#"   - **Sequence**:
     * Arrows: ->> (solid), -->> (dotted), -x (cross).
     * Close every loop/alt/opt/par/rect/critical/break block with `end`.
     * Only `deactivate` a participant that was activated."#;

const ENTITY_RELATION_RULES: &str = r#"   - **ER Diagram**:
     * Attributes are written `type name [PK|FK]`, type first (e.g. `string id PK`).
     * Relationships use cardinality markers: `CUSTOMER ||--o{ ORDER : places`.
     * No comments inside entity blocks."#;

const TIMELINE_RULES: &str = r#"   - **Gantt**:
     * Define `dateFormat YYYY-MM-DD`.
     * DO NOT use the keyword `today` at start of line (e.g. `today 2023-01-01` is INVALID). Remove it.
     * All dates must be absolute YYYY-MM-DD format. No relative dates like "next week".
     * Every task MUST have a start date or happen `after` another task, plus a duration (e.g. 5d)."#;

const MINDMAP_RULES: &str = r#"   - **Mindmap**:
     * Use 2-space indentation strictly.
     * ONE node per line.
     * **ABSOLUTE RULE**: NO text allowed after the closing bracket/quote (`Node("Text") EXTRA` is FORBIDDEN).
     * **SPECIAL CHARACTERS**: If node text contains `(`, `)`, `[`, `]`, or `,`, you **MUST** wrap the text in double quotes.
     * **CORRECT**: `    NodeID("Node Text")`
     * **BAD**: `    NodeID(Node Text) ChildNode` (Child MUST be on next line with deeper indentation)"#;

fn family_rules(family: FamilyHint) -> Vec<&'static str> {
    match family {
        FamilyHint::Flowchart => vec![FLOWCHART_RULES],
        FamilyHint::Sequence => vec![SEQUENCE_RULES],
        FamilyHint::EntityRelation => vec![ENTITY_RELATION_RULES],
        FamilyHint::Timeline => vec![TIMELINE_RULES],
        FamilyHint::Mindmap => vec![MINDMAP_RULES],
        FamilyHint::Unknown => vec![
            FLOWCHART_RULES,
            SEQUENCE_RULES,
            ENTITY_RELATION_RULES,
            TIMELINE_RULES,
            MINDMAP_RULES,
        ],
    }
}

/// System instruction for the first generation call.
pub(crate) fn system_prompt(family: FamilyHint, reference_date: NaiveDate) -> String {
    let mut prompt = String::from(OUTPUT_RULES);

    prompt.push_str("\n\n3. **Diagram-Specific Rules (CRITICAL)**\n");
    prompt.push_str(&family_rules(family).join("\n"));

    if let Some(header) = family.header_keyword() {
        prompt.push_str(&format!(
            "\n\n4. **Header**\n   - The first line of the code MUST be `{header}`."
        ));
    }

    let date = reference_date.format("%Y-%m-%d");
    prompt.push_str(&format!("\n\nCurrent Date Reference: {date}"));
    if matches!(family, FamilyHint::Timeline | FamilyHint::Unknown) {
        prompt.push_str(&format!(
            "\nFor Gantt Charts: Start the project timeline from {date}."
        ));
    }

    prompt.push_str(&format!(
        "\n\nGenerate syntactically perfect Mermaid code for a {family}."
    ));
    prompt
}

pub(crate) fn user_prompt(description: &str) -> String {
    format!("Context/Description:\n{}", description.trim())
}

/// Prompt for the single escalation call: the findings verbatim plus the
/// repaired code.
pub(crate) fn fix_prompt(findings: &[Finding], source: &DiagramSource) -> String {
    let errors = findings
        .iter()
        .map(|f| format!("- {f}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "The following Mermaid code has specific syntax errors. Please FIX them and return ONLY the corrected code in a ```mermaid block.\n\n\
         ERRORS FOUND:\n{errors}\n\n\
         BROKEN CODE:\n{}\n\n\
         CRITICAL: Fix the style definitions (remove spaces after commas) and close all blocks properly.",
        source.text()
    )
}
