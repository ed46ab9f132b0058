//! Markdown rendering for operator-facing output.

use pcal_core::models::Narrative;

/// Evidence ids printed before the remainder is summarized.
const EVIDENCE_DISPLAY: usize = 10;

pub fn render_markdown(narrative: &Narrative) -> String {
    let mut out = format!("# {}\n\n{}\n", narrative.headline, narrative.summary);

    if !narrative.root_causes.is_empty() {
        out.push_str("\n## Root causes\n");
        for cause in &narrative.root_causes {
            out.push_str(&format!("- {}\n", cause));
        }
    }

    if !narrative.recommendations.is_empty() {
        out.push_str("\n## Recommendations\n");
        for (i, rec) in narrative.recommendations.iter().enumerate() {
            out.push_str(&format!("{}. {}\n", i + 1, rec));
        }
    }

    if !narrative.evidence_decision_ids.is_empty() {
        out.push_str(&format!(
            "\n## Evidence ({} decisions)\n",
            narrative.evidence_decision_ids.len()
        ));
        for id in narrative.evidence_decision_ids.iter().take(EVIDENCE_DISPLAY) {
            out.push_str(&format!("- `{}`\n", id));
        }
        if narrative.evidence_decision_ids.len() > EVIDENCE_DISPLAY {
            out.push_str(&format!(
                "... and {} more\n",
                narrative.evidence_decision_ids.len() - EVIDENCE_DISPLAY
            ));
        }
    }

    out.push_str(&format!(
        "\n_{} generated at {}_\n",
        narrative.query,
        narrative.generated_at.to_rfc3339()
    ));
    out
}
