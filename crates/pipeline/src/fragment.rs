//! Incremental output of a collaboration run.

use duet_llm::StageResult;
use duet_memory::Speaker;
use futures_util::stream::BoxStream;
use serde::Serialize;

/// Lazily produced fragments of one run. Finite and not restartable.
pub type FragmentStream = BoxStream<'static, Fragment>;

/// One stage's contribution to the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub speaker: Speaker,
    /// Header shown above the text, e.g. "Claude (Sonnet)".
    pub label: String,
    pub text: String,
    pub degraded: bool,
}

impl Section {
    pub fn from_result(speaker: Speaker, label: impl Into<String>, result: &StageResult) -> Self {
        Self {
            speaker,
            label: label.into(),
            text: result.text().to_string(),
            degraded: result.is_degraded(),
        }
    }

    /// Markdown for this section. Degraded output is shown bare, without the
    /// stage header.
    pub fn render(&self) -> String {
        if self.degraded {
            self.text.clone()
        } else {
            format!("### {}\n\n{}", self.label, self.text)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Fragment {
    /// Status notice shown before any model output.
    Progress { message: String },
    /// The draft, available before the review finishes.
    Partial { sections: Vec<Section> },
    /// The complete transcript. Always the last fragment of a run.
    Final { sections: Vec<Section> },
    /// Input was refused before any model was called.
    Rejected { message: String },
}

impl Fragment {
    /// Whether no further fragments follow this one.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Final { .. } | Self::Rejected { .. })
    }

    pub fn sections(&self) -> &[Section] {
        match self {
            Self::Partial { sections } | Self::Final { sections } => sections,
            Self::Progress { .. } | Self::Rejected { .. } => &[],
        }
    }

    /// Markdown for the whole fragment.
    pub fn render(&self) -> String {
        match self {
            Self::Progress { message } | Self::Rejected { message } => message.clone(),
            Self::Partial { sections } | Self::Final { sections } => sections
                .iter()
                .map(Section::render)
                .collect::<Vec<_>>()
                .join("\n\n"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(speaker: Speaker, label: &str, text: &str) -> Section {
        Section::from_result(speaker, label, &StageResult::Success(text.to_string()))
    }

    #[test]
    fn final_render_labels_each_stage() {
        let fragment = Fragment::Final {
            sections: vec![
                ok(Speaker::StageA, "Claude (Sonnet)", "draft"),
                ok(Speaker::StageB, "ChatGPT (O3 Mini)", "better draft"),
            ],
        };
        assert_eq!(
            fragment.render(),
            "### Claude (Sonnet)\n\ndraft\n\n### ChatGPT (O3 Mini)\n\nbetter draft"
        );
        assert!(fragment.is_terminal());
    }

    #[test]
    fn degraded_section_renders_bare_message() {
        let section = Section::from_result(
            Speaker::StageB,
            "ChatGPT (O3 Mini)",
            &StageResult::Degraded("⚠️ Error with ChatGPT API: down".into()),
        );
        assert!(section.degraded);
        assert_eq!(section.render(), "⚠️ Error with ChatGPT API: down");
    }

    #[test]
    fn only_final_and_rejected_are_terminal() {
        assert!(!Fragment::Progress { message: "…".into() }.is_terminal());
        assert!(!Fragment::Partial { sections: vec![] }.is_terminal());
        assert!(Fragment::Rejected { message: "too big".into() }.is_terminal());
    }

    #[test]
    fn serializes_with_type_tag() {
        let json = serde_json::to_value(Fragment::Partial {
            sections: vec![ok(Speaker::StageA, "Claude (Sonnet)", "draft")],
        })
        .unwrap();
        assert_eq!(json["type"], "partial");
        assert_eq!(json["sections"][0]["speaker"], "stage_a");
        assert_eq!(json["sections"][0]["degraded"], false);
    }
}
