//! Human-readable model names for transcript headers.

use duet_llm::Provider;

/// Short display name for a model id.
///
/// Anthropic ids carry the model family as the first purely alphabetic
/// segment after the vendor prefix (`claude-3-7-sonnet-20250219` is
/// "Sonnet"). Other ids are split on dashes and title-cased
/// (`o3-mini` is "O3 Mini").
pub fn display_name(provider: Provider, model: &str) -> String {
    match provider {
        Provider::Anthropic => model
            .split('-')
            .skip(1)
            .find(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_alphabetic()))
            .map(capitalize)
            .unwrap_or_else(|| model.to_string()),
        Provider::OpenAi => model
            .split('-')
            .filter(|part| !part.is_empty())
            .map(capitalize)
            .collect::<Vec<_>>()
            .join(" "),
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anthropic_family_names() {
        assert_eq!(display_name(Provider::Anthropic, "claude-3-7-sonnet-20250219"), "Sonnet");
        assert_eq!(display_name(Provider::Anthropic, "claude-sonnet-4-20250514"), "Sonnet");
        assert_eq!(display_name(Provider::Anthropic, "claude-3-5-haiku-latest"), "Haiku");
    }

    #[test]
    fn anthropic_falls_back_to_model_id() {
        assert_eq!(display_name(Provider::Anthropic, "claude"), "claude");
        assert_eq!(display_name(Provider::Anthropic, "custom-1-2"), "custom-1-2");
    }

    #[test]
    fn openai_names_are_title_cased() {
        assert_eq!(display_name(Provider::OpenAi, "o3-mini"), "O3 Mini");
        assert_eq!(display_name(Provider::OpenAi, "gpt-4o"), "Gpt 4o");
        assert_eq!(display_name(Provider::OpenAi, "o1"), "O1");
    }
}
