/// Whether a Claude-shaped inbound request must be converted to `OpenAI`
/// before forwarding: true iff the target model name does not mention
/// "claude" and the upstream base URL does not mention "anthropic".
#[must_use]
pub fn should_translate(target_model: &str, base_url: &str) -> bool {
    !target_model.to_lowercase().contains("claude") && !base_url.to_lowercase().contains("anthropic")
}

#[cfg(test)]
mod tests {
    use super::should_translate;

    #[test]
    fn claude_model_name_passes_through() {
        assert!(!should_translate("claude-3-5-sonnet", "https://api.example.com"));
    }

    #[test]
    fn anthropic_base_url_passes_through() {
        assert!(!should_translate("some-model", "https://api.anthropic.com"));
    }

    #[test]
    fn neither_signal_triggers_translation() {
        assert!(should_translate("gpt-4o", "https://api.openai.com"));
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert!(!should_translate("Claude-Instant", "https://api.example.com"));
    }
}
