use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FailoverConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for FailoverConfig {
    fn default() -> Self {
        Self { max_retries: default_max_retries(), enabled: default_true() }
    }
}

fn default_max_retries() -> usize {
    3
}

fn default_true() -> bool {
    true
}
