use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouterConfig {
    #[serde(default = "default_true")]
    pub health_check_enabled: bool,
    #[serde(default = "default_true")]
    pub weight_enabled: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self { health_check_enabled: default_true(), weight_enabled: default_true() }
    }
}

fn default_true() -> bool {
    true
}
