//! Agent settings, sourced from the environment.

/// Credentials and filesystem roots the agent needs before any batch
/// starts. Missing credentials terminate the hosting process with a
/// non-zero exit; they are never defaulted.
#[derive(Debug, Clone, clap::Args)]
pub struct Settings {
    /// ERP scripting username.
    #[arg(long, env = "ERP_USERNAME", hide_env_values = true, default_value = "")]
    pub erp_username: String,

    /// ERP scripting password.
    #[arg(long, env = "ERP_PASSWORD", hide_env_values = true, default_value = "")]
    pub erp_password: String,

    /// Base directory working files are resolved against (the mounted
    /// network drive).
    #[arg(long, env = "ERP_NETWORK_ROOT", default_value = ".")]
    pub network_root: String,
}

impl Settings {
    /// All configuration problems at once, so operators fix them in one
    /// pass rather than one failed start at a time.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.erp_username.is_empty() {
            errors.push("ERP_USERNAME is not set in the environment".to_string());
        }
        if self.erp_password.is_empty() {
            errors.push("ERP_PASSWORD is not set in the environment".to_string());
        }
        errors
    }
}
