use std::fmt;

use paxhook::HookError;

/// User-facing CLI failure; the message is printed as-is
#[derive(Debug)]
pub struct CliError(pub String);

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for CliError {}

impl From<String> for CliError {
    fn from(s: String) -> Self {
        CliError(s)
    }
}

impl From<HookError> for CliError {
    fn from(e: HookError) -> Self {
        match &e {
            HookError::MissingCredential(provider) => CliError(format!(
                "{e}. Set one with: paxhook-cli settings set {provider}.api_key <KEY>"
            )),
            HookError::Settings(_) => CliError(format!(
                "{e}. Run `paxhook-cli settings show --all` to list valid keys"
            )),
            _ => CliError(e.to_string()),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError(format!("JSON error: {e}"))
    }
}

pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;
    use paxhook::providers::ProviderId;

    #[test]
    fn test_missing_credential_hint() {
        let err = CliError::from(HookError::MissingCredential(ProviderId::Groq));
        assert!(err.0.contains("settings set groq.api_key"));
    }

    #[test]
    fn test_settings_error_hint() {
        let err = CliError::from(HookError::Settings("unknown setting 'colour'".into()));
        assert!(err.0.starts_with("Settings error: unknown setting 'colour'"));
        assert!(err.0.contains("settings show --all"));
    }
}
