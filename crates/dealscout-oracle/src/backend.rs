//! Oracle backend selection.

use std::str::FromStr;

/// Supported oracle providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OracleBackend {
    Gemini,
    OpenAi,
}

impl OracleBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAi => "openai",
        }
    }

    /// Reads `ORACLE_BACKEND`, defaulting to Gemini. Unrecognized values
    /// fall back to the default with a warning.
    pub fn from_env() -> Self {
        match std::env::var("ORACLE_BACKEND") {
            Ok(value) => value.parse().unwrap_or_else(|_| {
                tracing::warn!(backend = %value, "unknown ORACLE_BACKEND, defaulting to gemini");
                Self::Gemini
            }),
            Err(_) => Self::Gemini,
        }
    }
}

impl FromStr for OracleBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAi),
            other => Err(format!("unknown oracle backend: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_backends() {
        assert_eq!("gemini".parse::<OracleBackend>(), Ok(OracleBackend::Gemini));
        assert_eq!("OpenAI".parse::<OracleBackend>(), Ok(OracleBackend::OpenAi));
        assert!("cohere".parse::<OracleBackend>().is_err());
    }
}
