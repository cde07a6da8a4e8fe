use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// What the transformation stage does when the overlay asset is absent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatermarkPolicy {
    /// Fail the job; unprotected proofs are never published.
    #[default]
    Strict,
    /// Publish a plain re-encode and log a warning.
    FallbackPlain,
}

impl FromStr for WatermarkPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "strict" => Ok(WatermarkPolicy::Strict),
            "fallback_plain" | "fallback" => Ok(WatermarkPolicy::FallbackPlain),
            _ => Err(anyhow::anyhow!("Invalid watermark policy: {}", s)),
        }
    }
}

impl Display for WatermarkPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            WatermarkPolicy::Strict => write!(f, "strict"),
            WatermarkPolicy::FallbackPlain => write!(f, "fallback_plain"),
        }
    }
}
