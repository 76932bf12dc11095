use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use valuation_core::Weights;
use valuation_models::DcfParams;
use valuation_orchestrator::{PipelineConfig, DEFAULT_CACHE_TTL_SECS};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub snapshot_path: String,
    /// Unset means hybrid analysis runs without adjustments
    pub adjustment_service_url: Option<String>,
    pub adjustment_timeout_secs: u64,
    pub weights: Weights,
    pub dcf: DcfParams,
    pub valuation_batch_max: usize,
    pub hybrid_batch_max: usize,
    pub batch_concurrency: usize,
    pub snapshot_cache_ttl_secs: i64,
}

fn parsed<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value '{}'", key, raw)),
        _ => Ok(default),
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Weights::default();
        let weights = Weights {
            dcf: parsed("WEIGHT_DCF", defaults.dcf)?,
            relative: parsed("WEIGHT_RELATIVE", defaults.relative)?,
            graham: parsed("WEIGHT_GRAHAM", defaults.graham)?,
            magic: parsed("WEIGHT_MAGIC", defaults.magic)?,
        };
        weights.validate().context("Invalid model weights")?;

        let dcf_defaults = DcfParams::default();
        let dcf = DcfParams {
            wacc: parsed("DCF_WACC", dcf_defaults.wacc)?,
            terminal_growth: parsed("DCF_TERMINAL_GROWTH", dcf_defaults.terminal_growth)?,
            tax_rate: parsed("DCF_TAX_RATE", dcf_defaults.tax_rate)?,
        };
        dcf.validate().context("Invalid DCF parameters")?;

        let config = Self {
            host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parsed("API_PORT", 3000)?,
            snapshot_path: env::var("SNAPSHOT_PATH").unwrap_or_else(|_| "data/snapshots.json".to_string()),
            adjustment_service_url: env::var("ADJUSTMENT_SERVICE_URL")
                .ok()
                .map(|u| u.trim().to_string())
                .filter(|u| !u.is_empty()),
            adjustment_timeout_secs: parsed("ADJUSTMENT_TIMEOUT_SECS", 10)?,
            weights,
            dcf,
            valuation_batch_max: parsed("VALUATION_BATCH_MAX", 20)?,
            hybrid_batch_max: parsed("HYBRID_BATCH_MAX", 10)?,
            batch_concurrency: parsed("BATCH_CONCURRENCY", 4)?,
            snapshot_cache_ttl_secs: parsed("SNAPSHOT_CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS)?,
        };

        if config.valuation_batch_max == 0 || config.hybrid_batch_max == 0 {
            anyhow::bail!("Batch limits must be at least 1");
        }

        Ok(config)
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            adjustment_timeout: Duration::from_secs(self.adjustment_timeout_secs),
            batch_concurrency: self.batch_concurrency.max(1),
            valuation_batch_max: self.valuation_batch_max,
            hybrid_batch_max: self.hybrid_batch_max,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_config_keeps_limits() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            snapshot_path: "snapshots.json".to_string(),
            adjustment_service_url: None,
            adjustment_timeout_secs: 3,
            weights: Weights::default(),
            dcf: DcfParams::default(),
            valuation_batch_max: 20,
            hybrid_batch_max: 10,
            batch_concurrency: 0,
            snapshot_cache_ttl_secs: 300,
        };

        let pipeline = config.pipeline_config();
        assert_eq!(pipeline.adjustment_timeout, Duration::from_secs(3));
        assert_eq!(pipeline.batch_concurrency, 1);
        assert_eq!(pipeline.hybrid_batch_max, 10);
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_parsed_falls_back_on_missing_key() {
        let value: u16 = parsed("VALUATION_TEST_KEY_THAT_IS_NEVER_SET", 42).unwrap();
        assert_eq!(value, 42);
    }
}
