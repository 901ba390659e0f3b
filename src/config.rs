use std::env;
use std::path::PathBuf;

use log::{info, warn};

use crate::bluetooth::advertisement::{MINEW_COMPANY_ID, PDU_HEADER_LEN};
use crate::bluetooth::decryptor::KeyMaterial;
use crate::error::ConfigError;

/// How decoded readings are written out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// One JSON object per line on stdout
    Json,
    /// Downstream ingestion shape (`type`, `mac`, `temperature`, `humidity`, `rssi`)
    Ingest,
    /// Human-readable log lines
    Log,
}

#[derive(Debug, Clone)]
pub struct DecoderConfig {
    pub vendor_id: u16,
    pub header_len: usize,
    pub aes_key: Option<KeyMaterial>,
    /// Batch source; stdin when unset
    pub input: Option<PathBuf>,
    pub only_changes: bool,
    pub output: OutputFormat,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        DecoderConfig {
            vendor_id: MINEW_COMPANY_ID,
            header_len: PDU_HEADER_LEN,
            aes_key: None,
            input: None,
            only_changes: false,
            output: OutputFormat::Json,
        }
    }
}

impl DecoderConfig {
    /// Load configuration from the environment (and `.env` if present)
    pub fn new() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = DecoderConfig::default();

        if let Some(value) = lookup("MINEW_VENDOR_ID") {
            config.vendor_id = parse_vendor_id(&value)?;
        }

        if let Some(value) = lookup("MINEW_HEADER_LEN") {
            config.header_len = value.trim().parse().map_err(|e| ConfigError::Invalid {
                var: "MINEW_HEADER_LEN",
                reason: format!("{}", e),
            })?;
        }

        if let Some(value) = lookup("MINEW_AES_KEY") {
            let key = KeyMaterial::from_hex(&value)?;
            if !key.is_valid_length() {
                warn!(
                    "MINEW_AES_KEY has {} bytes, AES-128 needs 16; encrypted-capable frames will fail until it is corrected",
                    key.len()
                );
            }
            config.aes_key = Some(key);
        } else {
            info!("MINEW_AES_KEY not set, encrypted frames will be decoded as plain text");
        }

        if let Some(value) = lookup("MINEW_INPUT") {
            let value = value.trim();
            if !value.is_empty() && value != "-" {
                config.input = Some(PathBuf::from(value));
            }
        }

        if let Some(value) = lookup("MINEW_ONLY_CHANGES") {
            config.only_changes = parse_bool("MINEW_ONLY_CHANGES", &value)?;
        }

        if let Some(value) = lookup("MINEW_OUTPUT") {
            config.output = match value.trim().to_ascii_lowercase().as_str() {
                "json" => OutputFormat::Json,
                "ingest" => OutputFormat::Ingest,
                "log" => OutputFormat::Log,
                other => {
                    return Err(ConfigError::Invalid {
                        var: "MINEW_OUTPUT",
                        reason: format!("expected 'json', 'ingest' or 'log', got '{}'", other),
                    })
                }
            };
        }

        Ok(config)
    }
}

/// Accepts `0x`-prefixed hex or plain decimal
fn parse_vendor_id(value: &str) -> Result<u16, ConfigError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ConfigError::Missing("MINEW_VENDOR_ID"));
    }

    let parsed = match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex_digits) => u16::from_str_radix(hex_digits, 16),
        None => value.parse::<u16>(),
    };

    parsed.map_err(|e| ConfigError::Invalid {
        var: "MINEW_VENDOR_ID",
        reason: format!("'{}': {}", value, e),
    })
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::Invalid {
            var,
            reason: format!("expected a boolean, got '{}'", other),
        }),
    }
}
