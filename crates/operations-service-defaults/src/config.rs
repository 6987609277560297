//! Host configuration read from environment variables.

use std::net::SocketAddr;
use std::num::NonZeroU32;

use operations_messaging::{DEFAULT_PARTITION_COUNT, DEFAULT_TOPIC_DELIMITER};

use crate::error::AppError;

/// Delimiters a deployment may choose between topic segments.
pub const ALLOWED_TOPIC_DELIMITERS: [char; 3] = ['.', '-', '_'];

const DEFAULT_SERVICE_NAME: &str = "operations-host";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;

/// Settings shared by every service the host runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Service identity used in logs and as the default source.
    pub service_name: String,
    /// Prefix of the envelope `source` attribute; each service appends
    /// `/<domain>`.
    pub messaging_source: String,
    /// Delimiter between topic segments.
    pub topic_delimiter: char,
    /// Partitions per topic on the in-memory broker.
    pub partitions: NonZeroU32,
    /// Reject registries in which two entities map to one topic.
    pub enforce_unique_topics: bool,
    /// Interface the HTTP server binds to.
    pub host: String,
    /// Port the HTTP server listens on.
    pub port: u16,
}

impl ServiceConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, which returns the value
    /// of a variable or `None` when it is unset.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable is set to an invalid value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let service_name = lookup("SERVICE_NAME")
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string());
        let messaging_source = lookup("MESSAGING_SOURCE")
            .filter(|source| !source.trim().is_empty())
            .unwrap_or_else(|| format!("urn:operations:{service_name}"));

        let topic_delimiter = match lookup("MESSAGING_TOPIC_DELIMITER") {
            None => DEFAULT_TOPIC_DELIMITER,
            Some(raw) => parse_delimiter(&raw)?,
        };

        let partitions = match lookup("MESSAGING_PARTITIONS") {
            None => DEFAULT_PARTITION_COUNT,
            Some(raw) => raw.trim().parse::<NonZeroU32>().map_err(|e| {
                AppError::Config(format!("MESSAGING_PARTITIONS must be a positive integer: {e}"))
            })?,
        };

        let enforce_unique_topics = match lookup("MESSAGING_ENFORCE_UNIQUE_TOPICS") {
            None => false,
            Some(raw) => parse_flag("MESSAGING_ENFORCE_UNIQUE_TOPICS", &raw)?,
        };

        let host = lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match lookup("PORT") {
            None => DEFAULT_PORT,
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e| AppError::Config(format!("PORT must be a valid u16: {e}")))?,
        };

        Ok(Self {
            service_name,
            messaging_source,
            topic_delimiter,
            partitions,
            enforce_unique_topics,
            host,
            port,
        })
    }

    /// The address the HTTP server binds to.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `HOST:PORT` is not a socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))
    }
}

fn parse_delimiter(raw: &str) -> Result<char, AppError> {
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if ALLOWED_TOPIC_DELIMITERS.contains(&c) => Ok(c),
        _ => Err(AppError::Config(format!(
            "MESSAGING_TOPIC_DELIMITER must be one of '.', '-' or '_', got '{raw}'"
        ))),
    }
}

fn parse_flag(name: &str, raw: &str) -> Result<bool, AppError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AppError::Config(format!("{name} must be a boolean, got '{raw}'"))),
    }
}
