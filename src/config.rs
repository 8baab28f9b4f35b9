//! Configuration management for the OCR search server

use std::env;
use std::net::IpAddr;
use std::path::PathBuf;

use thiserror::Error;

use crate::ocr::OcrFormat;
use crate::store::UpdateFormat;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {var}: {reason}")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub ocr: OcrConfig,
    pub store: StoreConfig,
    pub iiif: IiifConfig,
    /// Allowed peer addresses; empty allows everyone
    pub ip_whitelist: Vec<IpAddr>,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Externally visible base url, used for annotation list ids
    pub public_url: String,
}

#[derive(Debug, Clone)]
pub struct OcrConfig {
    pub format: OcrFormat,
    pub escape_non_ascii: bool,
    /// Directory holding `<id>.xml` OCR files
    pub xml_dir: PathBuf,
    pub ingest_concurrency: usize,
    pub offset_cache_size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    Solr {
        url: String,
        core: String,
        update_format: UpdateFormat,
    },
    Memory,
}

#[derive(Debug, Clone)]
pub struct IiifConfig {
    /// Manifest urls are `{manifest_base_url}/{id}/manifest`
    pub manifest_base_url: String,
    /// Prefix for annotation `on` targets
    pub canvas_base_url: Option<String>,
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
                public_url: "http://localhost:8000".to_string(),
            },
            ocr: OcrConfig {
                format: OcrFormat::Alto,
                escape_non_ascii: false,
                xml_dir: PathBuf::from("./ocr"),
                ingest_concurrency: default_concurrency(),
                offset_cache_size: 256,
            },
            store: StoreConfig::Solr {
                url: "http://localhost:8983/solr".to_string(),
                core: "ocr".to_string(),
                update_format: UpdateFormat::default(),
            },
            iiif: IiifConfig {
                manifest_base_url: "http://localhost:8000/iiif".to_string(),
                canvas_base_url: None,
            },
            ip_whitelist: Vec::new(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Build from an arbitrary variable source, falling back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let store = match get("STORE_BACKEND").as_deref().map(str::trim) {
            Some("memory") => StoreConfig::Memory,
            Some("solr") | None => StoreConfig::Solr {
                url: get("SOLR_URL").unwrap_or_else(|| "http://localhost:8983/solr".to_string()),
                core: get("SOLR_CORE").unwrap_or_else(|| "ocr".to_string()),
                update_format: parse_var(
                    "SOLR_UPDATE_FORMAT",
                    get("SOLR_UPDATE_FORMAT"),
                    UpdateFormat::default(),
                )?,
            },
            Some(other) => {
                return Err(invalid("STORE_BACKEND", other, "expected solr or memory"));
            }
        };

        Ok(Config {
            server: ServerConfig {
                host: get("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_var("SERVER_PORT", get("SERVER_PORT"), defaults.server.port)?,
                public_url: get("PUBLIC_URL").unwrap_or(defaults.server.public_url),
            },
            ocr: OcrConfig {
                format: match get("OCR_FILE_FORMAT") {
                    Some(value) => value
                        .parse()
                        .map_err(|e: crate::ocr::OcrError| invalid("OCR_FILE_FORMAT", &value, &e.to_string()))?,
                    None => defaults.ocr.format,
                },
                escape_non_ascii: match get("OCR_ESCAPE_UTF8") {
                    Some(value) => parse_bool("OCR_ESCAPE_UTF8", &value)?,
                    None => defaults.ocr.escape_non_ascii,
                },
                xml_dir: get("OCR_XML_DIR").map(PathBuf::from).unwrap_or(defaults.ocr.xml_dir),
                ingest_concurrency: parse_var(
                    "INGEST_CONCURRENCY",
                    get("INGEST_CONCURRENCY"),
                    defaults.ocr.ingest_concurrency,
                )?,
                offset_cache_size: parse_var(
                    "OFFSET_CACHE_SIZE",
                    get("OFFSET_CACHE_SIZE"),
                    defaults.ocr.offset_cache_size,
                )?,
            },
            store,
            iiif: IiifConfig {
                manifest_base_url: get("MANIFEST_BASE_URL").unwrap_or(defaults.iiif.manifest_base_url),
                canvas_base_url: get("CANVAS_BASE_URL"),
            },
            ip_whitelist: match get("IP_WHITELIST") {
                Some(list) => parse_ip_list(&list)?,
                None => Vec::new(),
            },
        })
    }
}

fn invalid(var: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        var,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_var<T>(var: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e: T::Err| invalid(var, &value, &e.to_string())),
        None => Ok(default),
    }
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(var, value, "expected a boolean")),
    }
}

fn parse_ip_list(list: &str) -> Result<Vec<IpAddr>, ConfigError> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<IpAddr>()
                .map_err(|e| invalid("IP_WHITELIST", s, &e.to_string()))
        })
        .collect()
}
