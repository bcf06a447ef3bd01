//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{num::NonZeroUsize, path::PathBuf, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

mod cli;

pub use cli::{CliArgs, Command, DecodeArgs, ServeArgs, ServeOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "kurohelper";
const ENV_PREFIX: &str = "KUROHELPER";
const DEFAULT_CACHE_TTL_SECS: u64 = 30 * 60;
const DEFAULT_CACHE_RESULT_CAPACITY: u64 = 500;
const DEFAULT_CACHE_SESSION_CAPACITY: u64 = 10_000;
const DEFAULT_CACHE_SWEEP_INTERVAL_SECS: u64 = 60;
const DEFAULT_PAGE_SIZE: u64 = 10;
const MAX_PAGE_SIZE: u64 = 25;
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 15 * 60;
const DEFAULT_CATALOG_SOURCES: [&str; 2] = ["1", "2"];
pub(crate) const DEFAULT_PLACEHOLDER_IMAGE_URL: &str =
    "https://image.kurohelper.com/docs/neneGIF.gif";

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub cache: CacheSettings,
    pub navigator: NavigatorSettings,
    pub catalog: CatalogSettings,
    pub images: ImageSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub ttl: Duration,
    pub result_capacity: NonZeroUsize,
    pub session_capacity: NonZeroUsize,
    pub sweep_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct NavigatorSettings {
    pub page_size: usize,
    pub fetch_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct CatalogSettings {
    pub path: Option<PathBuf>,
    /// Source characters every search feature is registered for; the first
    /// is the default.
    pub sources: Vec<char>,
}

#[derive(Debug, Clone)]
pub struct ImageSettings {
    pub allow_list: Vec<String>,
    pub placeholder_url: String,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("images.allow_list"),
    );

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Decode(_)) => {}
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    cache: RawCacheSettings,
    navigator: RawNavigatorSettings,
    catalog: RawCatalogSettings,
    images: RawImageSettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    ttl_seconds: Option<u64>,
    result_capacity: Option<u64>,
    session_capacity: Option<u64>,
    sweep_interval_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawNavigatorSettings {
    page_size: Option<u64>,
    fetch_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCatalogSettings {
    path: Option<PathBuf>,
    sources: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawImageSettings {
    allow_list: Vec<String>,
    placeholder_url: Option<String>,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(seconds) = overrides.cache_ttl_seconds {
            self.cache.ttl_seconds = Some(seconds);
        }
        if let Some(capacity) = overrides.cache_result_capacity {
            self.cache.result_capacity = Some(capacity);
        }
        if let Some(capacity) = overrides.cache_session_capacity {
            self.cache.session_capacity = Some(capacity);
        }
        if let Some(seconds) = overrides.cache_sweep_interval_seconds {
            self.cache.sweep_interval_seconds = Some(seconds);
        }
        if let Some(size) = overrides.navigator_page_size {
            self.navigator.page_size = Some(size);
        }
        if let Some(seconds) = overrides.navigator_fetch_timeout_seconds {
            self.navigator.fetch_timeout_seconds = Some(seconds);
        }
        if let Some(path) = overrides.catalog_path.as_ref() {
            self.catalog.path = Some(path.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            cache,
            navigator,
            catalog,
            images,
        } = raw;

        Ok(Self {
            logging: build_logging_settings(logging)?,
            cache: build_cache_settings(cache)?,
            navigator: build_navigator_settings(navigator)?,
            catalog: build_catalog_settings(catalog)?,
            images: build_image_settings(images),
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let ttl = positive_seconds(
        cache.ttl_seconds.unwrap_or(DEFAULT_CACHE_TTL_SECS),
        "cache.ttl_seconds",
    )?;
    let result_capacity = non_zero_usize(
        cache
            .result_capacity
            .unwrap_or(DEFAULT_CACHE_RESULT_CAPACITY),
        "cache.result_capacity",
    )?;
    let session_capacity = non_zero_usize(
        cache
            .session_capacity
            .unwrap_or(DEFAULT_CACHE_SESSION_CAPACITY),
        "cache.session_capacity",
    )?;
    let sweep_interval = positive_seconds(
        cache
            .sweep_interval_seconds
            .unwrap_or(DEFAULT_CACHE_SWEEP_INTERVAL_SECS),
        "cache.sweep_interval_seconds",
    )?;

    Ok(CacheSettings {
        ttl,
        result_capacity,
        session_capacity,
        sweep_interval,
    })
}

fn build_navigator_settings(
    navigator: RawNavigatorSettings,
) -> Result<NavigatorSettings, LoadError> {
    let page_size = navigator.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
    if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
        return Err(LoadError::invalid(
            "navigator.page_size",
            format!("must be between 1 and {MAX_PAGE_SIZE}"),
        ));
    }
    let fetch_timeout = positive_seconds(
        navigator
            .fetch_timeout_seconds
            .unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS),
        "navigator.fetch_timeout_seconds",
    )?;

    Ok(NavigatorSettings {
        // Bounded by MAX_PAGE_SIZE above.
        page_size: page_size as usize,
        fetch_timeout,
    })
}

fn build_catalog_settings(catalog: RawCatalogSettings) -> Result<CatalogSettings, LoadError> {
    let path = catalog
        .path
        .filter(|path| !path.as_os_str().is_empty());

    let raw_sources = catalog.sources.unwrap_or_else(|| {
        DEFAULT_CATALOG_SOURCES
            .iter()
            .map(|source| source.to_string())
            .collect()
    });
    if raw_sources.is_empty() {
        return Err(LoadError::invalid(
            "catalog.sources",
            "at least one source is required",
        ));
    }

    let mut sources = Vec::with_capacity(raw_sources.len());
    for raw in raw_sources {
        let mut chars = raw.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(source), None) if source.is_ascii_alphanumeric() => {
                if sources.contains(&source) {
                    return Err(LoadError::invalid(
                        "catalog.sources",
                        format!("source `{source}` is listed twice"),
                    ));
                }
                sources.push(source);
            }
            _ => {
                return Err(LoadError::invalid(
                    "catalog.sources",
                    format!("`{raw}` is not a single alphanumeric character"),
                ));
            }
        }
    }

    Ok(CatalogSettings { path, sources })
}

fn build_image_settings(images: RawImageSettings) -> ImageSettings {
    let allow_list = images
        .allow_list
        .into_iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .collect();
    let placeholder_url = images
        .placeholder_url
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .unwrap_or_else(|| DEFAULT_PLACEHOLDER_IMAGE_URL.to_string());

    ImageSettings {
        allow_list,
        placeholder_url,
    }
}

fn positive_seconds(value: u64, key: &'static str) -> Result<Duration, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    Ok(Duration::from_secs(value))
}

fn non_zero_usize(value: u64, key: &'static str) -> Result<NonZeroUsize, LoadError> {
    let value: usize = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for usize"))?;
    NonZeroUsize::new(value).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}
