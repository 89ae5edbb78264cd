//! Configuration validation module.
//!
//! Collects every problem in one pass instead of stopping at the first,
//! so a misconfigured deployment reports all of them at startup.

use crate::AppConfig;
use std::fmt;
use url::Url;

/// Configuration validation error variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    /// URL format is invalid.
    InvalidUrl { url_type: String, message: String },
    /// Pool size must be at least one connection.
    ZeroPoolSize,
    /// Pool size exceeds maximum allowed.
    PoolSizeTooLarge { value: usize, maximum: usize },
    /// A TTL is below its minimum.
    TtlTooShort { name: String, value: u64, minimum: u64 },
    /// The in-process store bound is too small.
    MaxItemsTooSmall { value: usize, minimum: usize },
    /// Rate limit window must be at least one second.
    InvalidRateLimitWindow { value: u64 },
    /// Rate limit must allow at least one request.
    InvalidRateLimitMax { value: u32 },
    /// Log level is invalid.
    InvalidLogLevel { value: String },
    /// Environment name is unknown.
    InvalidEnvironment { value: String },
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUrl { url_type, message } => {
                write!(f, "Invalid {} URL: {}", url_type, message)
            }
            Self::ZeroPoolSize => write!(f, "Pool size must be at least 1"),
            Self::PoolSizeTooLarge { value, maximum } => {
                write!(f, "Pool size {} exceeds maximum allowed ({})", value, maximum)
            }
            Self::TtlTooShort { name, value, minimum } => {
                write!(f, "TTL '{}' is {}s (minimum {}s)", name, value, minimum)
            }
            Self::MaxItemsTooSmall { value, minimum } => {
                write!(f, "Cache max items {} is below minimum ({})", value, minimum)
            }
            Self::InvalidRateLimitWindow { value } => {
                write!(f, "Rate limit window must be at least 1s, got {}", value)
            }
            Self::InvalidRateLimitMax { value } => {
                write!(f, "Rate limit max must be at least 1, got {}", value)
            }
            Self::InvalidLogLevel { value } => {
                write!(
                    f,
                    "Invalid log level: '{}' (valid: trace, debug, info, warn, error)",
                    value
                )
            }
            Self::InvalidEnvironment { value } => {
                write!(
                    f,
                    "Invalid environment: '{}' (valid: development, production, test)",
                    value
                )
            }
        }
    }
}

impl std::error::Error for ConfigValidationError {}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Maximum connection pool size.
    const MAX_POOL_SIZE: usize = 1000;
    /// Minimum default cache TTL in seconds.
    const MIN_CACHE_TTL_SECS: u64 = 60;
    /// Minimum in-process store bound.
    const MIN_MAX_ITEMS: usize = 100;
    /// Valid log levels.
    const VALID_LOG_LEVELS: &'static [&'static str] = &["trace", "debug", "info", "warn", "error"];
    /// Valid environments.
    const VALID_ENVIRONMENTS: &'static [&'static str] = &["development", "production", "test"];

    /// Validates the entire application configuration.
    ///
    /// Returns Ok(()) if valid, or Err with all validation errors found.
    pub fn validate(config: &AppConfig) -> Result<(), Vec<ConfigValidationError>> {
        let mut errors = Vec::new();

        Self::validate_app(config, &mut errors);
        Self::validate_redis(&config.redis, &mut errors);
        Self::validate_cache(&config.cache, &mut errors);
        Self::validate_rate_limit(&config.rate_limit, &mut errors);
        Self::validate_logging(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_app(config: &AppConfig, errors: &mut Vec<ConfigValidationError>) {
        let env = config.app.environment.to_lowercase();
        if !Self::VALID_ENVIRONMENTS.contains(&env.as_str()) {
            errors.push(ConfigValidationError::InvalidEnvironment {
                value: config.app.environment.clone(),
            });
        }
    }

    /// Validates Redis configuration.
    fn validate_redis(config: &crate::RedisConfig, errors: &mut Vec<ConfigValidationError>) {
        if !config.enabled {
            return;
        }

        match Url::parse(&config.url) {
            Ok(url) if url.scheme() == "redis" || url.scheme() == "rediss" => {}
            Ok(_) => errors.push(ConfigValidationError::InvalidUrl {
                url_type: "redis".to_string(),
                message: "URL must start with redis:// or rediss://".to_string(),
            }),
            Err(e) => errors.push(ConfigValidationError::InvalidUrl {
                url_type: "redis".to_string(),
                message: e.to_string(),
            }),
        }

        if config.pool_size == 0 {
            errors.push(ConfigValidationError::ZeroPoolSize);
        } else if config.pool_size > Self::MAX_POOL_SIZE {
            errors.push(ConfigValidationError::PoolSizeTooLarge {
                value: config.pool_size,
                maximum: Self::MAX_POOL_SIZE,
            });
        }
    }

    fn validate_cache(config: &crate::CacheConfig, errors: &mut Vec<ConfigValidationError>) {
        if config.default_ttl_secs < Self::MIN_CACHE_TTL_SECS {
            errors.push(ConfigValidationError::TtlTooShort {
                name: "cache.default_ttl_secs".to_string(),
                value: config.default_ttl_secs,
                minimum: Self::MIN_CACHE_TTL_SECS,
            });
        }

        if config.response_ttl_secs == 0 {
            errors.push(ConfigValidationError::TtlTooShort {
                name: "cache.response_ttl_secs".to_string(),
                value: 0,
                minimum: 1,
            });
        }

        if config.max_items < Self::MIN_MAX_ITEMS {
            errors.push(ConfigValidationError::MaxItemsTooSmall {
                value: config.max_items,
                minimum: Self::MIN_MAX_ITEMS,
            });
        }
    }

    fn validate_rate_limit(config: &crate::RateLimitConfig, errors: &mut Vec<ConfigValidationError>) {
        if config.window_secs == 0 {
            errors.push(ConfigValidationError::InvalidRateLimitWindow {
                value: config.window_secs,
            });
        }
        if config.max_requests == 0 {
            errors.push(ConfigValidationError::InvalidRateLimitMax {
                value: config.max_requests,
            });
        }
    }

    fn validate_logging(config: &AppConfig, errors: &mut Vec<ConfigValidationError>) {
        let level = config.logging.level.to_lowercase();
        if !Self::VALID_LOG_LEVELS.contains(&level.as_str()) {
            errors.push(ConfigValidationError::InvalidLogLevel {
                value: config.logging.level.clone(),
            });
        }
    }
}
