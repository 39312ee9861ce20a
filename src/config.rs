use anyhow::Context;
use serde::Deserialize;

/// Longest accepted token lifetime: ten years.
pub const MAX_TOKEN_TTL_MINUTES: i64 = 60 * 24 * 366 * 10;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub issuer: String,
    pub audience: String,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// Argon2 cost parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct PasswordConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub password: PasswordConfig,
    pub refresh_purge_interval_secs: u64,
    pub cors_allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt = JwtConfig {
            access_secret: std::env::var("JWT_ACCESS_SECRET").context("JWT_ACCESS_SECRET is not set")?,
            refresh_secret: std::env::var("JWT_REFRESH_SECRET")
                .context("JWT_REFRESH_SECRET is not set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "askme".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "askme-users".into()),
            access_ttl_minutes: env_parse("JWT_ACCESS_TTL_MINUTES").unwrap_or(60 * 10),
            refresh_ttl_minutes: env_parse("JWT_REFRESH_TTL_MINUTES").unwrap_or(60 * 24 * 30),
        };
        jwt.validate()?;

        let defaults = PasswordConfig::default();
        let password = PasswordConfig {
            memory_kib: env_parse("PASSWORD_HASH_MEMORY_KIB").unwrap_or(defaults.memory_kib),
            iterations: env_parse("PASSWORD_HASH_ITERATIONS").unwrap_or(defaults.iterations),
            parallelism: env_parse("PASSWORD_HASH_PARALLELISM").unwrap_or(defaults.parallelism),
        };

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .map(|v| parse_origins(&v))
            .unwrap_or_default();

        Ok(Self {
            database_url,
            jwt,
            password,
            refresh_purge_interval_secs: env_parse("REFRESH_PURGE_INTERVAL_SECS")
                .filter(|&secs: &u64| secs > 0)
                .unwrap_or(3600),
            cors_allowed_origins,
        })
    }
}

impl JwtConfig {
    /// Rejects configurations where the two token kinds could be confused.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.access_secret.is_empty(), "JWT_ACCESS_SECRET is empty");
        anyhow::ensure!(!self.refresh_secret.is_empty(), "JWT_REFRESH_SECRET is empty");
        anyhow::ensure!(
            self.access_secret != self.refresh_secret,
            "JWT_ACCESS_SECRET and JWT_REFRESH_SECRET must differ"
        );
        anyhow::ensure!(
            self.access_ttl_minutes > 0 && self.refresh_ttl_minutes > 0,
            "token lifetimes must be positive"
        );
        anyhow::ensure!(
            self.access_ttl_minutes <= MAX_TOKEN_TTL_MINUTES
                && self.refresh_ttl_minutes <= MAX_TOKEN_TTL_MINUTES,
            "token lifetimes must not exceed {MAX_TOKEN_TTL_MINUTES} minutes"
        );
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
