use anyhow::anyhow;
use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".into(), port: 8080, worker_threads: Some(4) }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
    #[serde(default = "default_max_lifetime")]
    pub max_lifetime_secs: u64,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
    #[serde(default)]
    pub sqlx_logging: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            max_lifetime_secs: default_max_lifetime(),
            acquire_timeout_secs: default_acquire_timeout(),
            sqlx_logging: false,
        }
    }
}

fn default_max_connections() -> u32 { 10 }
fn default_min_connections() -> u32 { 2 }
fn default_connect_timeout() -> u64 { 30 }
fn default_idle_timeout() -> u64 { 600 }
fn default_max_lifetime() -> u64 { 3600 }
fn default_acquire_timeout() -> u64 { 30 }

/// Upstream image-generation API settings.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_generator_base")]
    pub api_base_url: String,
    #[serde(default = "default_generator_model")]
    pub model: String,
    #[serde(default = "default_generator_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_generator_retries")]
    pub max_retries: u32,
}

fn default_generator_base() -> String { "https://ark.cn-beijing.volces.com/api/v3".into() }
fn default_generator_model() -> String { "doubao-seedream-4-5-251128".into() }
fn default_generator_timeout() -> u64 { 30 }
fn default_generator_retries() -> u32 { 3 }

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base_url: default_generator_base(),
            model: default_generator_model(),
            timeout_secs: default_generator_timeout(),
            max_retries: default_generator_retries(),
        }
    }
}

impl GeneratorConfig {
    /// Placeholder keys (`your-...`) count as unconfigured; the worker then
    /// produces mock results instead of calling upstream.
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty() && !self.api_key.contains("your-")
    }
}

/// Local image storage settings.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_image_dir")]
    pub image_dir: String,
    #[serde(default = "default_max_image_size_mb")]
    pub max_image_size_mb: u64,
    #[serde(default = "default_allowed_image_types")]
    pub allowed_image_types: Vec<String>,
    /// Prefix used when building image URLs returned to clients.
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
}

fn default_image_dir() -> String { "data/images".into() }
fn default_max_image_size_mb() -> u64 { 5 }
fn default_allowed_image_types() -> Vec<String> {
    vec!["jpg".into(), "jpeg".into(), "png".into(), "webp".into()]
}
fn default_public_base_url() -> String { "/api/v1/images".into() }

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            image_dir: default_image_dir(),
            max_image_size_mb: default_max_image_size_mb(),
            allowed_image_types: default_allowed_image_types(),
            public_base_url: default_public_base_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: u32,
    /// Authenticated users with one of these emails are admins.
    #[serde(default)]
    pub admin_emails: Vec<String>,
}

fn default_token_ttl_hours() -> i64 { 12 }
fn default_rate_limit() -> u32 { 30 }

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_ttl_hours: default_token_ttl_hours(),
            rate_limit_per_minute: default_rate_limit(),
            admin_emails: Vec::new(),
        }
    }
}

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let cfg: AppConfig = toml::from_str(&content)?;
    Ok(cfg)
}

impl AppConfig {
    pub fn load_and_validate() -> Result<Self> {
        // 配置文件缺失时退回默认值，环境变量仍可覆盖关键项
        let mut cfg = load_default().unwrap_or_default();
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.server.normalize()?;
        self.database.normalize_from_env();
        self.database.validate()?;
        self.generator.normalize_from_env();
        self.generator.validate()?;
        self.storage.validate()?;
        self.auth.normalize_from_env();
        Ok(())
    }
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be in 1..=65535"));
        }
        match self.worker_threads {
            Some(0) | None => self.worker_threads = Some(4),
            Some(_) => {}
        }
        Ok(())
    }
}

impl DatabaseConfig {
    pub fn normalize_from_env(&mut self) {
        // 若 TOML 中未提供 URL，则尝试从环境变量填充
        if self.url.trim().is_empty() {
            if let Ok(url) = std::env::var("DATABASE_URL") {
                self.url = url;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(anyhow!(
                "database.url is empty; provide it in config.toml or via DATABASE_URL"
            ));
        }
        let lower = self.url.to_lowercase();
        if !(lower.starts_with("postgresql://") || lower.starts_with("postgres://")) {
            return Err(anyhow!("database.url must start with postgresql:// or postgres://"));
        }
        if self.min_connections == 0 {
            return Err(anyhow!("database.min_connections must be >= 1"));
        }
        if self.max_connections < self.min_connections {
            return Err(anyhow!("database.max_connections must be >= min_connections"));
        }
        if self.connect_timeout_secs == 0 || self.acquire_timeout_secs == 0 {
            return Err(anyhow!("database timeouts must be positive seconds"));
        }
        Ok(())
    }
}

impl GeneratorConfig {
    pub fn normalize_from_env(&mut self) {
        if self.api_key.trim().is_empty() {
            if let Ok(key) = std::env::var("GENERATOR_API_KEY") {
                self.api_key = key;
            }
        }
        if let Ok(base) = std::env::var("GENERATOR_API_BASE_URL") {
            if !base.trim().is_empty() {
                self.api_base_url = base;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(anyhow!("generator.timeout_secs must be positive"));
        }
        if self.api_base_url.trim().is_empty() {
            return Err(anyhow!("generator.api_base_url must not be empty"));
        }
        Ok(())
    }
}

impl StorageConfig {
    pub fn validate(&self) -> Result<()> {
        if self.image_dir.trim().is_empty() {
            return Err(anyhow!("storage.image_dir must not be empty"));
        }
        if self.max_image_size_mb == 0 {
            return Err(anyhow!("storage.max_image_size_mb must be positive"));
        }
        Ok(())
    }
}

impl AuthConfig {
    pub fn normalize_from_env(&mut self) {
        if self.jwt_secret.trim().is_empty() {
            if let Ok(secret) = std::env::var("JWT_SECRET") {
                self.jwt_secret = secret;
            }
        }
        if let Ok(admins) = std::env::var("ADMIN_EMAILS") {
            if !admins.trim().is_empty() {
                self.admin_emails = admins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.database.max_connections, 10);
        assert_eq!(cfg.generator.max_retries, 3);
        assert_eq!(cfg.storage.max_image_size_mb, 5);
        assert_eq!(cfg.auth.rate_limit_per_minute, 30);
    }

    #[test]
    fn generator_placeholder_key_is_unconfigured() {
        let mut g = GeneratorConfig::default();
        assert!(!g.is_configured());
        g.api_key = "your-api-key-here".into();
        assert!(!g.is_configured());
        g.api_key = "ak-real".into();
        assert!(g.is_configured());
    }

    #[test]
    fn database_url_scheme_is_enforced() {
        let mut db = DatabaseConfig { url: "mysql://x".into(), ..Default::default() };
        assert!(db.validate().is_err());
        db.url = "postgres://localhost/picgen".into();
        assert!(db.validate().is_ok());
    }

    #[test]
    fn toml_sections_parse() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [server]
            host = "0.0.0.0"
            port = 9000

            [generator]
            api_key = "ak-test"
            timeout_secs = 10

            [storage]
            image_dir = "tmp/images"

            [auth]
            rate_limit_per_minute = 5
            admin_emails = ["root@example.com"]
            "#,
        )
        .expect("parse");
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.generator.timeout_secs, 10);
        assert_eq!(cfg.storage.image_dir, "tmp/images");
        assert_eq!(cfg.auth.admin_emails, vec!["root@example.com".to_string()]);
    }
}
