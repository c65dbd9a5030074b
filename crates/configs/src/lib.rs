use std::time::Duration;

use anyhow::anyhow;
use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
    /// `/healthz` + `/metrics` side server, e.g. `127.0.0.1:9090`.
    #[serde(default)]
    pub admin_addr: Option<String>,
    #[serde(default)]
    pub json_logs: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port(), worker_threads: Some(4), admin_addr: None, json_logs: false }
    }
}

fn default_host() -> String { "127.0.0.1".into() }
fn default_port() -> u16 { 8080 }

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub anon_key: String,
    #[serde(default)]
    pub service_role_key: String,
    #[serde(default = "default_function_name")]
    pub function_name: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: String::new(),
            service_role_key: String::new(),
            function_name: default_function_name(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_function_name() -> String { "admin-action".into() }
fn default_timeout() -> u64 { 15 }

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub jwt_secret: String,
    /// Login identifier `admin` signs in as this email.
    #[serde(default)]
    pub admin_alias_email: String,
    /// Login identifier `office` signs in as this email.
    #[serde(default)]
    pub office_alias_email: String,
    #[serde(default = "default_token_ttl")]
    pub token_ttl_hours: i64,
    #[serde(default)]
    pub cookie_secure: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            admin_alias_email: String::new(),
            office_alias_email: String::new(),
            token_ttl_hours: default_token_ttl(),
            cookie_secure: false,
        }
    }
}

fn default_token_ttl() -> i64 { 12 }

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshConfig {
    #[serde(default = "default_refresh_enabled")]
    pub enabled: bool,
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self { Self { enabled: true, interval_secs: default_interval() } }
}

fn default_refresh_enabled() -> bool { true }
fn default_interval() -> u64 { 30 }

/// `CONFIG_PATH` or `./config.toml`; a missing file means env-only configuration.
pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    if std::path::Path::new(&path).exists() {
        load_from_file(&path)
    } else {
        Ok(AppConfig::default())
    }
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    let cfg: AppConfig = toml::from_str(&content)?;
    Ok(cfg)
}

fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = load_default()?;
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.normalize_with(process_env)?;
        self.validate()
    }

    /// Apply environment overrides through `env`, so tests need not touch the process environment.
    pub fn normalize_with<F>(&mut self, env: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.server.normalize(&env)?;
        self.backend.normalize_from_env(&env);
        self.auth.normalize_from_env(&env);
        self.refresh.normalize_from_env(&env)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.backend.validate()?;
        self.auth.validate()?;
        Ok(())
    }

    pub fn bind_addr(&self) -> String { format!("{}:{}", self.server.host, self.server.port) }
}

impl ServerConfig {
    fn normalize<F: Fn(&str) -> Option<String>>(&mut self, env: &F) -> Result<()> {
        // 部署环境变量优先于 config.toml
        if let Some(host) = env("SERVER_HOST") {
            self.host = host;
        }
        if let Some(port) = env("SERVER_PORT") {
            self.port = port.trim().parse().map_err(|_| anyhow!("SERVER_PORT 不是合法端口: {port}"))?;
        }
        if self.worker_threads.is_none() {
            self.worker_threads = env("TOKIO_WORKER_THREADS").and_then(|v| v.trim().parse().ok());
        }
        if self.host.trim().is_empty() {
            self.host = default_host();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port 必须在 1..=65535 范围内"));
        }
        match self.worker_threads {
            Some(0) | None => self.worker_threads = Some(4),
            Some(_) => {}
        }
        if let Some(addr) = &self.admin_addr {
            if addr.trim().is_empty() {
                self.admin_addr = None;
            }
        }
        Ok(())
    }
}

fn fill<F: Fn(&str) -> Option<String>>(slot: &mut String, env: &F, key: &str) {
    if slot.trim().is_empty() {
        if let Some(v) = env(key) {
            *slot = v;
        }
    }
    *slot = slot.trim().to_string();
}

impl BackendConfig {
    pub fn normalize_from_env<F: Fn(&str) -> Option<String>>(&mut self, env: &F) {
        // 若 TOML 中未提供，则尝试从环境变量填充
        fill(&mut self.url, env, "SUPABASE_URL");
        fill(&mut self.anon_key, env, "SUPABASE_ANON_KEY");
        fill(&mut self.service_role_key, env, "SUPABASE_SERVICE_ROLE_KEY");
        self.url = self.url.trim_end_matches('/').to_string();
        if self.function_name.trim().is_empty() {
            self.function_name = default_function_name();
        }
        if self.timeout_secs == 0 {
            self.timeout_secs = default_timeout();
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.url.is_empty() {
            return Err(anyhow!("backend.url 为空；请在 config.toml 或环境变量 SUPABASE_URL 中提供"));
        }
        let lower = self.url.to_lowercase();
        if !(lower.starts_with("https://") || lower.starts_with("http://")) {
            return Err(anyhow!("backend.url 必须以 http:// 或 https:// 开头"));
        }
        for (name, key) in [("anon_key", &self.anon_key), ("service_role_key", &self.service_role_key)] {
            if key.is_empty() {
                return Err(anyhow!("backend.{name} 为空"));
            }
            if key.starts_with("YOUR_") {
                return Err(anyhow!("backend.{name} 仍是占位值 ({key})"));
            }
        }
        if self.service_role_key == self.anon_key {
            return Err(anyhow!("backend.service_role_key 与 anon_key 相同；服务端必须使用 service role key"));
        }
        if !self.service_role_key.starts_with("eyJ") {
            return Err(anyhow!("backend.service_role_key 不是 JWT 格式"));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration { Duration::from_secs(self.timeout_secs) }
}

impl AuthConfig {
    pub fn normalize_from_env<F: Fn(&str) -> Option<String>>(&mut self, env: &F) {
        fill(&mut self.jwt_secret, env, "JWT_SECRET");
        fill(&mut self.admin_alias_email, env, "ADMIN_ALIAS_EMAIL");
        fill(&mut self.office_alias_email, env, "OFFICE_ALIAS_EMAIL");
        if self.token_ttl_hours <= 0 {
            self.token_ttl_hours = default_token_ttl();
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.jwt_secret.len() < 16 {
            return Err(anyhow!("auth.jwt_secret 至少需要 16 个字符 (JWT_SECRET)"));
        }
        if !self.admin_alias_email.is_empty() && !self.admin_alias_email.contains('@') {
            return Err(anyhow!("auth.admin_alias_email 不是合法邮箱"));
        }
        if !self.office_alias_email.is_empty() && !self.office_alias_email.contains('@') {
            return Err(anyhow!("auth.office_alias_email 不是合法邮箱"));
        }
        Ok(())
    }
}

impl RefreshConfig {
    fn normalize_from_env<F: Fn(&str) -> Option<String>>(&mut self, env: &F) -> Result<()> {
        if let Some(v) = env("REFRESH_INTERVAL_SECS") {
            self.interval_secs = v.trim().parse().map_err(|_| anyhow!("REFRESH_INTERVAL_SECS 必须为正整数: {v}"))?;
        }
        if self.interval_secs == 0 {
            self.interval_secs = default_interval();
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration { Duration::from_secs(self.interval_secs) }
}
