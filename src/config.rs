use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
    pub email_from: String,
    /// Recipients of `Recipients::Admins`.
    pub admins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub mail: MailConfig,
    pub minio_endpoint: String,
    pub minio_bucket: String,
    pub minio_access_key: String,
    pub minio_secret_key: String,
    /// Public domain of this installation, used in emails and as fallback author.
    pub site_domain: String,
    pub off_base_url: String,
    pub use_task_queue: bool,
    pub cache_ttl_secs: u64,
    pub cache_max_entries: usize,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "nutriboard".into()),
            audience: std::env::var("JWT_AUDIENCE")
                .unwrap_or_else(|_| "nutriboard-users".into()),
            ttl_minutes: env_parse("JWT_TTL_MINUTES").unwrap_or(60),
            refresh_ttl_minutes: env_parse("JWT_REFRESH_TTL_MINUTES").unwrap_or(60 * 24 * 14),
        };
        let mail = MailConfig {
            email_from: std::env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "nutriboard <noreply@localhost>".into()),
            admins: std::env::var("ADMINS")
                .map(|v| parse_list(&v))
                .unwrap_or_default(),
        };
        Ok(Self {
            database_url,
            jwt,
            mail,
            minio_endpoint: std::env::var("MINIO_ENDPOINT")?,
            minio_bucket: std::env::var("MINIO_BUCKET").unwrap_or_else(|_| "ingredients".into()),
            minio_access_key: std::env::var("MINIO_ACCESS_KEY")?,
            minio_secret_key: std::env::var("MINIO_SECRET_KEY")?,
            site_domain: std::env::var("SITE_DOMAIN").unwrap_or_else(|_| "localhost".into()),
            off_base_url: std::env::var("OFF_BASE_URL")
                .unwrap_or_else(|_| "https://world.openfoodfacts.org".into()),
            use_task_queue: std::env::var("USE_TASK_QUEUE")
                .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            cache_ttl_secs: env_parse("CACHE_TTL_SECS").unwrap_or(60 * 60 * 24 * 30),
            cache_max_entries: env_parse("CACHE_MAX_ENTRIES").unwrap_or(10_000),
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
