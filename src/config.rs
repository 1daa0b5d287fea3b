use serde::Deserialize;

const DEFAULT_EMAIL_FROM: &str = "Mystery Message <onboarding@resend.dev>";
const DEFAULT_RESEND_API_URL: &str = "https://api.resend.com/emails";

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    pub from: String,
    /// When unset, outgoing mail is only logged.
    pub resend_api_key: Option<String>,
    pub resend_api_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub email: EmailConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let database_max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);
        let email = EmailConfig {
            from: std::env::var("EMAIL_FROM").unwrap_or_else(|_| DEFAULT_EMAIL_FROM.into()),
            resend_api_key: std::env::var("RESEND_API_KEY")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            resend_api_url: std::env::var("RESEND_API_URL")
                .unwrap_or_else(|_| DEFAULT_RESEND_API_URL.into()),
        };
        Ok(Self {
            database_url,
            database_max_connections,
            email,
        })
    }
}
