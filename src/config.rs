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
pub struct GenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub tts_model: String,
    pub tts_voice: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStoreKind {
    Postgres,
    Memory,
}

impl std::str::FromStr for DocumentStoreKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(Self::Postgres),
            "memory" | "mem" => Ok(Self::Memory),
            other => anyhow::bail!("unknown DOCUMENT_STORE '{}'", other),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub genai: GenAiConfig,
    pub document_store: DocumentStoreKind,
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.into())
}

fn minutes(name: &str, default: i64) -> i64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: var_or("JWT_ISSUER", "fitcompass"),
            audience: var_or("JWT_AUDIENCE", "fitcompass-users"),
            ttl_minutes: minutes("JWT_TTL_MINUTES", 60),
            refresh_ttl_minutes: minutes("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 14),
        };
        let genai = GenAiConfig {
            api_key: std::env::var("GEMINI_API_KEY")?,
            base_url: var_or(
                "GEMINI_BASE_URL",
                "https://generativelanguage.googleapis.com/v1beta",
            ),
            model: var_or("GEMINI_MODEL", "gemini-2.0-flash"),
            tts_model: var_or("GEMINI_TTS_MODEL", "gemini-2.5-flash-preview-tts"),
            tts_voice: var_or("GEMINI_TTS_VOICE", "Algenib"),
        };
        let document_store = var_or("DOCUMENT_STORE", "postgres").parse()?;
        Ok(Self {
            database_url,
            jwt,
            genai,
            document_store,
        })
    }
}
