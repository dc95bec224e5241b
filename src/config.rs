use std::path::PathBuf;

/// Lookback period sent with every model refresh.
pub const REFRESH_PERIOD: &str = "1y";
/// Training epochs sent with every model refresh.
pub const REFRESH_EPOCHS: u32 = 30;
/// UI redraw / input poll interval.
pub const TICK_MS: u64 = 16;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_LOG_FILE: &str = "oasis-tui.log";
pub const DEFAULT_LOG_FILTER: &str = "oasis_tui=info";

pub const API_URL_ENV: &str = "OASIS_API_URL";
pub const LOG_FILE_ENV: &str = "OASIS_LOG_FILE";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DashboardConfig {
    pub api_url: String,
    pub log_file: PathBuf,
}

impl DashboardConfig {
    /// CLI flags win over the environment, which wins over defaults.
    pub fn resolve(api_url: Option<String>, log_file: Option<PathBuf>) -> Self {
        Self::resolve_with(api_url, log_file, |key| std::env::var(key).ok())
    }

    fn resolve_with(
        api_url: Option<String>,
        log_file: Option<PathBuf>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let non_empty = |v: String| {
            let trimmed = v.trim().to_string();
            (!trimmed.is_empty()).then_some(trimmed)
        };

        let api_url = api_url
            .and_then(non_empty)
            .or_else(|| env(API_URL_ENV).and_then(non_empty))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let log_file = log_file
            .or_else(|| env(LOG_FILE_ENV).and_then(non_empty).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE));

        Self { api_url, log_file }
    }
}

/// Loads `.env` if present. Returns the file used, or the reason it could not
/// be read; a missing file is not an error.
pub fn load_dotenv() -> Result<Option<PathBuf>, dotenvy::Error> {
    match dotenvy::dotenv() {
        Ok(path) => Ok(Some(path)),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(e),
    }
}
