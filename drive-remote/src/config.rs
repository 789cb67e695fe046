const DEFAULT_API_BASE_URL: &str = "https://www.googleapis.com";
const DEFAULT_SHARE_HOST: &str = "https://googledrive.com/host/";
const DEFAULT_PAGE_SIZE: u32 = 100;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteConfig {
    pub api_base_url: String,
    /// Prefix of public URLs for published objects; the object id is appended verbatim.
    pub share_host: String,
    pub page_size: u32,
    pub hide_hidden: bool,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            share_host: DEFAULT_SHARE_HOST.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            hide_hidden: true,
        }
    }
}

impl RemoteConfig {
    pub fn from_env() -> Self {
        Self {
            api_base_url: read_string_env("DRIVE_API_BASE_URL", DEFAULT_API_BASE_URL),
            share_host: read_string_env("DRIVE_SHARE_HOST", DEFAULT_SHARE_HOST),
            page_size: read_u32_env("DRIVE_PAGE_SIZE", DEFAULT_PAGE_SIZE),
            hide_hidden: read_bool_env("DRIVE_HIDE_HIDDEN", true),
        }
    }

    pub fn with_api_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api_base_url = base_url.into();
        self
    }
}

fn read_string_env(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn read_u32_env(name: &str, default: u32) -> u32 {
    std::env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<u32>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

fn read_bool_env(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .map(|value| {
            matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        })
        .unwrap_or(default)
}
