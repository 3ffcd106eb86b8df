use cinemateket::BASE_URL;

const DEFAULT_PORT: &str = "10000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub bind_address: String,
    pub base_url: String,
}

impl ServiceConfig {
    /// Reads `BIND_ADDRESS`, then `PORT`, and `CINEMATEKET_BASE_URL`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let bind_address = lookup("BIND_ADDRESS").unwrap_or_else(|| {
            let port = lookup("PORT").unwrap_or_else(|| DEFAULT_PORT.into());
            format!("0.0.0.0:{}", port)
        });
        let base_url = lookup("CINEMATEKET_BASE_URL").unwrap_or_else(|| BASE_URL.into());

        Self {
            bind_address,
            base_url,
        }
    }
}
