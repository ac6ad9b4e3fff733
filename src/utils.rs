use crate::config::ServerConfig;
use rand::Rng;

pub fn random_id() -> String {
    hex::encode(rand::rng().random::<[u8; 8]>())
}

const ICE_SCHEMES: [&str; 4] = ["stun:", "stuns:", "turn:", "turns:"];

/// Returns the server URL, prefixed with a scheme from its type when it has none.
pub fn add_ice_url_scheme(config: &ServerConfig) -> String {
    if ICE_SCHEMES.iter().any(|s| config.url.starts_with(s)) {
        return config.url.clone();
    }
    let scheme = match config.r#type.as_str() {
        "turn" => "turn",
        _ => "stun",
    };
    format!("{scheme}:{}", config.url)
}
