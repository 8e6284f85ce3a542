#[derive(Clone)]
pub struct AppConfig {
    /// Dashboard origin used to build absolute URLs in notification payloads.
    pub base_url: String,
    /// URL-safe base64 ES256 private key for VAPID signing.
    pub vapid_private_key: Option<String>,
    /// Uncompressed-point public key handed to browsers at subscribe time.
    pub vapid_public_key: Option<String>,
    /// `mailto:` or `https:` contact claim for the push services.
    pub vapid_subject: Option<String>,
}

#[cfg(test)]
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: "https://dashboard.example".to_string(),
            vapid_private_key: None,
            vapid_public_key: None,
            vapid_subject: None,
        }
    }
}
