#[derive(Clone, Debug, PartialEq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheControlConfig {
    /// Max age in seconds applied to root fields without an explicit hint.
    pub default_max_age: u32,
    /// Set the `Cache-Control` header of successful responses.
    pub calculate_http_headers: bool,
    /// Do not report the collected hints in the `cacheControl` response extension.
    pub strip_formatted_extensions: bool,
}

impl Default for CacheControlConfig {
    fn default() -> Self {
        Self {
            default_max_age: 0,
            calculate_http_headers: true,
            strip_formatted_extensions: true,
        }
    }
}
