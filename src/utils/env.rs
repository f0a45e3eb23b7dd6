/// Get environment variable with TOOLGATE_ prefix, falling back to unprefixed version
///
/// This helper function checks for `TOOLGATE_{key}` first, then falls back to `{key}`
/// so deployments can keep using plain names like `API_KEY` or `PORT`.
///
/// # Examples
///
/// ```rust
/// use toolgate::utils::get_env_with_prefix;
///
/// // Checks TOOLGATE_PORT first, then PORT
/// let port = get_env_with_prefix("PORT");
/// ```
pub fn get_env_with_prefix(key: &str) -> Option<String> {
    std::env::var(format!("TOOLGATE_{}", key))
        .or_else(|_| std::env::var(key))
        .ok()
}

/// Resolve a `${VAR}` placeholder from the environment.
///
/// Values that are not placeholders are returned unchanged. An unset or
/// empty variable resolves to `None`.
pub fn interpolate_env(value: &str) -> Option<String> {
    let resolved = match value
        .strip_prefix("${")
        .and_then(|rest| rest.strip_suffix('}'))
    {
        Some(var) => std::env::var(var).ok()?,
        None => value.to_string(),
    };

    if resolved.is_empty() {
        None
    } else {
        Some(resolved)
    }
}
