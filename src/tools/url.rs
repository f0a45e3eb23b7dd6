/// Tidy a URL copied out of model output or user input.
///
/// Trims surrounding whitespace. URLs with inner spaces are repaired: for
/// GitHub links the first two space-separated parts are joined with `/`
/// (a common way repository paths get split), anything else has its spaces
/// percent-encoded.
pub fn clean_url(url: &str) -> String {
    let url = url.trim();
    if !url.contains(' ') {
        return url.to_string();
    }

    if url.contains("github.com") {
        let mut parts = url.split_whitespace();
        if let (Some(first), Some(second)) = (parts.next(), parts.next()) {
            return format!("{}/{}", first, second);
        }
    }

    url.replace(' ', "%20")
}
