/// Keeps scheme and host, hides the path (the Telegram bot token lives there).
pub fn mask_url(url: &str) -> String {
    match url.split_once("://") {
        Some((scheme, rest)) => match rest.split_once('/') {
            Some((host, _)) => format!("{scheme}://{host}/***/"),
            None => format!("{scheme}://{rest}"),
        },
        None => "***".to_string(),
    }
}

/// Shows only the last four characters of an API key.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{tail}")
}

pub fn mask_phone(phone: &str) -> String {
    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
    if digits <= 4 {
        return "****".to_string();
    }
    let tail: String = phone.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
    format!("{}****{}", if phone.starts_with('+') { "+" } else { "" }, tail)
}
