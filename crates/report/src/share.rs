use extract::Locale;

const TELEGRAM_SHARE: &str = "https://t.me/share/url";

/// Prefilled message announcing a report.
pub fn share_message(target: &str, summary: &str, locale: Locale) -> String {
    locale.share_message(target, summary.trim())
}

/// Telegram share link for `page_url` with `message` as the text. Both are
/// percent-encoded as URI components.
pub fn telegram_share_url(page_url: &str, message: &str) -> String {
    format!(
        "{}?url={}&text={}",
        TELEGRAM_SHARE,
        urlencoding::encode(page_url),
        urlencoding::encode(message)
    )
}
