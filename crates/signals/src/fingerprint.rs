//! Device fingerprinting from user-agent strings.
//!
//! The fingerprint is a stable digest of the browser family, OS family, and a
//! user-agent prefix. It deliberately ignores version segments past the prefix
//! so routine browser updates do not register as new devices.

use sha2::{Digest, Sha256};

/// How much of the raw user agent feeds the digest.
const UA_PREFIX_CHARS: usize = 50;

/// User-agent substrings that identify scanning and attack tooling.
const SUSPECT_AGENT_TOKENS: &[&str] = &[
    "sqlmap",
    "nikto",
    "nmap",
    "masscan",
    "metasploit",
    "burp",
    "dirbuster",
    "acunetix",
    "nessus",
];

/// Derive a device fingerprint from a raw user-agent string.
#[must_use]
pub fn derive(user_agent: &str) -> String {
    let browser = browser_family(user_agent);
    let os = os_family(user_agent);
    let prefix: String = user_agent.chars().take(UA_PREFIX_CHARS).collect();
    sha256_hex(&format!("{browser}|{os}|{prefix}"))
}

/// Returns the matched token if the user agent looks like attack tooling.
#[must_use]
pub fn suspect_agent(user_agent: &str) -> Option<&'static str> {
    let lower = user_agent.to_lowercase();
    SUSPECT_AGENT_TOKENS
        .iter()
        .find(|token| lower.contains(*token))
        .copied()
}

/// Coarse browser classification. Order matters: Edge and Opera advertise
/// Chrome, and Chrome advertises Safari.
#[must_use]
pub fn browser_family(user_agent: &str) -> &'static str {
    if user_agent.contains("Edg/") || user_agent.contains("Edge/") {
        "Edge"
    } else if user_agent.contains("OPR/") || user_agent.contains("Opera") {
        "Opera"
    } else if user_agent.contains("Firefox/") {
        "Firefox"
    } else if user_agent.contains("Chrome/") {
        "Chrome"
    } else if user_agent.contains("Safari/") {
        "Safari"
    } else {
        "Other"
    }
}

/// Coarse OS classification. Android advertises Linux and iOS advertises
/// Mac OS X, so those checks come first.
#[must_use]
pub fn os_family(user_agent: &str) -> &'static str {
    if user_agent.contains("Android") {
        "Android"
    } else if user_agent.contains("iPhone") || user_agent.contains("iPad") {
        "iOS"
    } else if user_agent.contains("Windows") {
        "Windows"
    } else if user_agent.contains("Mac OS X") || user_agent.contains("Macintosh") {
        "macOS"
    } else if user_agent.contains("Linux") {
        "Linux"
    } else {
        "Other"
    }
}

fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const CHROME_LINUX: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
    const FIREFOX_WIN: &str =
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0";
    const SAFARI_IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) \
         AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";
    const EDGE_WIN: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0";

    #[test]
    fn browser_classification() {
        assert_eq!(browser_family(CHROME_LINUX), "Chrome");
        assert_eq!(browser_family(FIREFOX_WIN), "Firefox");
        assert_eq!(browser_family(SAFARI_IPHONE), "Safari");
        assert_eq!(browser_family(EDGE_WIN), "Edge");
        assert_eq!(browser_family("curl/8.4.0"), "Other");
    }

    #[test]
    fn os_classification() {
        assert_eq!(os_family(CHROME_LINUX), "Linux");
        assert_eq!(os_family(FIREFOX_WIN), "Windows");
        assert_eq!(os_family(SAFARI_IPHONE), "iOS");
        assert_eq!(
            os_family("Mozilla/5.0 (Linux; Android 14; Pixel 8) Chrome/120.0"),
            "Android"
        );
        assert_eq!(os_family("curl/8.4.0"), "Other");
    }

    #[test]
    fn fingerprint_is_stable_and_hex() {
        let a = derive(CHROME_LINUX);
        let b = derive(CHROME_LINUX);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn fingerprint_differs_across_agents() {
        assert_ne!(derive(CHROME_LINUX), derive(FIREFOX_WIN));
    }

    #[test]
    fn fingerprint_ignores_late_version_churn() {
        // These differ only past the 50-char prefix.
        let base = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko)";
        let a = format!("{base} Chrome/120.0.6099.109 Safari/537.36");
        let b = format!("{base} Chrome/120.0.6099.225 Safari/537.36");
        assert_eq!(derive(&a), derive(&b));
    }

    #[test]
    fn multibyte_agents_do_not_panic() {
        let ua = "ブラウザ".repeat(40);
        let digest = derive(&ua);
        assert_eq!(digest.len(), 64);
    }

    #[test]
    fn scanning_tools_are_suspect() {
        assert_eq!(suspect_agent("sqlmap/1.7.2#stable"), Some("sqlmap"));
        assert_eq!(suspect_agent("Mozilla/5.0 Nikto/2.5.0"), Some("nikto"));
        assert_eq!(suspect_agent(CHROME_LINUX), None);
    }
}
