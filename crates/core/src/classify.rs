//! User-agent classification.
//!
//! Three ordered rule tables are scanned against the lower-cased signature.
//! The first matching rule wins, so table order decides overlaps such as a
//! Chrome user agent also advertising Safari.

use serde::{Deserialize, Serialize};

/// Device class derived from a user agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Mobile,
    Tablet,
    Desktop,
}

impl DeviceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mobile => "mobile",
            Self::Tablet => "tablet",
            Self::Desktop => "desktop",
        }
    }
}

/// Browser (client) family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientFamily {
    Chrome,
    Firefox,
    Safari,
    Edge,
    Opera,
    BotClient,
    Other,
}

impl ClientFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chrome => "chrome",
            Self::Firefox => "firefox",
            Self::Safari => "safari",
            Self::Edge => "edge",
            Self::Opera => "opera",
            Self::BotClient => "bot_client",
            Self::Other => "other",
        }
    }
}

/// Operating system (platform) family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformFamily {
    Windows,
    Macos,
    Linux,
    Android,
    Ios,
    Other,
}

impl PlatformFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::Macos => "macos",
            Self::Linux => "linux",
            Self::Android => "android",
            Self::Ios => "ios",
            Self::Other => "other",
        }
    }
}

/// Classification triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub device: DeviceClass,
    pub client: ClientFamily,
    pub platform: PlatformFamily,
}

/// Matches when any `include` token is present and no `exclude` token is.
struct Rule<T> {
    include: &'static [&'static str],
    exclude: &'static [&'static str],
    result: T,
}

impl<T: Copy> Rule<T> {
    fn matches(&self, ua: &str) -> bool {
        self.include.iter().any(|t| ua.contains(t)) && !self.exclude.iter().any(|t| ua.contains(t))
    }
}

const fn rule<T>(include: &'static [&'static str], exclude: &'static [&'static str], result: T) -> Rule<T> {
    Rule {
        include,
        exclude,
        result,
    }
}

const DEVICE_RULES: &[Rule<DeviceClass>] = &[
    rule(&["mobile", "iphone", "android"], &[], DeviceClass::Mobile),
    rule(&["tablet", "ipad"], &[], DeviceClass::Tablet),
];

const CLIENT_RULES: &[Rule<ClientFamily>] = &[
    rule(&["chrome"], &["chromium"], ClientFamily::Chrome),
    rule(&["firefox"], &[], ClientFamily::Firefox),
    rule(&["safari"], &["chrome"], ClientFamily::Safari),
    rule(&["edge"], &[], ClientFamily::Edge),
    rule(&["opera"], &[], ClientFamily::Opera),
    rule(
        &["bot", "crawler", "spider", "googlebot", "bingbot"],
        &[],
        ClientFamily::BotClient,
    ),
];

const PLATFORM_RULES: &[Rule<PlatformFamily>] = &[
    rule(&["windows"], &[], PlatformFamily::Windows),
    rule(&["mac os", "macintosh"], &[], PlatformFamily::Macos),
    rule(&["linux"], &["android"], PlatformFamily::Linux),
    rule(&["android"], &[], PlatformFamily::Android),
    rule(&["iphone", "ipad"], &[], PlatformFamily::Ios),
];

fn first_match<T: Copy>(rules: &[Rule<T>], ua: &str, fallback: T) -> T {
    rules
        .iter()
        .find(|r| r.matches(ua))
        .map(|r| r.result)
        .unwrap_or(fallback)
}

/// Classifies a user-agent string. Total: every input yields a triple.
pub fn classify(user_agent: &str) -> Classification {
    let ua = user_agent.to_lowercase();

    Classification {
        device: first_match(DEVICE_RULES, &ua, DeviceClass::Desktop),
        client: first_match(CLIENT_RULES, &ua, ClientFamily::Other),
        platform: first_match(PLATFORM_RULES, &ua, PlatformFamily::Other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn triple(ua: &str) -> (&'static str, &'static str, &'static str) {
        let c = classify(ua);
        (c.device.as_str(), c.client.as_str(), c.platform.as_str())
    }

    #[test]
    fn test_chrome_windows() {
        assert_eq!(
            triple("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"),
            ("desktop", "chrome", "windows")
        );
    }

    #[test]
    fn test_safari_macos() {
        assert_eq!(
            triple("Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15"),
            ("desktop", "safari", "macos")
        );
    }

    #[test]
    fn test_android_is_not_linux() {
        assert_eq!(
            triple("Mozilla/5.0 (Linux; Android 11; SM-A505F) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.6045.163 Mobile Safari/537.36"),
            ("mobile", "chrome", "android")
        );
    }

    #[test]
    fn test_iphone() {
        assert_eq!(
            triple("Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1"),
            // "mac os" appears before the iphone rule is reached
            ("mobile", "safari", "macos")
        );
    }

    #[test]
    fn test_ipad_is_tablet() {
        assert_eq!(triple("Mozilla/5.0 (iPad; CPU OS 16_0)"), ("tablet", "other", "ios"));
    }

    #[test]
    fn test_firefox_linux() {
        assert_eq!(
            triple("Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0"),
            ("desktop", "firefox", "linux")
        );
    }

    #[test]
    fn test_chromium_is_not_chrome() {
        let ua = "Mozilla/5.0 (X11; Linux x86_64) Chromium/119.0 Chrome/119.0 Safari/537.36";
        assert_eq!(classify(ua).client, ClientFamily::Other);
        assert_eq!(classify("Chromium/120.0 Safari/537.36").client, ClientFamily::Safari);
    }

    #[test]
    fn test_edge_reports_chrome_when_chrome_token_present() {
        let ua = "Mozilla/5.0 (Windows NT 10.0) Chrome/120.0 Safari/537.36 Edg/120.0 Edge/120";
        assert_eq!(classify(ua).client, ClientFamily::Chrome);
        assert_eq!(classify("Edge/18.0").client, ClientFamily::Edge);
    }

    #[test]
    fn test_bots() {
        assert_eq!(triple("python-requests/2.31.0"), ("desktop", "other", "other"));
        assert_eq!(triple("Googlebot/2.1 (+http://www.google.com/bot.html)"), ("desktop", "bot_client", "other"));
        assert_eq!(
            classify("Mozilla/5.0 (compatible; Bingbot/2.0; +http://www.bing.com/bingbot.htm)").client,
            ClientFamily::BotClient
        );
        // A crawler spoofing Chrome is classified by the earlier rule.
        assert_eq!(
            classify("Mozilla/5.0 AppleWebKit/537.36 (KHTML, like Gecko; compatible; Googlebot/2.1) Chrome/120.0.6099.108 Safari/537.36").client,
            ClientFamily::Chrome
        );
        assert_eq!(classify("Selenium/Chrome/120.0.6099.109").client, ClientFamily::Chrome);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(classify("FIREFOX on WINDOWS").client, ClientFamily::Firefox);
        assert_eq!(classify("FIREFOX on WINDOWS").platform, PlatformFamily::Windows);
    }

    #[test]
    fn test_empty_signature() {
        assert_eq!(triple(""), ("desktop", "other", "other"));
    }

    proptest! {
        #[test]
        fn prop_classify_is_total(ua in ".*") {
            let c = classify(&ua);
            prop_assert!(["mobile", "tablet", "desktop"].contains(&c.device.as_str()));
            prop_assert!(["chrome", "firefox", "safari", "edge", "opera", "bot_client", "other"]
                .contains(&c.client.as_str()));
            prop_assert!(["windows", "macos", "linux", "android", "ios", "other"]
                .contains(&c.platform.as_str()));
        }

        #[test]
        fn prop_classify_is_deterministic(ua in "[ -~]{0,200}") {
            prop_assert_eq!(classify(&ua), classify(&ua));
        }
    }
}
