//! Browser-like request headers

use rand::seq::SliceRandom;

const DESKTOP_PLATFORMS: &[&str] = &[
    "Windows NT 10.0; Win64; x64",
    "Macintosh; Intel Mac OS X 10_15_7",
    "Macintosh; Intel Mac OS X 14_5",
    "X11; Linux x86_64",
];

const CHROME_RELEASES: &[&str] = &["126.0.0.0", "127.0.0.0", "128.0.0.0", "129.0.0.0"];

const FIREFOX_RELEASES: &[&str] = &["128.0", "129.0", "130.0"];

/// Pick a desktop browser user agent
///
/// DuckDuckGo serves its lite pages to anything that looks like a browser,
/// so a small rotation of current Chrome and Firefox strings is enough.
pub fn generate_user_agent() -> String {
    let mut rng = rand::thread_rng();
    let platform = DESKTOP_PLATFORMS
        .choose(&mut rng)
        .copied()
        .unwrap_or("X11; Linux x86_64");

    match FIREFOX_RELEASES.choose(&mut rng) {
        Some(release) if rand::random::<u8>() % 3 == 0 => format!(
            "Mozilla/5.0 ({}; rv:{}) Gecko/20100101 Firefox/{}",
            platform, release, release
        ),
        _ => {
            let release = CHROME_RELEASES.choose(&mut rng).copied().unwrap_or("128.0.0.0");
            format!(
                "Mozilla/5.0 ({}) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{} Safari/537.36",
                platform, release
            )
        }
    }
}

pub fn accept_html() -> &'static str {
    "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"
}

pub fn accept_json() -> &'static str {
    "application/json,text/javascript,*/*;q=0.01"
}

/// Accept-Language value preferring `lang`
pub fn accept_language(lang: &str) -> String {
    if lang.is_empty() {
        "en-US,en;q=0.9".to_string()
    } else {
        format!("{},en-US;q=0.8,en;q=0.7", lang)
    }
}
