use std::env;

/// Initializes tracing using the provided log level as the default filter.
///
/// `RUST_LOG` takes precedence when set. Safe to call more than once; later
/// calls leave the first subscriber in place.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("storefront_checkout={},reqwest=warn", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let builder = fmt()
        .with_env_filter(EnvFilter::new(filter_directive))
        .with_target(false);

    if json {
        let _ = builder.json().try_init();
    } else {
        let _ = builder.try_init();
    }
}

/// Masks a credential for log output, keeping only the last four characters.
pub fn redact(value: &str) -> String {
    let visible: String = value
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    if value.chars().count() <= 4 {
        "****".to_string()
    } else {
        format!("****{}", visible)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redact_keeps_last_four() {
        assert_eq!(redact("tok_prod_1234abcd"), "****abcd");
    }

    #[test]
    fn redact_hides_short_values_entirely() {
        assert_eq!(redact("abc"), "****");
        assert_eq!(redact(""), "****");
    }

    #[test]
    fn init_twice_does_not_panic() {
        init_tracing("debug", false);
        init_tracing("info", true);
    }
}
