/// Replace `${ENV_VAR}` placeholders in raw config text.
///
/// Runs over the file content before parsing, so secrets like database URLs
/// or intel feed tokens can live in the environment instead of on disk.
/// Unresolvable variables are left as-is.
pub fn substitute_env(input: &str) -> String {
    substitute_env_with(input, |name| std::env::var(name).ok())
}

/// Replace `${ENV_VAR}` placeholders using a custom lookup function.
///
/// This is the implementation used by [`substitute_env`]; the separate
/// signature makes it testable without mutating the process environment.
fn substitute_env_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) if end > 0 => {
                let name = &after[..end];
                match lookup(name) {
                    Some(value) => out.push_str(&value),
                    None => {
                        // Leave unresolved placeholders visible.
                        out.push_str("${");
                        out.push_str(name);
                        out.push('}');
                    },
                }
                rest = &after[end + 1..];
            },
            Some(end) => {
                // "${}" names nothing to look up.
                out.push_str("${}");
                rest = &after[end + 1..];
            },
            None => {
                // No closing brace; emit the tail untouched.
                out.push_str(&rest[start..]);
                rest = "";
            },
        }
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_known_var() {
        let lookup = |name: &str| match name {
            "HISTORY_DB" => Some("sqlite:///var/lib/castellan/history.db".to_string()),
            _ => None,
        };
        assert_eq!(
            substitute_env_with("database_url = \"${HISTORY_DB}\"", lookup),
            "database_url = \"sqlite:///var/lib/castellan/history.db\""
        );
    }

    #[test]
    fn resolves_each_placeholder_independently() {
        let lookup = |name: &str| match name {
            "TZ" => Some("America/New_York".to_string()),
            _ => None,
        };
        assert_eq!(
            substitute_env_with("${TZ} and ${FEED_TOKEN}", lookup),
            "America/New_York and ${FEED_TOKEN}"
        );
    }

    #[test]
    fn malformed_placeholders_stay_literal() {
        let lookup = |_: &str| Some("x".to_string());
        assert_eq!(substitute_env_with("${}", lookup), "${}");
        assert_eq!(substitute_env_with("tail ${OPEN", lookup), "tail ${OPEN");
        assert_eq!(substitute_env_with("plain $VAR", lookup), "plain $VAR");
    }

    #[test]
    fn no_placeholders() {
        assert_eq!(substitute_env("weekdays_only = true"), "weekdays_only = true");
    }
}
