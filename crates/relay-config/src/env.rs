use std::sync::OnceLock;

use anyhow::bail;
use regex::{Captures, Regex};

/// `{{ env.VAR }}` or `{{ env.VAR | default("fallback") }}`
fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"\{\{\s*([a-zA-Z0-9_.]+)\s*(?:\|\s*default\("([^"]*)"\))?\s*\}\}"#)
            .expect("placeholder pattern is valid")
    })
}

/// Expand environment placeholders in raw TOML text
///
/// Comment lines pass through untouched so a commented-out provider does not
/// demand its variable.
pub(crate) fn expand_env(input: &str) -> anyhow::Result<String> {
    let mut output = String::with_capacity(input.len());

    for (i, line) in input.lines().enumerate() {
        if i > 0 {
            output.push('\n');
        }

        if line.trim_start().starts_with('#') {
            output.push_str(line);
        } else {
            output.push_str(&expand_line(line)?);
        }
    }

    if input.ends_with('\n') {
        output.push('\n');
    }

    Ok(output)
}

fn expand_line(line: &str) -> anyhow::Result<String> {
    let mut result = String::with_capacity(line.len());
    let mut last_end = 0;

    for captures in placeholder().captures_iter(line) {
        let Some(whole) = captures.get(0) else {
            continue;
        };

        result.push_str(&line[last_end..whole.start()]);
        result.push_str(&resolve(&captures)?);
        last_end = whole.end();
    }

    result.push_str(&line[last_end..]);
    Ok(result)
}

fn resolve(captures: &Captures<'_>) -> anyhow::Result<String> {
    let key = captures.get(1).map_or("", |m| m.as_str());
    let default = captures.get(2).map(|m| m.as_str());

    let Some(var) = key.strip_prefix("env.").filter(|var| !var.contains('.')) else {
        bail!("only variables scoped with 'env.' are supported: `{key}`");
    };

    match (std::env::var(var), default) {
        (Ok(value), _) => Ok(value),
        (Err(_), Some(default)) => Ok(default.to_owned()),
        (Err(_), None) => bail!("environment variable not found: `{var}`"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_without_placeholders_is_unchanged() {
        let input = "[providers.openai]\napi_key = \"sk-plain\"\n";
        assert_eq!(expand_env(input).unwrap(), input);
    }

    #[test]
    fn expands_provider_keys() {
        let vars = [("RELAY_TEST_OPENAI", Some("sk-1")), ("RELAY_TEST_MISTRAL", Some("ms-2"))];
        temp_env::with_vars(vars, || {
            let result =
                expand_env("a = \"{{ env.RELAY_TEST_OPENAI }}\"\nb = \"{{env.RELAY_TEST_MISTRAL}}\"").unwrap();
            assert_eq!(result, "a = \"sk-1\"\nb = \"ms-2\"");
        });
    }

    #[test]
    fn two_placeholders_on_one_line() {
        let vars = [("RELAY_TEST_HOST", Some("localhost")), ("RELAY_TEST_PORT", Some("8080"))];
        temp_env::with_vars(vars, || {
            let result = expand_env("base_url = \"http://{{ env.RELAY_TEST_HOST }}:{{ env.RELAY_TEST_PORT }}\"").unwrap();
            assert_eq!(result, "base_url = \"http://localhost:8080\"");
        });
    }

    #[test]
    fn missing_variable_names_the_variable() {
        temp_env::with_var_unset("RELAY_TEST_MISSING", || {
            let err = expand_env("api_key = \"{{ env.RELAY_TEST_MISSING }}\"").unwrap_err();
            assert!(err.to_string().contains("RELAY_TEST_MISSING"));
        });
    }

    #[test]
    fn only_env_scope_is_supported() {
        let err = expand_env("api_key = \"{{ vault.OPENAI }}\"").unwrap_err();
        assert!(err.to_string().contains("only variables scoped with 'env.'"));

        let err = expand_env("api_key = \"{{ env.A.B }}\"").unwrap_err();
        assert!(err.to_string().contains("env.A.B"));
    }

    #[test]
    fn comment_lines_are_not_expanded() {
        temp_env::with_var_unset("RELAY_TEST_MISSING", || {
            let input = "  # api_key = \"{{ env.RELAY_TEST_MISSING }}\"";
            assert_eq!(expand_env(input).unwrap(), input);
        });
    }

    #[test]
    fn default_applies_only_when_unset() {
        temp_env::with_var_unset("RELAY_TEST_TITLE", || {
            let result = expand_env("title = \"{{ env.RELAY_TEST_TITLE | default(\"relay\") }}\"").unwrap();
            assert_eq!(result, "title = \"relay\"");
        });

        temp_env::with_var("RELAY_TEST_TITLE", Some("custom"), || {
            let result = expand_env("title = \"{{ env.RELAY_TEST_TITLE | default(\"relay\") }}\"").unwrap();
            assert_eq!(result, "title = \"custom\"");
        });
    }

    #[test]
    fn empty_default_is_allowed() {
        temp_env::with_var_unset("RELAY_TEST_REFERER", || {
            let result = expand_env("referer = \"{{ env.RELAY_TEST_REFERER | default(\"\") }}\"").unwrap();
            assert_eq!(result, "referer = \"\"");
        });
    }
}
