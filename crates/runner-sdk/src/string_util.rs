/// String helpers shared by the configuration layer.
pub struct StringUtil;

impl StringUtil {
    /// Convert a string to a boolean.
    ///
    /// Valid true values: `"1"`, `"true"`, `"yes"` (case-insensitive).
    /// Valid false values: `"0"`, `"false"`, `"no"` (case-insensitive).
    /// Returns `None` for unrecognized values.
    pub fn convert_to_bool(value: &str) -> Option<bool> {
        match value.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" => Some(true),
            "0" | "false" | "no" => Some(false),
            _ => None,
        }
    }

    /// Build the environment variable name that backs a CLI option:
    /// `("RUNNER_SETUP_INPUT_", "runner-version")` → `RUNNER_SETUP_INPUT_RUNNER_VERSION`.
    pub fn env_key(prefix: &str, option: &str) -> String {
        format!("{}{}", prefix, option.replace('-', "_").to_uppercase())
    }

    /// Strip a single trailing line ending (`\n` or `\r\n`).
    pub fn trim_line_ending(line: &str) -> &str {
        line.trim_end_matches('\n').trim_end_matches('\r')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convert_to_bool_values() {
        assert_eq!(StringUtil::convert_to_bool("TRUE"), Some(true));
        assert_eq!(StringUtil::convert_to_bool("1"), Some(true));
        assert_eq!(StringUtil::convert_to_bool(" yes "), Some(true));
        assert_eq!(StringUtil::convert_to_bool("false"), Some(false));
        assert_eq!(StringUtil::convert_to_bool("0"), Some(false));
        assert_eq!(StringUtil::convert_to_bool(""), None);
        assert_eq!(StringUtil::convert_to_bool("maybe"), None);
    }

    #[test]
    fn env_key_upper_snake() {
        assert_eq!(
            StringUtil::env_key("RUNNER_SETUP_INPUT_", "runner-version"),
            "RUNNER_SETUP_INPUT_RUNNER_VERSION"
        );
        assert_eq!(StringUtil::env_key("X_", "pat"), "X_PAT");
    }

    #[test]
    fn trim_line_ending_variants() {
        assert_eq!(StringUtil::trim_line_ending("abc\n"), "abc");
        assert_eq!(StringUtil::trim_line_ending("abc\r\n"), "abc");
        assert_eq!(StringUtil::trim_line_ending("abc"), "abc");
        assert_eq!(StringUtil::trim_line_ending(" a b "), " a b ");
    }
}
