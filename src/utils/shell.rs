//! Shell escaping and quoting utilities.

/// Escape a value for use inside single quotes.
/// Replaces `'` with `'\''` (end quote, escaped quote, start quote).
pub fn escape_single_quote_content(value: &str) -> String {
    value.replace('\'', "'\\''")
}

/// Quote a single argument for shell execution.
/// - Empty strings become `''`
/// - Strings with shell metacharacters are wrapped in single quotes
/// - Embedded single quotes are escaped
pub fn quote_arg(arg: &str) -> String {
    if arg.is_empty() {
        return "''".to_string();
    }

    // Characters that require quoting
    const SHELL_META: &[char] = &[
        ' ', '\t', '\n', '\'', '"', '\\', '$', '`', '!', '*', '?', '[', ']', '(', ')', '{', '}',
        '<', '>', '|', '&', ';', '#', '~',
    ];

    if !arg.contains(SHELL_META) {
        return arg.to_string();
    }

    format!("'{}'", escape_single_quote_content(arg))
}

/// Quote and join multiple arguments for shell execution.
pub fn quote_args(args: &[String]) -> String {
    args.iter()
        .map(|a| quote_arg(a))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Escape an entire command string for a nested `sh -c` / `vagrant ssh --` invocation.
/// Wraps the command in single quotes and escapes embedded quotes.
pub fn escape_command_for_shell(command: &str) -> String {
    format!("'{}'", escape_single_quote_content(command))
}

/// Quote a path for shell execution (always quotes).
pub fn quote_path(path: &str) -> String {
    format!("'{}'", escape_single_quote_content(path))
}

/// Build `--flag=value` with the value quoted when needed.
pub fn flag_with_value(flag: &str, value: &str) -> String {
    format!("--{}={}", flag, quote_arg(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_arg_simple() {
        assert_eq!(quote_arg("export"), "export");
        assert_eq!(quote_arg("example.com"), "example.com");
    }

    #[test]
    fn quote_arg_with_spaces() {
        assert_eq!(quote_arg("hello world"), "'hello world'");
    }

    #[test]
    fn quote_arg_url_with_query() {
        assert_eq!(
            quote_arg("https://example.com/?a=1&b=2"),
            "'https://example.com/?a=1&b=2'"
        );
    }

    #[test]
    fn quote_arg_with_single_quote() {
        assert_eq!(quote_arg("it's"), "'it'\\''s'");
    }

    #[test]
    fn quote_arg_empty() {
        assert_eq!(quote_arg(""), "''");
    }

    #[test]
    fn quote_arg_command_substitution_is_neutralized() {
        assert_eq!(quote_arg("$(rm -rf /)"), "'$(rm -rf /)'");
        assert_eq!(quote_arg("`id`"), "'`id`'");
    }

    #[test]
    fn quote_args_mixed() {
        let args = vec!["db".to_string(), "export".to_string(), "a b.sql".to_string()];
        assert_eq!(quote_args(&args), "db export 'a b.sql'");
    }

    #[test]
    fn quote_path_simple() {
        assert_eq!(quote_path("/var/www"), "'/var/www'");
    }

    #[test]
    fn quote_path_with_quote() {
        assert_eq!(quote_path("/var/www/it's"), "'/var/www/it'\\''s'");
    }

    #[test]
    fn escape_command_for_shell_nests_quotes() {
        assert_eq!(
            escape_command_for_shell("cd /srv; wp search-replace 'a' 'b'"),
            "'cd /srv; wp search-replace '\\''a'\\'' '\\''b'\\'''"
        );
    }

    #[test]
    fn flag_with_value_quotes_when_needed() {
        assert_eq!(flag_with_value("url", "example.com"), "--url=example.com");
        assert_eq!(flag_with_value("url", "a b"), "--url='a b'");
    }
}
