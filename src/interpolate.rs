//! Positional placeholder substitution for command templates.

use regex::Regex;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\d+").expect("placeholder pattern is valid"));

/// Substitute `$1`, `$2`, ... in `template` with the matching positional argument.
///
/// Substitution runs in ascending index order, one plain replace-all per argument.
/// Placeholders whose index exceeds `args.len()` are left in the output as written.
///
/// ```
/// use lesson_check::interpolate;
/// assert_eq!(interpolate("echo $1 $2", &["a", "b"]), "echo a b");
/// assert_eq!(interpolate("echo $1 $2", &["a"]), "echo a $2");
/// ```
pub fn interpolate<S: AsRef<str>>(template: &str, args: &[S]) -> String {
    let mut out = template.to_string();
    for (i, arg) in args.iter().enumerate() {
        let token = format!("${}", i + 1);
        out = out.replace(&token, arg.as_ref());
    }
    out
}

/// List the `$N` tokens still present in an interpolated command, in order of appearance.
pub fn unresolved_placeholders(command: &str) -> Vec<String> {
    PLACEHOLDER
        .find_iter(command)
        .map(|m| m.as_str().to_string())
        .collect()
}
