//! Splitting an interpolated command line into a program name and its argv.
//!
//! There is no quoting, escaping or operator syntax here: a command is a
//! sequence of words separated by runs of whitespace. Characters such as `|`,
//! `;` or `$` end up inside ordinary words and are passed through as data.

/// A tokenized command: the program name followed by its literal arguments.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tokens {
    /// Program name. Empty when the input contained no words at all.
    pub name: String,
    pub argv: Vec<String>,
}

impl Tokens {
    /// True when there is no program to run.
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }
}

/// Split `line` on whitespace into a name and an argument vector.
pub fn split_into_tokens(line: &str) -> Tokens {
    let mut words = line.split_whitespace().map(str::to_string);
    match words.next() {
        Some(name) => Tokens {
            name,
            argv: words.collect(),
        },
        None => Tokens::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_and_args() {
        let t = split_into_tokens("ls -l -a");
        assert_eq!(t.name, "ls");
        assert_eq!(t.argv, vec!["-l", "-a"]);
    }

    #[test]
    fn test_collapses_whitespace_runs() {
        let t = split_into_tokens("  echo \t a   \n b ");
        assert_eq!(t.name, "echo");
        assert_eq!(t.argv, vec!["a", "b"]);
    }

    #[test]
    fn test_blank_input_has_no_name() {
        assert!(split_into_tokens("").is_empty());
        assert!(split_into_tokens(" \t\r\n").is_empty());
    }

    #[test]
    fn test_quotes_and_operators_are_plain_text() {
        let t = split_into_tokens("echo \"a b\" | wc;");
        assert_eq!(t.name, "echo");
        assert_eq!(t.argv, vec!["\"a", "b\"", "|", "wc;"]);
    }
}
