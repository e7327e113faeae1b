//! Admission control: which programs may run, and with which arguments.

use crate::command::Rejection;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Verdict of [`WhitelistPolicy::admit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    Rejected(Rejection),
}

/// Immutable mapping from command name to the literal arguments it may receive.
///
/// An empty argument set means any non-empty argument is accepted. Names that
/// are not keys of the mapping are always rejected.
///
/// The policy does not look for shell metacharacters: commands are started
/// with a discrete argv and never through a shell, so such characters are
/// ordinary data. The argument sets only narrow what a check may ask for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WhitelistPolicy {
    commands: BTreeMap<String, BTreeSet<String>>,
}

impl WhitelistPolicy {
    /// A policy that admits nothing.
    pub fn empty() -> Self {
        Self {
            commands: BTreeMap::new(),
        }
    }

    pub fn builder() -> WhitelistPolicyBuilder {
        WhitelistPolicyBuilder {
            commands: BTreeMap::new(),
        }
    }

    /// Decide whether `name` may run with `argv`.
    pub fn admit<S: AsRef<str>>(&self, name: &str, argv: &[S]) -> Admission {
        let Some(allowed) = self.commands.get(name) else {
            return Admission::Rejected(Rejection::CommandNotAllowed);
        };
        for arg in argv {
            let arg = arg.as_ref();
            if arg.is_empty() || (!allowed.is_empty() && !allowed.contains(arg)) {
                return Admission::Rejected(Rejection::InvalidArguments);
            }
        }
        Admission::Allowed
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Allowed arguments for `name`; `None` when the command is not whitelisted.
    pub fn allowed_args(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.commands.get(name)
    }

    pub fn command_names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl Default for WhitelistPolicy {
    /// `ls`, `echo` and `cat`, each accepting any argument.
    fn default() -> Self {
        Self::builder()
            .allow_any("ls")
            .allow_any("echo")
            .allow_any("cat")
            .build()
    }
}

/// Incremental construction of a [`WhitelistPolicy`].
#[derive(Debug, Clone)]
pub struct WhitelistPolicyBuilder {
    commands: BTreeMap<String, BTreeSet<String>>,
}

impl WhitelistPolicyBuilder {
    /// Whitelist `name`, restricted to the given literal arguments.
    ///
    /// Calling this again for the same name extends its argument set.
    pub fn allow<I, S>(mut self, name: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.commands
            .entry(name.into())
            .or_default()
            .extend(args.into_iter().map(Into::into));
        self
    }

    /// Whitelist `name` with no restriction on argument values.
    pub fn allow_any(self, name: impl Into<String>) -> Self {
        self.allow(name, std::iter::empty::<String>())
    }

    pub fn build(self) -> WhitelistPolicy {
        WhitelistPolicy {
            commands: self.commands,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ls_policy() -> WhitelistPolicy {
        WhitelistPolicy::builder().allow("ls", ["-l", "-a"]).build()
    }

    #[test]
    fn test_unknown_command_rejected() {
        let policy = WhitelistPolicy::default();
        assert_eq!(
            policy.admit("rm", &["-rf", "/"]),
            Admission::Rejected(Rejection::CommandNotAllowed)
        );
    }

    #[test]
    fn test_default_policy_commands() {
        let policy = WhitelistPolicy::default();
        let names: Vec<&str> = policy.command_names().collect();
        assert_eq!(names, vec!["cat", "echo", "ls"]);
        assert!(policy.allowed_args("echo").unwrap().is_empty());
    }

    #[test]
    fn test_any_argument_for_empty_set() {
        let policy = WhitelistPolicy::default();
        assert_eq!(policy.admit("echo", &["a;b", "|", "$(id)"]), Admission::Allowed);
        assert_eq!(policy.admit::<&str>("echo", &[]), Admission::Allowed);
    }

    #[test]
    fn test_restricted_set() {
        let policy = ls_policy();
        assert_eq!(policy.admit("ls", &["-l"]), Admission::Allowed);
        assert_eq!(policy.admit("ls", &["-a", "-l"]), Admission::Allowed);
        assert_eq!(
            policy.admit("ls", &["-z"]),
            Admission::Rejected(Rejection::InvalidArguments)
        );
        assert_eq!(
            policy.admit("ls", &["-l", "/etc"]),
            Admission::Rejected(Rejection::InvalidArguments)
        );
    }

    #[test]
    fn test_empty_argument_always_rejected() {
        assert_eq!(
            WhitelistPolicy::default().admit("echo", &[""]),
            Admission::Rejected(Rejection::InvalidArguments)
        );
        let policy = WhitelistPolicy::builder().allow("ls", ["", "-l"]).build();
        assert_eq!(
            policy.admit("ls", &[""]),
            Admission::Rejected(Rejection::InvalidArguments)
        );
    }

    #[test]
    fn test_builder_merges_repeated_allow() {
        let policy = WhitelistPolicy::builder()
            .allow("ls", ["-l"])
            .allow("ls", ["-a"])
            .build();
        assert_eq!(policy.allowed_args("ls").unwrap().len(), 2);
        assert_eq!(policy.len(), 1);
    }

    #[test]
    fn test_empty_policy_rejects_everything() {
        let policy = WhitelistPolicy::empty();
        assert!(policy.is_empty());
        assert_eq!(
            policy.admit::<&str>("echo", &[]),
            Admission::Rejected(Rejection::CommandNotAllowed)
        );
    }

    proptest! {
        #[test]
        fn prop_non_member_argument_rejected(arg in "[a-zA-Z0-9_./-]{1,12}") {
            prop_assume!(arg != "-l" && arg != "-a");
            prop_assert_eq!(
                ls_policy().admit("ls", &[arg]),
                Admission::Rejected(Rejection::InvalidArguments)
            );
        }

        #[test]
        fn prop_unlisted_name_rejected(name in "[a-z]{1,10}") {
            prop_assume!(!["ls", "echo", "cat"].contains(&name.as_str()));
            prop_assert_eq!(
                WhitelistPolicy::default().admit::<&str>(&name, &[]),
                Admission::Rejected(Rejection::CommandNotAllowed)
            );
        }
    }
}
