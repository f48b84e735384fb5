use serde::{Deserialize, Serialize};
use std::fmt;

/// An ordered list of tokens submitted for execution.
///
/// Matchstrings are tested against [`Command::serialized`], so a command built
/// from a single string and one built from the equivalent tokens resolve the
/// same way.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Command(Vec<String>);

impl Command {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(tokens.into_iter().map(Into::into).collect())
    }

    /// Split a command line into tokens with shell quoting rules.
    ///
    /// Unbalanced quotes fall back to a plain whitespace split rather than
    /// refusing the command.
    pub fn parse(line: &str) -> Self {
        match shell_words::split(line) {
            Ok(tokens) => Self(tokens),
            Err(_) => Self::new(line.split_whitespace()),
        }
    }

    /// This command with `args` appended.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn tokens(&self) -> &[String] {
        &self.0
    }

    pub fn program(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub fn args(&self) -> &[String] {
        self.0.get(1..).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Tokens joined by single spaces.
    pub fn serialized(&self) -> String {
        self.0.join(" ")
    }

    /// Value of an option given before the first operand, as `--flag value`,
    /// `--flag=value`, `-f value` or `-fvalue`.
    ///
    /// Scanning stops at the first operand (or `--`): anything after it
    /// belongs to the program being launched. Options other than the one
    /// asked for are assumed to take a value unless listed in `switches`.
    pub fn option_value(
        &self,
        long: &str,
        short: Option<&str>,
        switches: &[&str],
    ) -> Option<&str> {
        let prefix = format!("{}=", long);
        let mut tokens = self.args().iter();
        while let Some(token) = tokens.next() {
            if token == "--" || token == "-" || !token.starts_with('-') {
                return None;
            }
            if let Some(value) = token.strip_prefix(&prefix) {
                return Some(value);
            }
            if token == long || short.is_some_and(|s| token == s) {
                return tokens.next().map(String::as_str);
            }
            if let Some(attached) = short
                .filter(|_| !token.starts_with("--"))
                .and_then(|s| token.strip_prefix(s))
            {
                return Some(attached);
            }
            let takes_value = !token.contains('=')
                && !switches.contains(&token.as_str())
                && (token.starts_with("--") || token.len() == 2);
            if takes_value {
                tokens.next();
            }
        }
        None
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.serialized())
    }
}

impl From<&str> for Command {
    fn from(line: &str) -> Self {
        Self::parse(line)
    }
}

impl From<Vec<String>> for Command {
    fn from(tokens: Vec<String>) -> Self {
        Self(tokens)
    }
}

impl From<&[&str]> for Command {
    fn from(tokens: &[&str]) -> Self {
        Self::new(tokens.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_respects_quotes() {
        let cmd = Command::parse("echo 'hello world'");
        assert_eq!(cmd.tokens(), ["echo", "hello world"]);
        assert_eq!(cmd.program(), Some("echo"));
    }

    #[test]
    fn parse_unbalanced_quotes_falls_back() {
        let cmd = Command::parse("echo 'oops");
        assert_eq!(cmd.tokens(), ["echo", "'oops"]);
    }

    #[test]
    fn option_value_forms() {
        let cmd = Command::parse("sbatch --output=out.log -e err.log --time 10 job.sh");
        assert_eq!(cmd.option_value("--output", Some("-o"), &[]), Some("out.log"));
        assert_eq!(cmd.option_value("--error", Some("-e"), &[]), Some("err.log"));
        assert_eq!(cmd.option_value("--time", None, &[]), Some("10"));
        assert_eq!(cmd.option_value("--partition", Some("-p"), &[]), None);
    }

    #[test]
    fn option_value_attached_short_form() {
        let cmd = Command::parse("sbatch -ologs/out.txt -N2 job.sh");
        assert_eq!(
            cmd.option_value("--output", Some("-o"), &[]),
            Some("logs/out.txt")
        );
        assert_eq!(cmd.option_value("--nodes", Some("-N"), &[]), Some("2"));
    }

    #[test]
    fn option_value_stops_at_first_operand() {
        let cmd = Command::parse("sbatch --time 10 job.sh -o results.csv");
        assert_eq!(cmd.option_value("--output", Some("-o"), &[]), None);

        let cmd = Command::parse("sbatch --parsable job.sh --output=results.csv");
        assert_eq!(cmd.option_value("--output", Some("-o"), &["--parsable"]), None);

        let cmd = Command::parse("sbatch -- -o results.csv");
        assert_eq!(cmd.option_value("--output", Some("-o"), &[]), None);
    }

    #[test]
    fn switches_do_not_swallow_the_next_option() {
        let cmd = Command::parse("sbatch --parsable -o out.log job.sh");
        assert_eq!(
            cmd.option_value("--output", Some("-o"), &["--parsable"]),
            Some("out.log")
        );
    }

    #[test]
    fn empty_args() {
        let cmd = Command::new(["ls"]);
        assert!(cmd.args().is_empty());
        assert!(Command::default().is_empty());
    }
}
