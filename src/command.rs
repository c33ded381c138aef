//! Command parser.
//!
//! Offline mode splits a command line into an argv for direct `exec`;
//! online mode hands the whole line to a shell so pipes/redirections in
//! arriving commands behave the way a user typing them at a shell expects.

use crate::error::SchedulerError;

/// Split `cmd` into an argument vector for direct execution.
///
/// Fails with [`SchedulerError::EmptyCommand`] if the line has no tokens.
pub fn parse_offline(cmd: &str) -> Result<Vec<String>, SchedulerError> {
    let tokens: Vec<String> = cmd.split_whitespace().map(str::to_string).collect();
    if tokens.is_empty() {
        return Err(SchedulerError::EmptyCommand);
    }
    Ok(tokens)
}

/// Build the argv that runs `cmd` through a shell, for online-mode arrivals.
pub fn command_for_online(cmd: &str) -> Vec<String> {
    vec!["/bin/sh".to_string(), "-c".to_string(), cmd.to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_whitespace() {
        let argv = parse_offline("/bin/echo Hello World").unwrap();
        assert_eq!(argv, vec!["/bin/echo", "Hello", "World"]);
    }

    #[test]
    fn collapses_repeated_whitespace() {
        let argv = parse_offline("  /bin/echo   A  ").unwrap();
        assert_eq!(argv, vec!["/bin/echo", "A"]);
    }

    #[test]
    fn empty_command_errors() {
        assert!(matches!(
            parse_offline("   "),
            Err(SchedulerError::EmptyCommand)
        ));
        assert!(matches!(parse_offline(""), Err(SchedulerError::EmptyCommand)));
    }

    #[test]
    fn online_wraps_in_shell() {
        let argv = command_for_online("echo A | cat");
        assert_eq!(argv, vec!["/bin/sh", "-c", "echo A | cat"]);
    }
}
