//! Command-line surface
//!
//! The flag set is a compatibility contract with the callers, so the flags
//! stay terse single letters.

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "checkpass", about = "Privilege-separated password checker")]
pub struct Cli {
    /// Identity of the calling application
    #[arg(short = 'c', value_name = "CALLER")]
    pub caller: Option<String>,

    /// Authentication method name
    #[arg(short = 'm', value_name = "METHOD")]
    pub method: Option<String>,

    /// Authenticate this user instead of the invoking user
    #[arg(short = 'U', value_name = "USER")]
    pub username: Option<String>,

    /// Run in binary server mode over this already-open descriptor
    #[arg(short = 'S', value_name = "FD")]
    pub server_fd: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_flags_parse() {
        let cli =
            Cli::try_parse_from(["checkpass", "-c", "screenlock", "-m", "classic", "-U", "bob", "-S", "5"])
                .unwrap();
        assert_eq!(cli.caller.as_deref(), Some("screenlock"));
        assert_eq!(cli.method.as_deref(), Some("classic"));
        assert_eq!(cli.username.as_deref(), Some("bob"));
        assert_eq!(cli.server_fd, Some(5));
    }

    #[test]
    fn test_bare_invocation_parses() {
        let cli = Cli::try_parse_from(["checkpass"]).unwrap();
        assert!(cli.caller.is_none());
        assert!(cli.method.is_none());
        assert!(cli.username.is_none());
        assert!(cli.server_fd.is_none());
    }
}
