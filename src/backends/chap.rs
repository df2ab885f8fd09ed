//! Session CHAP credentials
//!
//! Credentials for session-level CHAP authentication live in a
//! line-oriented `key=value` file with four recognized keys. The file is
//! loaded fresh on every provision call that requests session CHAP, so a
//! rotated secret takes effect without a restart.

use crate::error::Result;
use std::path::Path;

/// Credentials for session-level CHAP authentication
///
/// The inbound pair authenticates the initiator to the target, the
/// outbound pair the target to the initiator. Keys absent from the file
/// leave the matching field empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChapSessionCredentials {
    pub in_user: String,
    pub in_password: String,
    pub out_user: String,
    pub out_password: String,
}

impl ChapSessionCredentials {
    /// Load credentials from the file at `path`.
    pub async fn load(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path).await?;
        Ok(Self::parse(&text))
    }

    fn parse(text: &str) -> Self {
        let mut credentials = Self::default();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.trim().to_string();
            match key.trim() {
                "node.session.auth.username" => credentials.in_user = value,
                "node.session.auth.password" => credentials.in_password = value,
                "node.session.auth.username_in" => credentials.out_user = value,
                "node.session.auth.password_in" => credentials.out_password = value,
                _ => {}
            }
        }
        credentials
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use assert_matches::assert_matches;
    use std::io::Write;

    #[test]
    fn test_parse_all_keys() {
        let credentials = ChapSessionCredentials::parse(
            "node.session.auth.username=initiator-user\n\
             node.session.auth.password=initiator-pass\n\
             node.session.auth.username_in=target-user\n\
             node.session.auth.password_in=target-pass\n",
        );
        assert_eq!(credentials.in_user, "initiator-user");
        assert_eq!(credentials.in_password, "initiator-pass");
        assert_eq!(credentials.out_user, "target-user");
        assert_eq!(credentials.out_password, "target-pass");
    }

    #[test]
    fn test_parse_ignores_comments_and_unknown_keys() {
        let credentials = ChapSessionCredentials::parse(
            "# session credentials\n\
             ! legacy comment style\n\
             \n\
             node.session.auth.username = spaced-user\n\
             node.discovery.auth.username=ignored\n\
             not a property line\n",
        );
        assert_eq!(credentials.in_user, "spaced-user");
        assert_eq!(credentials.in_password, "");
        assert_eq!(credentials.out_user, "");
        assert_eq!(credentials.out_password, "");
    }

    #[test]
    fn test_parse_missing_keys_default_empty() {
        let credentials = ChapSessionCredentials::parse("node.session.auth.username=only-user\n");
        assert_eq!(credentials.in_user, "only-user");
        assert_eq!(credentials.out_password, "");
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "node.session.auth.username=u1").unwrap();
        writeln!(file, "node.session.auth.password_in=p2").unwrap();

        let credentials = ChapSessionCredentials::load(file.path()).await.unwrap();
        assert_eq!(credentials.in_user, "u1");
        assert_eq!(credentials.out_password, "p2");
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let err = ChapSessionCredentials::load(Path::new("/nonexistent/chap.properties"))
            .await
            .unwrap_err();
        assert_matches!(err, Error::Io(_));
    }
}
