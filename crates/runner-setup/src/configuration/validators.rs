// Validation of operator input and configuration values. Everything here
// runs before any network call.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::time::Duration;
use url::Url;

use crate::errors::ValidationError;
use crate::secret::Credential;

static REPOSITORY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z0-9._-]+)/([A-Za-z0-9._-]+)$").expect("static regex"));

const MAX_RUNNER_NAME_LENGTH: usize = 64;

/// Platforms with a published `tar.gz` runner package.
const PACKAGE_PLATFORMS: &[&str] = &["linux-x64", "linux-arm", "linux-arm64", "osx-x64", "osx-arm64"];

/// A repository reference, `owner/name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryRef {
    owner: String,
    name: String,
}

impl RepositoryRef {
    /// Parse `owner/name`: exactly one `/` between two segments drawn from
    /// `[A-Za-z0-9._-]`, neither of which may be `.` or `..`.
    pub fn parse(repo: &str) -> Result<Self, ValidationError> {
        let malformed = || ValidationError::MalformedRepository(repo.to_string());
        let captures = REPOSITORY_PATTERN.captures(repo).ok_or_else(malformed)?;
        if [&captures[1], &captures[2]]
            .iter()
            .any(|segment| matches!(*segment, "." | ".."))
        {
            return Err(malformed());
        }

        Ok(Self {
            owner: captures[1].to_string(),
            name: captures[2].to_string(),
        })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The repository's web URL on the forge, passed to `config.sh --url`.
    pub fn web_url(&self, github_url: &Url) -> String {
        let mut url = github_url.clone();
        url.set_query(None);
        url.set_fragment(None);
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend([self.owner(), self.name()]);
        }
        url.to_string()
    }
}

impl fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Validate the operator's input.
///
/// Checked in order: repository present, credential present, repository shape.
pub fn validate(repo: &str, credential: &Credential) -> Result<(), ValidationError> {
    if repo.is_empty() {
        return Err(ValidationError::MissingRepository);
    }
    if credential.is_empty() {
        return Err(ValidationError::MissingCredential);
    }
    RepositoryRef::parse(repo).map(|_| ())
}

/// Validate an http(s) URL with a host.
pub fn validate_url(url_str: &str) -> Result<Url, ValidationError> {
    let invalid = |reason: String| ValidationError::InvalidUrl {
        url: url_str.to_string(),
        reason,
    };

    if url_str.is_empty() {
        return Err(invalid("URL cannot be empty".to_string()));
    }

    let url = Url::parse(url_str).map_err(|e| invalid(e.to_string()))?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(invalid(format!(
                "URL must use HTTP or HTTPS scheme, got '{}'",
                scheme
            )))
        }
    }

    if url.host_str().is_none() {
        return Err(invalid("URL must have a host".to_string()));
    }

    Ok(url)
}

/// Validate a runner name.
///
/// The name must be non-empty, at most 64 characters, and contain only ASCII
/// letters, digits, hyphens, underscores and periods.
pub fn validate_runner_name(name: &str) -> Result<(), ValidationError> {
    let invalid = |reason: String| ValidationError::InvalidRunnerName {
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(invalid("runner name cannot be empty".to_string()));
    }

    let length = name.chars().count();
    if length > MAX_RUNNER_NAME_LENGTH {
        return Err(invalid(format!(
            "must be at most {} characters (got {})",
            MAX_RUNNER_NAME_LENGTH, length
        )));
    }

    let is_valid = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');
    if !is_valid {
        return Err(invalid(
            "only letters, digits, hyphens, underscores, and periods are allowed".to_string(),
        ));
    }

    Ok(())
}

/// Validate a SHA-256 hex digest; returns it lower-cased.
pub fn validate_sha256(digest: &str) -> Result<String, ValidationError> {
    let digest = digest.trim();
    if digest.len() == 64 && digest.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(digest.to_ascii_lowercase())
    } else {
        Err(ValidationError::InvalidChecksum(digest.to_string()))
    }
}

/// Validate the archive platform, e.g. `linux-x64`.
pub fn validate_platform(platform: &str) -> Result<(), ValidationError> {
    if PACKAGE_PLATFORMS.contains(&platform) {
        Ok(())
    } else {
        Err(ValidationError::UnsupportedPlatform(platform.to_string()))
    }
}

/// Validate a timeout given in whole seconds.
pub fn validate_timeout(seconds: &str) -> Result<Duration, ValidationError> {
    match seconds.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ValidationError::InvalidTimeout(seconds.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential(value: &str) -> Credential {
        Credential::new(value)
    }

    #[test]
    fn test_missing_inputs() {
        assert_eq!(
            validate("", &credential("ghp_x")),
            Err(ValidationError::MissingRepository)
        );
        assert_eq!(
            validate("acme/widgets", &credential("")),
            Err(ValidationError::MissingCredential)
        );
        // Repository emptiness is reported first.
        assert_eq!(validate("", &credential("")), Err(ValidationError::MissingRepository));
    }

    #[test]
    fn test_well_formed_repositories() {
        for repo in ["acme/widgets", "a/b", "my-org/my.repo_1", "Octo-Cat/hello-world"] {
            assert_eq!(validate(repo, &credential("ghp_x")), Ok(()), "{repo}");
        }
    }

    #[test]
    fn test_malformed_repositories() {
        for repo in [
            "acme",
            "/widgets",
            "acme/",
            "a/b/c",
            "acme /widgets",
            "acme/wid gets",
            "acme/\twidgets",
            "acme/widgets#x",
            "acme/w?x=1",
            "acme/w%2fx",
            "acme/..",
            "../widgets",
            "acme/.",
        ] {
            assert_eq!(
                validate(repo, &credential("ghp_x")),
                Err(ValidationError::MalformedRepository(repo.to_string())),
                "{repo}"
            );
        }
    }

    #[test]
    fn test_repository_ref_parts() {
        let repo = RepositoryRef::parse("acme/widgets").unwrap();
        assert_eq!(repo.owner(), "acme");
        assert_eq!(repo.name(), "widgets");
        assert_eq!(repo.to_string(), "acme/widgets");

        let github = Url::parse("https://github.com").unwrap();
        assert_eq!(repo.web_url(&github), "https://github.com/acme/widgets");
    }

    #[test]
    fn test_web_url_appends_path_segments() {
        let repo = RepositoryRef::parse("acme/widgets").unwrap();

        let enterprise = Url::parse("https://git.example.com/").unwrap();
        assert_eq!(repo.web_url(&enterprise), "https://git.example.com/acme/widgets");

        let prefixed = Url::parse("https://git.example.com/forge/?tab=1#top").unwrap();
        assert_eq!(repo.web_url(&prefixed), "https://git.example.com/forge/acme/widgets");

        let dotted = RepositoryRef::parse("my.org/.github").unwrap();
        assert_eq!(
            dotted.web_url(&Url::parse("https://github.com").unwrap()),
            "https://github.com/my.org/.github"
        );
    }

    #[test]
    fn test_valid_url() {
        assert!(validate_url("https://github.com/owner/repo").is_ok());
        assert!(validate_url("http://github.example.com").is_ok());
    }

    #[test]
    fn test_invalid_url() {
        assert!(validate_url("").is_err());
        assert!(validate_url("not-a-url").is_err());
        assert!(validate_url("ftp://github.com").is_err());
    }

    #[test]
    fn test_runner_names() {
        assert!(validate_runner_name("my-runner").is_ok());
        assert!(validate_runner_name("runner_01.prod").is_ok());
        assert!(validate_runner_name("").is_err());
        assert!(validate_runner_name(&"a".repeat(65)).is_err());
        assert!(validate_runner_name(&"a".repeat(64)).is_ok());
        assert!(validate_runner_name("runner name").is_err());
        assert!(validate_runner_name("runner@host").is_err());
    }

    #[test]
    fn test_sha256_and_timeout() {
        let digest = "AB".repeat(32);
        assert_eq!(validate_sha256(&digest).unwrap(), "ab".repeat(32));
        assert!(validate_sha256("abc").is_err());
        assert!(validate_sha256(&"zz".repeat(32)).is_err());

        assert_eq!(validate_timeout("15").unwrap(), Duration::from_secs(15));
        assert!(validate_timeout("0").is_err());
        assert!(validate_timeout("soon").is_err());
    }

    #[test]
    fn test_platforms() {
        for platform in ["linux-x64", "linux-arm64", "osx-arm64"] {
            assert_eq!(validate_platform(platform), Ok(()), "{platform}");
        }
        for platform in ["win-x64", "linux-x86", "linux", ""] {
            assert_eq!(
                validate_platform(platform),
                Err(ValidationError::UnsupportedPlatform(platform.to_string())),
                "{platform}"
            );
        }
    }
}
