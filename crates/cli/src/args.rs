//! Command-line and environment configuration.
//!
//! Every option has a long flag and an environment variable; the flag wins.

use std::path::PathBuf;
use std::time::Duration;

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser, ValueEnum};
use compliance::{
    ArtifactPath, AuditConfig, AuditError, OrganizationName, TemplateName, DEFAULT_CLOSE_TEMPLATE,
    DEFAULT_CONFIG_FILENAME, DEFAULT_OPEN_TEMPLATE, DEFAULT_TEMPLATES_DIR, DEFAULT_TRACKING_TITLE,
};
use github::{GitHubClientConfig, DEFAULT_API_URL};

/// Output format of log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Audits `.pre-commit-config.yaml` across a GitHub organisation and keeps one
/// tracking issue open per non-compliant repository.
#[derive(Debug, Parser)]
#[command(name = "pre-commit-audit", version, about)]
pub struct Cli {
    /// GitHub token. `GITHUB_TOKEN` is used when neither this nor `PAT` is set.
    #[arg(long, env = "PAT", hide_env_values = true)]
    pub token: Option<String>,

    /// Organisation to audit.
    #[arg(long, env = "ORG")]
    pub org: Option<String>,

    /// Exact title of tracking issues.
    #[arg(long, env = "MISSING_ISSUE_TITLE", default_value = DEFAULT_TRACKING_TITLE)]
    pub issue_title: String,

    /// Path of the pre-commit configuration inside each repository.
    #[arg(long, env = "PRE_COMMIT_CONFIG_FILE", default_value = DEFAULT_CONFIG_FILENAME)]
    pub config_file: String,

    /// Template for new tracking issue bodies.
    #[arg(long, env = "OPEN_ISSUE_TEMPLATE", default_value = DEFAULT_OPEN_TEMPLATE)]
    pub open_template: String,

    /// Template for the comment left when closing tracking issues.
    #[arg(long, env = "CLOSE_ISSUE_TEMPLATE", default_value = DEFAULT_CLOSE_TEMPLATE)]
    pub close_template: String,

    #[arg(long, env = "TEMPLATES_DIR", default_value = DEFAULT_TEMPLATES_DIR)]
    pub templates_dir: PathBuf,

    /// Log intended writes without sending them.
    #[arg(
        long,
        env = "DRY_RUN",
        default_value_t = true,
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    pub dry_run: bool,

    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Minimum seconds between the start of consecutive repository checks.
    #[arg(long, env = "DELAY_SECS", default_value_t = 3)]
    pub delay_secs: u64,

    /// Repositories reconciled at once.
    #[arg(long, env = "CONCURRENCY", default_value_t = 1)]
    pub concurrency: usize,

    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// Retries for read requests. Writes are never retried.
    #[arg(long, env = "MAX_RETRIES", default_value_t = 3)]
    pub max_retries: u32,

    /// Default log filter; `RUST_LOG` overrides it.
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Print the scan report as JSON on stdout.
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Resolves the credential, falling back to `fallback` (the value of
    /// `GITHUB_TOKEN`). Blank values count as absent.
    pub fn token(&self, fallback: Option<String>) -> Result<String, AuditError> {
        self.token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| fallback.filter(|t| !t.trim().is_empty()))
            .ok_or(AuditError::MissingCredential)
    }

    pub fn audit_config(&self) -> Result<AuditConfig, AuditError> {
        let org = self
            .org
            .as_deref()
            .map(str::trim)
            .filter(|org| !org.is_empty())
            .ok_or(AuditError::MissingOrganization)?;
        let organization = OrganizationName::new(org).ok_or_else(|| invalid("organisation", org))?;
        let config_path = ArtifactPath::new(self.config_file.as_str())
            .ok_or_else(|| invalid("config file", &self.config_file))?;
        let open = TemplateName::new(self.open_template.as_str())
            .ok_or_else(|| invalid("open template", &self.open_template))?;
        let close = TemplateName::new(self.close_template.as_str())
            .ok_or_else(|| invalid("close template", &self.close_template))?;

        let config = AuditConfig::new(organization)
            .with_tracking_title(self.issue_title.clone())
            .with_config_path(config_path)
            .with_templates(open, close)
            .with_templates_dir(self.templates_dir.clone())
            .with_dry_run(self.dry_run)
            .with_delay(Duration::from_secs(self.delay_secs))
            .with_concurrency(self.concurrency);
        config.validate()?;
        Ok(config)
    }

    pub fn client_config(&self, token: String) -> GitHubClientConfig {
        GitHubClientConfig::new(token)
            .with_api_base_url(self.api_url.clone())
            .with_timeout(Duration::from_secs(self.request_timeout_secs))
            .with_max_retries(self.max_retries)
    }
}

fn invalid(what: &str, value: &str) -> AuditError {
    AuditError::ConfigurationError {
        message: format!("invalid {what}: {value:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["pre-commit-audit"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_build_the_audit_config() {
        let cli = parse(&[
            "--org",
            "acme",
            "--issue-title",
            "Add pre-commit",
            "--config-file",
            ".github/.pre-commit-config.yaml",
            "--dry-run",
            "false",
            "--delay-secs",
            "0",
            "--concurrency",
            "4",
        ]);

        let config = cli.audit_config().unwrap();
        assert_eq!(config.organization.as_str(), "acme");
        assert_eq!(config.tracking_title, "Add pre-commit");
        assert_eq!(config.config_path.as_str(), ".github/.pre-commit-config.yaml");
        assert!(!config.dry_run);
        assert_eq!(config.delay, Duration::ZERO);
        assert_eq!(config.concurrency, 4);
    }

    #[test]
    fn dry_run_accepts_boolish_values() {
        assert!(!parse(&["--org", "acme", "--dry-run", "no"]).dry_run);
        assert!(parse(&["--org", "acme", "--dry-run", "yes"]).dry_run);
    }

    #[test]
    fn blank_organisation_is_missing() {
        let cli = parse(&["--org", "  "]);
        assert!(matches!(cli.audit_config(), Err(AuditError::MissingOrganization)));
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let cli = parse(&["--org", "acme", "--concurrency", "0"]);
        assert!(matches!(
            cli.audit_config(),
            Err(AuditError::ConfigurationError { .. })
        ));
    }

    #[test]
    fn extreme_delay_is_a_configuration_error() {
        let cli = parse(&["--org", "acme", "--delay-secs", "18446744073709551615"]);
        assert!(matches!(
            cli.audit_config(),
            Err(AuditError::ConfigurationError { .. })
        ));
    }

    #[test]
    fn explicit_token_wins_over_fallback() {
        let cli = parse(&["--token", "ghp_primary"]);
        assert_eq!(cli.token(Some("ghp_fallback".into())).unwrap(), "ghp_primary");
    }

    #[test]
    fn blank_token_uses_fallback() {
        let cli = parse(&["--token", " "]);
        assert_eq!(cli.token(Some("ghp_fallback".into())).unwrap(), "ghp_fallback");
        assert!(matches!(cli.token(None), Err(AuditError::MissingCredential)));
    }

    #[test]
    fn client_config_carries_timeouts_and_retries() {
        let cli = parse(&[
            "--api-url",
            "https://ghe.example.com/api/v3",
            "--request-timeout-secs",
            "5",
            "--max-retries",
            "0",
        ]);
        let config = cli.client_config("ghp_x".into());
        assert_eq!(config.api_base_url, "https://ghe.example.com/api/v3");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.max_retries, 0);
    }
}
