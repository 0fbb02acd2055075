use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "dep-report",
    about = "Report where each Go dependency comes from, how current it is, and its license",
    version
)]
pub struct Cli {
    /// Project path containing Gopkg.lock or go.mod
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Product name recorded in the report [default: project directory name]
    #[arg(long, env = "DEP_REPORT_PRODUCT")]
    pub product: Option<String>,

    /// GitHub OAuth token used for every GitHub API request
    #[arg(long, env = "GITHUB_OAUTH_TOKEN", hide_env_values = true)]
    pub github_token: String,

    /// Slack incoming webhook notified when a license cannot be found
    #[arg(long, env = "SLACK_WEBHOOK_URL", hide_env_values = true)]
    pub slack_webhook: Option<String>,

    /// Override config file [default: ./.dep-report/config.toml, fallback ~/.config/dep-report/config.toml]
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Report format
    #[arg(long, default_value = "json", value_name = "FORMAT")]
    pub report: ReportFormat,

    /// Write the report to FILE instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Per-request timeout for provider APIs, in seconds
    #[arg(long, default_value_t = 5, value_name = "SECS")]
    pub timeout: u64,

    /// Debug logging; list every dependency in terminal reports
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Warnings only; one summary line in terminal reports
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    Json,
    Cyclonedx,
    Terminal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["dep-report", "--github-token", "t"]).unwrap();
        assert_eq!(cli.path, PathBuf::from("."));
        assert_eq!(cli.report, ReportFormat::Json);
        assert_eq!(cli.timeout, 5);
        assert!(cli.output.is_none());
    }

    #[test]
    fn test_report_format_and_output() {
        let cli = Cli::try_parse_from([
            "dep-report",
            "proj",
            "--github-token",
            "t",
            "--report",
            "cyclonedx",
            "-o",
            "bom.json",
            "--product",
            "b5",
        ])
        .unwrap();
        assert_eq!(cli.report, ReportFormat::Cyclonedx);
        assert_eq!(cli.output, Some(PathBuf::from("bom.json")));
        assert_eq!(cli.product.as_deref(), Some("b5"));
    }

    #[test]
    fn test_verbose_and_quiet_conflict() {
        assert!(Cli::try_parse_from(["dep-report", "--github-token", "t", "-v", "-q"]).is_err());
    }
}
