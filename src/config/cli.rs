use crate::adapters::mailchimp::{MailchimpConnector, DEFAULT_TIMEOUT_SECS};
use crate::domain::model::{Order, OrderStatusChange};
use crate::utils::error::{Result, SyncError};
use crate::utils::validation::{validate_range, validate_url, Validate};
use clap::{Args, Parser, Subcommand};
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "purchase-tagger")]
#[command(about = "Tag email-marketing contacts based on purchased products")]
pub struct CliConfig {
    #[command(subcommand)]
    pub command: Command,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON lines")]
    pub json_logs: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Sync one order's tags to its customer's audience member
    Sync(SyncArgs),
    /// Check the API key and list the available audiences
    Verify(VerifyArgs),
}

#[derive(Debug, Clone, Args)]
pub struct ConnectionArgs {
    #[arg(long, help = "Override the API base URL derived from the key")]
    pub api_base_url: Option<String>,

    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,
}

impl ConnectionArgs {
    pub fn connector(&self) -> Result<MailchimpConnector> {
        let connector = MailchimpConnector::new().with_timeout_secs(self.timeout)?;
        Ok(match &self.api_base_url {
            Some(url) => connector.with_base_url(url.clone()),
            None => connector,
        })
    }
}

impl Validate for ConnectionArgs {
    fn validate(&self) -> Result<()> {
        if let Some(url) = &self.api_base_url {
            validate_url("api_base_url", url)?;
        }
        validate_range("timeout", self.timeout, 1, 300)
    }
}

#[derive(Debug, Clone, Args)]
pub struct SyncArgs {
    #[arg(long, default_value = "settings.toml")]
    pub settings: PathBuf,

    #[arg(long, help = "TOML file with [products] and [variations] tag tables")]
    pub tags: Option<PathBuf>,

    #[arg(long, help = "Order JSON file")]
    pub order: PathBuf,

    #[arg(long, help = "Previous status (defaults to the order's previous_status)")]
    pub from: Option<String>,

    #[arg(long, help = "New status (defaults to the order's status)")]
    pub to: Option<String>,

    #[arg(long, help = "Order meta key holding the subscriber first name")]
    pub first_name_meta: Option<String>,

    #[arg(long, help = "Order meta key holding the subscriber last name")]
    pub last_name_meta: Option<String>,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

impl SyncArgs {
    pub fn load_order(&self) -> Result<Order> {
        let content = std::fs::read_to_string(&self.order)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Status change for `order`, with `--from`/`--to` taking precedence.
    pub fn status_change(&self, order: &Order) -> OrderStatusChange {
        let mut event = OrderStatusChange::from_order(order);
        if let Some(from) = &self.from {
            event.old_status = from.as_str().into();
        }
        if let Some(to) = &self.to {
            event.new_status = to.as_str().into();
        }
        event
    }

    pub fn overrides_names(&self) -> bool {
        self.first_name_meta.is_some() || self.last_name_meta.is_some()
    }
}

impl Validate for SyncArgs {
    fn validate(&self) -> Result<()> {
        let files = [
            ("settings", Some(&self.settings)),
            ("order", Some(&self.order)),
            ("tags", self.tags.as_ref()),
        ];
        for (field, path) in files
            .into_iter()
            .filter_map(|(field, path)| path.map(|p| (field, p)))
        {
            if !path.is_file() {
                return Err(SyncError::InvalidConfigValueError {
                    field: field.to_string(),
                    value: path.display().to_string(),
                    reason: "File does not exist".to_string(),
                });
            }
        }
        self.connection.validate()
    }
}

#[derive(Clone, Args)]
pub struct VerifyArgs {
    #[arg(long, help = "API key to check (defaults to the settings file)")]
    pub api_key: Option<String>,

    #[arg(long, default_value = "settings.toml")]
    pub settings: PathBuf,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

impl fmt::Debug for VerifyArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifyArgs")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("settings", &self.settings)
            .field("connection", &self.connection)
            .finish()
    }
}

impl Validate for VerifyArgs {
    fn validate(&self) -> Result<()> {
        if self.api_key.is_none() && !self.settings.is_file() {
            return Err(SyncError::MissingConfigError {
                field: "api_key".to_string(),
            });
        }
        self.connection.validate()
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        match &self.command {
            Command::Sync(args) => args.validate(),
            Command::Verify(args) => args.validate(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::OrderStatus;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn order_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(
            br#"{
                "id": 7,
                "status": "processing",
                "previous_status": "pending",
                "billing_email": "a@x.com",
                "items": [{"product_id": 1, "name": "Course"}]
            }"#,
        )
        .unwrap();
        file
    }

    #[test]
    fn test_parse_sync_command() {
        let order = order_file();
        let settings = NamedTempFile::new().unwrap();
        let cli = CliConfig::try_parse_from([
            "purchase-tagger",
            "sync",
            "--settings",
            settings.path().to_str().unwrap(),
            "--order",
            order.path().to_str().unwrap(),
            "--from",
            "processing",
            "--verbose",
        ])
        .unwrap();

        assert!(cli.verbose);
        assert!(cli.validate().is_ok());
        let Command::Sync(args) = cli.command else {
            panic!("expected sync command");
        };
        let loaded = args.load_order().unwrap();
        assert_eq!(loaded.id, 7);

        let event = args.status_change(&loaded);
        assert_eq!(event.old_status, OrderStatus::Processing);
        assert_eq!(event.new_status, OrderStatus::Processing);
        assert!(!event.triggers_sync());
    }

    #[test]
    fn test_missing_order_file_fails_validation() {
        let cli = CliConfig::try_parse_from([
            "purchase-tagger",
            "sync",
            "--order",
            "/definitely/not/here.json",
        ])
        .unwrap();
        assert!(matches!(
            cli.validate(),
            Err(SyncError::InvalidConfigValueError { .. })
        ));
    }

    #[test]
    fn test_bad_base_url_fails_validation() {
        let cli = CliConfig::try_parse_from([
            "purchase-tagger",
            "verify",
            "--api-key",
            "k-us1",
            "--api-base-url",
            "not a url",
        ])
        .unwrap();
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_debug_output_redacts_api_key() {
        let cli = CliConfig::try_parse_from([
            "purchase-tagger",
            "verify",
            "--api-key",
            "TOPSECRET-us6",
            "--verbose",
        ])
        .unwrap();

        let rendered = format!("{:?}", cli);

        assert!(!rendered.contains("TOPSECRET"));
        assert!(rendered.contains("<redacted>"));
    }
}
