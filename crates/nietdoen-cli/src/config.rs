//! Startup configuration: flags with environment fallbacks, read once.

use std::path::PathBuf;

use clap::Args;
use nietdoen_ai::vertex::{DEFAULT_LOCATION, DEFAULT_MODEL};
use nietdoen_core::config::redact;
use nietdoen_core::{FirebaseConfig, GeoPoint, Language};
use nietdoen_session::{Attestation, GeoSubscription};
use tracing::{info, warn};

#[derive(Debug, Args)]
pub struct FirebaseArgs {
    /// Deployment mode; App Check debug tokens are only used in development.
    #[arg(long, env = "NODE_ENV", default_value = "development")]
    pub node_env: String,

    #[arg(long, env = "RECAPTCHA_SITE_KEY", default_value = "", hide_env_values = true)]
    pub recaptcha_site_key: String,

    /// App Check debug token registered for this app.
    #[arg(long = "appcheck-debug", env = "FIREBASE_APPCHECK_DEBUG", hide_env_values = true)]
    pub appcheck_debug: Option<String>,

    #[arg(long, env = "FIREBASE_API_SITE_KEY", default_value = "", hide_env_values = true)]
    pub api_site_key: String,

    #[arg(long, env = "FIREBASE_API_KEY", default_value = "", hide_env_values = true)]
    pub api_key: String,

    #[arg(long, env = "FIREBASE_AUTH_DOMAIN", default_value = "")]
    pub auth_domain: String,

    #[arg(long, env = "FIREBASE_PROJECT_ID", default_value = "")]
    pub project_id: String,

    #[arg(long, env = "FIREBASE_STORAGE_BUCKET", default_value = "")]
    pub storage_bucket: String,

    #[arg(long, env = "FIREBASE_MESSAGING_SENDER_ID", default_value = "")]
    pub messaging_sender_id: String,

    #[arg(long, env = "FIREBASE_APP_ID", default_value = "")]
    pub app_id: String,
}

impl FirebaseArgs {
    pub fn firebase_config(&self) -> FirebaseConfig {
        FirebaseConfig {
            api_key: self.api_key.clone(),
            auth_domain: self.auth_domain.clone(),
            project_id: self.project_id.clone(),
            storage_bucket: self.storage_bucket.clone(),
            messaging_sender_id: self.messaging_sender_id.clone(),
            app_id: self.app_id.clone(),
        }
    }

    pub fn is_development(&self) -> bool {
        self.node_env == "development"
    }

    /// Debug attestation in development with a token; otherwise none.
    pub fn attestation(&self) -> Attestation {
        match (&self.appcheck_debug, self.is_development()) {
            (Some(token), true) if !token.is_empty() => Attestation::Debug(token.clone()),
            (_, false) => {
                if !self.recaptcha_site_key.is_empty() {
                    warn!("reCAPTCHA attestation is not available from a terminal");
                }
                Attestation::Disabled
            }
            _ => Attestation::Disabled,
        }
    }

    pub fn log_summary(&self) {
        info!(
            node_env = %self.node_env,
            project_id = %self.project_id,
            auth_domain = %self.auth_domain,
            storage_bucket = %self.storage_bucket,
            app_id = %self.app_id,
            api_key = redact(&self.api_key),
            api_site_key = redact(&self.api_site_key),
            recaptcha_site_key = redact(&self.recaptcha_site_key),
            appcheck_debug = redact(self.appcheck_debug.as_deref().unwrap_or_default()),
            "firebase configuration"
        );
    }
}

#[derive(Debug, Args)]
pub struct AccountArgs {
    #[arg(long, env = "NIETDOEN_EMAIL")]
    pub email: Option<String>,

    #[arg(long, env = "NIETDOEN_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

#[derive(Debug, Args)]
pub struct LocationArgs {
    /// Fixed latitude for every record of this run.
    #[arg(long, env = "NIETDOEN_LATITUDE", requires = "longitude", allow_negative_numbers = true)]
    pub latitude: Option<f64>,

    #[arg(long, env = "NIETDOEN_LONGITUDE", requires = "latitude", allow_negative_numbers = true)]
    pub longitude: Option<f64>,

    /// Save records without coordinates.
    #[arg(long)]
    pub no_coordinates: bool,
}

impl LocationArgs {
    pub fn subscription(&self) -> GeoSubscription {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => GeoSubscription::fixed(GeoPoint {
                latitude,
                longitude,
            }),
            _ => {
                if !self.no_coordinates {
                    warn!("no location source; records cannot be saved without --no-coordinates");
                }
                GeoSubscription::pending()
            }
        }
    }
}

#[derive(Debug, Args)]
pub struct CollectArgs {
    /// Photo of the sign (PNG or JPEG).
    pub image: PathBuf,

    #[arg(long, default_value = "dutch")]
    pub language: Language,

    /// Override a field before review, e.g. `--set shape=circular`.
    #[arg(long = "set", value_name = "FIELD=VALUE", value_parser = parse_assignment)]
    pub set: Vec<(String, String)>,

    /// Save without the interactive review.
    #[arg(long, short)]
    pub yes: bool,

    #[arg(long, env = "NIETDOEN_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    #[arg(long, env = "NIETDOEN_MODEL_LOCATION", default_value = DEFAULT_LOCATION)]
    pub model_location: String,

    #[arg(long, env = "NIETDOEN_COLLECTION", default_value = "signs")]
    pub collection: String,

    #[command(flatten)]
    pub firebase: FirebaseArgs,

    #[command(flatten)]
    pub account: AccountArgs,

    #[command(flatten)]
    pub location: LocationArgs,
}

fn parse_assignment(s: &str) -> Result<(String, String), String> {
    let (field, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=VALUE, got `{s}`"))?;
    let field = field.trim();
    if field.is_empty() {
        return Err(format!("missing field name in `{s}`"));
    }
    Ok((field.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        collect: CollectArgs,
    }

    fn parse(args: &[&str]) -> CollectArgs {
        let mut argv = vec!["nietdoen", "sign.jpg"];
        argv.extend_from_slice(args);
        Harness::try_parse_from(argv).unwrap().collect
    }

    #[test]
    fn assignments() {
        assert_eq!(
            parse_assignment("shape=circular").unwrap(),
            ("shape".to_string(), "circular".to_string())
        );
        assert_eq!(
            parse_assignment("colors=red, white").unwrap(),
            ("colors".to_string(), "red, white".to_string())
        );
        assert!(parse_assignment("shape").is_err());
        assert!(parse_assignment("=circular").is_err());
    }

    #[test]
    fn collect_flags() {
        let args = parse(&[
            "--language",
            "en",
            "--set",
            "shape=circular",
            "--set",
            "text=",
            "--yes",
            "--latitude",
            "52.37",
            "--longitude",
            "-4.89",
        ]);
        assert_eq!(args.language, Language::English);
        assert_eq!(args.set.len(), 2);
        assert_eq!(args.set[1], ("text".to_string(), String::new()));
        assert!(args.yes);
        assert_eq!(args.location.longitude, Some(-4.89));
    }

    #[test]
    fn latitude_needs_longitude() {
        assert!(Harness::try_parse_from(["nietdoen", "sign.jpg", "--latitude", "52.0"]).is_err());
    }

    fn firebase(node_env: &str, token: Option<&str>) -> FirebaseArgs {
        FirebaseArgs {
            node_env: node_env.into(),
            recaptcha_site_key: String::new(),
            appcheck_debug: token.map(str::to_string),
            api_site_key: String::new(),
            api_key: "key".into(),
            auth_domain: String::new(),
            project_id: "nietdoen".into(),
            storage_bucket: "nietdoen.appspot.com".into(),
            messaging_sender_id: String::new(),
            app_id: "1:2:web:3".into(),
        }
    }

    #[test]
    fn debug_attestation_only_in_development() {
        assert_eq!(
            firebase("development", Some("tok")).attestation(),
            Attestation::Debug("tok".into())
        );
        assert_eq!(
            firebase("production", Some("tok")).attestation(),
            Attestation::Disabled
        );
        assert_eq!(firebase("development", None).attestation(), Attestation::Disabled);
        assert_eq!(
            firebase("development", Some("")).attestation(),
            Attestation::Disabled
        );
    }

    #[test]
    fn config_carries_project_settings() {
        let config = firebase("development", None).firebase_config();
        assert_eq!(config.project_id, "nietdoen");
        assert!(config.missing().is_empty());
    }
}
