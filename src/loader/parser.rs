//! YAML parser for reader configurations
//!
//! Parses and validates reader YAML files, then renders the templated
//! fields once the environment and user variables are known.

use crate::auth::AuthConfig;
use crate::config::{AuthConfigDef, ReaderConfig};
use crate::error::{Error, Result};
use crate::remote::DEFAULT_PAGE_SIZE;
use crate::template::{self, TemplateContext};
use crate::types::Corpora;
use std::fs;
use std::path::Path;

/// Load a reader configuration from a file path
///
/// # Examples
///
/// ```ignore
/// let config = load_config("./reports.yaml")?;
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<ReaderConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        Error::config(format!(
            "Failed to read config file '{}': {}",
            path.display(),
            e
        ))
    })?;
    load_config_from_str(&content)
}

/// Load a reader configuration from a YAML string
pub fn load_config_from_str(yaml: &str) -> Result<ReaderConfig> {
    let config: ReaderConfig = serde_yaml::from_str(yaml)
        .map_err(|e| Error::config(format!("Failed to parse reader YAML: {e}")))?;

    validate_config(&config)?;
    Ok(config)
}

/// Template context for a configuration.
///
/// `{{ config.* }}` reads the configuration itself, `{{ vars.* }}` (or a bare
/// name) its `vars` section and `{{ env.* }}` the process environment.
pub fn template_context(config: &ReaderConfig) -> Result<TemplateContext> {
    let mut ctx = TemplateContext::with_config(serde_json::to_value(config)?).with_env();
    ctx.set_vars(config.vars.clone());
    Ok(ctx)
}

/// Render every templated field of a configuration.
///
/// Credentials and the custom query are the only fields rendered; the
/// per-folder `{{ parent_id }}` placeholder belongs to the engine.
pub fn render_config(config: &ReaderConfig, ctx: &TemplateContext) -> Result<ReaderConfig> {
    let mut rendered = config.clone();

    if let Some(query) = &config.traversal.custom_query {
        rendered.traversal.custom_query = Some(template::render(query, ctx)?);
    }
    if let Some(name) = &config.source.folder_name {
        rendered.source.folder_name = Some(template::render(name, ctx)?);
    }
    if let Some(id) = &config.source.folder_id {
        rendered.source.folder_id = Some(template::render(id, ctx)?);
    }

    rendered.auth = match &config.auth {
        AuthConfigDef::None => AuthConfigDef::None,
        AuthConfigDef::Bearer { token } => AuthConfigDef::Bearer {
            token: template::render(token, ctx)?,
        },
        AuthConfigDef::Oauth2Refresh {
            token_url,
            client_id,
            client_secret,
            refresh_token,
        } => AuthConfigDef::Oauth2Refresh {
            token_url: template::render(token_url, ctx)?,
            client_id: template::render(client_id, ctx)?,
            client_secret: template::render(client_secret, ctx)?,
            refresh_token: template::render(refresh_token, ctx)?,
        },
        AuthConfigDef::ServiceAccount {
            client_email,
            private_key,
            scopes,
            subject,
            token_url,
            token_lifetime_seconds,
        } => AuthConfigDef::ServiceAccount {
            client_email: template::render(client_email, ctx)?,
            private_key: template::render(private_key, ctx)?,
            scopes: scopes.clone(),
            subject: subject
                .as_deref()
                .map(|s| template::render(s, ctx))
                .transpose()?,
            token_url: template::render(token_url, ctx)?,
            token_lifetime_seconds: *token_lifetime_seconds,
        },
    };

    Ok(rendered)
}

/// Build runtime auth settings, rendering templates first
pub fn build_auth_config(def: &AuthConfigDef, ctx: &TemplateContext) -> Result<AuthConfig> {
    let auth = match def {
        AuthConfigDef::None => AuthConfig::None,

        AuthConfigDef::Bearer { token } => AuthConfig::Bearer {
            token: render_required("auth.token", token, ctx)?,
        },

        AuthConfigDef::Oauth2Refresh {
            token_url,
            client_id,
            client_secret,
            refresh_token,
        } => AuthConfig::Oauth2Refresh {
            token_url: template::render(token_url, ctx)?,
            client_id: render_required("auth.client_id", client_id, ctx)?,
            client_secret: render_required("auth.client_secret", client_secret, ctx)?,
            refresh_token: render_required("auth.refresh_token", refresh_token, ctx)?,
        },

        AuthConfigDef::ServiceAccount {
            client_email,
            private_key,
            scopes,
            subject,
            token_url,
            token_lifetime_seconds,
        } => AuthConfig::ServiceAccount {
            client_email: render_required("auth.client_email", client_email, ctx)?,
            // PEM keys in env vars often carry escaped newlines
            private_key: render_required("auth.private_key", private_key, ctx)?
                .replace("\\n", "\n"),
            scopes: scopes.clone(),
            subject: subject
                .as_deref()
                .map(|s| template::render(s, ctx))
                .transpose()?,
            token_url: template::render(token_url, ctx)?,
            token_lifetime_seconds: *token_lifetime_seconds,
        },
    };
    Ok(auth)
}

fn render_required(field: &str, value: &str, ctx: &TemplateContext) -> Result<String> {
    let rendered = template::render(value, ctx)?;
    if rendered.trim().is_empty() {
        return Err(Error::missing_field(field));
    }
    Ok(rendered)
}

/// Validate a reader configuration
fn validate_config(config: &ReaderConfig) -> Result<()> {
    if config.kind != "reader" {
        return Err(Error::config(format!(
            "Unsupported config kind '{}', expected 'reader'",
            config.kind
        )));
    }

    if config.name.trim().is_empty() {
        return Err(Error::config("Reader name cannot be empty"));
    }

    if config.source.folder_id.is_some() && config.source.folder_name.is_some() {
        return Err(Error::config(
            "source.folder_id and source.folder_name are mutually exclusive",
        ));
    }

    let traversal = &config.traversal;
    if traversal.use_custom_query
        && traversal
            .custom_query
            .as_deref()
            .map_or(true, |q| q.trim().is_empty())
    {
        return Err(Error::missing_field("traversal.custom_query"));
    }

    if config.read.page_size == 0 || config.read.page_size > DEFAULT_PAGE_SIZE {
        return Err(invalid(
            "read.page_size",
            format!("must be between 1 and {DEFAULT_PAGE_SIZE}"),
        ));
    }

    if config.read.batch_size == 0 {
        return Err(invalid("read.batch_size", "must be greater than 0"));
    }

    if config.scope.corpora == Some(Corpora::Drive) && config.scope.drive_id.is_none() {
        return Err(Error::missing_field("scope.drive_id"));
    }

    if config.http.rate_limit.enabled && config.http.rate_limit.requests_per_second == 0 {
        return Err(invalid(
            "http.rate_limit.requests_per_second",
            "must be greater than 0",
        ));
    }

    if config.http.timeout_seconds == 0 {
        return Err(invalid("http.timeout_seconds", "must be greater than 0"));
    }

    if config.resolver.max_backoff_ms < config.resolver.initial_backoff_ms {
        return Err(invalid(
            "resolver.max_backoff_ms",
            "must not be smaller than resolver.initial_backoff_ms",
        ));
    }

    Ok(())
}

fn invalid(field: &str, message: impl Into<String>) -> Error {
    Error::InvalidConfigValue {
        field: field.to_string(),
        message: message.into(),
    }
}
