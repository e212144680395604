//! OAuth2 authorization for the Drive API ("installed application" flow).
//!
//! A token persisted from an earlier run is reused. An expired token is
//! refreshed when it carries a refresh token. Otherwise the user is sent
//! through the consent page and pastes the code back on stdin.

use super::DriveClient;
use crate::config::DriveConfig;
use crate::{BackupError, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};

/// Tokens closer than this to expiry are treated as expired.
const EXPIRY_MARGIN_MS: i64 = 60_000;

/// Client secret file as downloaded from the cloud console.
#[derive(Debug, Clone, Deserialize)]
struct CredentialsFile {
    installed: Option<Credentials>,
    web: Option<Credentials>,
}

/// OAuth client credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    "https://accounts.google.com/o/oauth2/auth".to_string()
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

impl Credentials {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            BackupError::Auth(format!("cannot read credentials {}: {}", path.display(), e))
        })?;
        let file: CredentialsFile = serde_json::from_str(&content).map_err(|e| {
            BackupError::Auth(format!("invalid credentials {}: {}", path.display(), e))
        })?;
        file.installed.or(file.web).ok_or_else(|| {
            BackupError::Auth(format!(
                "{} has neither an \"installed\" nor a \"web\" client",
                path.display()
            ))
        })
    }

    fn redirect_uri(&self) -> &str {
        self.redirect_uris
            .first()
            .map(String::as_str)
            .unwrap_or("urn:ietf:wg:oauth:2.0:oob")
    }
}

/// Persisted token, in the layout Google client libraries write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Expiry, epoch milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<i64>,
}

impl Token {
    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.expiry_date
            .map(|expiry| expiry.saturating_sub(EXPIRY_MARGIN_MS) <= now_ms)
            .unwrap_or(false)
    }
}

/// Response of the token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

impl TokenResponse {
    fn into_token(self, now_ms: i64, previous_refresh: Option<String>) -> Token {
        Token {
            access_token: self.access_token,
            refresh_token: self.refresh_token.or(previous_refresh),
            scope: self.scope,
            token_type: self.token_type,
            expiry_date: self
                .expires_in
                .map(|secs| now_ms.saturating_add(secs.saturating_mul(1000))),
        }
    }
}

/// Loads, refreshes, obtains and persists tokens.
pub struct Authorizer {
    credentials: Credentials,
    scopes: Vec<String>,
    token_path: PathBuf,
    http: reqwest::Client,
}

impl Authorizer {
    pub fn new(credentials: Credentials, config: &DriveConfig) -> Self {
        Self {
            credentials,
            scopes: config.scopes.clone(),
            token_path: config.token_path.clone(),
            http: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &DriveConfig) -> Result<Self> {
        let credentials = Credentials::from_file(&config.credentials_path)?;
        Ok(Self::new(credentials, config))
    }

    /// Consent page the user must visit.
    pub fn auth_url(&self) -> Result<String> {
        let scope = self.scopes.join(" ");
        let url = reqwest::Url::parse_with_params(
            &self.credentials.auth_uri,
            &[
                ("access_type", "offline"),
                ("scope", scope.as_str()),
                ("response_type", "code"),
                ("client_id", self.credentials.client_id.as_str()),
                ("redirect_uri", self.credentials.redirect_uri()),
            ],
        )
        .map_err(|e| BackupError::Auth(format!("invalid auth_uri: {}", e)))?;
        Ok(url.to_string())
    }

    pub fn load_token(&self) -> Result<Token> {
        let content = std::fs::read_to_string(&self.token_path).map_err(|e| {
            BackupError::Auth(format!("no stored token at {}: {}", self.token_path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            BackupError::Auth(format!("stored token {} is invalid: {}", self.token_path.display(), e))
        })
    }

    pub fn save_token(&self, token: &Token) -> Result<()> {
        if let Some(parent) = self.token_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.token_path, serde_json::to_string(token)?)?;
        Ok(())
    }

    /// Produce a usable token, falling back to the interactive flow
    /// whenever the stored one cannot be used.
    pub async fn authorize(&self) -> Result<Token> {
        let now_ms = Utc::now().timestamp_millis();

        match self.load_token() {
            Ok(token) if !token.is_expired(now_ms) => return Ok(token),
            Ok(token) => match token.refresh_token.clone() {
                Some(refresh_token) => match self.refresh(&refresh_token).await {
                    Ok(fresh) => {
                        self.save_token(&fresh)?;
                        info!("Token refreshed and stored to {}", self.token_path.display());
                        return Ok(fresh);
                    }
                    Err(e) => warn!("Token refresh failed: {}", e),
                },
                None => info!("Stored token expired and cannot be refreshed"),
            },
            Err(e) => info!("{}", e),
        }

        self.authorize_interactively().await
    }

    async fn authorize_interactively(&self) -> Result<Token> {
        let url = self.auth_url()?;
        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(format!("Authorize this app by visiting this url: {}\n", url).as_bytes())
            .await?;
        stdout.write_all(b"Enter the code from that page here: ").await?;
        stdout.flush().await?;

        let mut code = String::new();
        BufReader::new(tokio::io::stdin()).read_line(&mut code).await?;
        let code = code.trim();
        if code.is_empty() {
            return Err(BackupError::Auth("no authorization code entered".to_string()));
        }

        let token = self.exchange_code(code).await?;
        self.save_token(&token)?;
        info!("Token stored to {}", self.token_path.display());

        Ok(token)
    }

    pub async fn exchange_code(&self, code: &str) -> Result<Token> {
        let response = self
            .request_token(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.credentials.redirect_uri()),
            ])
            .await?;
        Ok(response.into_token(Utc::now().timestamp_millis(), None))
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<Token> {
        let response = self
            .request_token(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .await?;
        Ok(response.into_token(Utc::now().timestamp_millis(), Some(refresh_token.to_string())))
    }

    async fn request_token(&self, grant: &[(&str, &str)]) -> Result<TokenResponse> {
        let mut form: Vec<(&str, &str)> = vec![
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
        ];
        form.extend_from_slice(grant);

        let response = self
            .http
            .post(&self.credentials.token_uri)
            .form(&form)
            .send()
            .await
            .map_err(|e| BackupError::Auth(format!("token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(BackupError::Auth(format!(
                "token endpoint returned {}: {}",
                status, text
            )));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| BackupError::Auth(format!("unexpected token response: {}", e)))
    }
}

/// Authorize against Drive and return a ready client.
pub async fn authorize(config: &DriveConfig) -> Result<DriveClient> {
    let authorizer = Authorizer::from_config(config)?;
    let token = authorizer.authorize().await?;
    Ok(DriveClient::new(config, token.access_token))
}
