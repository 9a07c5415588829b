//! OAuth 2.0 authorization-code flow for the platforms that connect by token.
//!
//! Facebook and Instagram share the Facebook login, YouTube uses Google, and
//! Twitter uses its OAuth 2.0 endpoint with PKCE (`S256` challenge).

use std::collections::BTreeMap;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use rand::{distr::Alphanumeric, Rng};
use reqwest::{Client, Url};
use sha2::{Digest, Sha256};
use socdash_core::{AppConfig, OAuthCredentials, Platform};

use crate::error::PlatformError;
use crate::http::{decode, upstream_message, HttpSettings};
use crate::types::TokenResponse;

const STATE_LEN: usize = 32;
/// RFC 7636 allows 43..=128 characters.
const CODE_VERIFIER_LEN: usize = 64;

/// Static endpoints and scopes of one OAuth provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Provider {
    pub authorize_url: &'static str,
    pub token_url: &'static str,
    pub scope: &'static str,
    pub pkce: bool,
    /// Whether client credentials go in an HTTP Basic header instead of the form.
    pub basic_auth: bool,
    pub extra_params: &'static [(&'static str, &'static str)],
}

const FACEBOOK: Provider = Provider {
    authorize_url: "https://www.facebook.com/v18.0/dialog/oauth",
    token_url: "https://graph.facebook.com/v18.0/oauth/access_token",
    scope: "pages_show_list,pages_read_engagement,read_insights,instagram_basic,instagram_manage_insights",
    pkce: false,
    basic_auth: false,
    extra_params: &[],
};

const GOOGLE: Provider = Provider {
    authorize_url: "https://accounts.google.com/o/oauth2/v2/auth",
    token_url: "https://oauth2.googleapis.com/token",
    scope: "https://www.googleapis.com/auth/youtube.readonly",
    pkce: false,
    basic_auth: false,
    extra_params: &[("access_type", "offline"), ("prompt", "consent")],
};

const TWITTER: Provider = Provider {
    authorize_url: "https://twitter.com/i/oauth2/authorize",
    token_url: "https://api.twitter.com/2/oauth2/token",
    scope: "tweet.read users.read offline.access",
    pkce: true,
    basic_auth: true,
    extra_params: &[],
};

/// The provider used to connect `platform`, or `None` for platforms that
/// connect by username only.
#[must_use]
pub fn provider(platform: Platform) -> Option<&'static Provider> {
    match platform {
        Platform::Facebook | Platform::Instagram => Some(&FACEBOOK),
        Platform::Youtube => Some(&GOOGLE),
        Platform::Twitter => Some(&TWITTER),
        Platform::Linkedin | Platform::Tiktok => None,
    }
}

/// Random opaque value for the `state` parameter.
#[must_use]
pub fn generate_state() -> String {
    random_token(STATE_LEN)
}

/// Random PKCE code verifier. Only its [`code_challenge`] leaves the server
/// before the token exchange.
#[must_use]
pub fn generate_code_verifier() -> String {
    random_token(CODE_VERIFIER_LEN)
}

/// RFC 7636 `S256` challenge: unpadded base64url of the verifier's SHA-256.
#[must_use]
pub fn code_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

fn random_token(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Tokens granted by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenGrant {
    fn from_response(response: TokenResponse, now: DateTime<Utc>) -> Self {
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_at: response
                .expires_in
                .filter(|secs| *secs > 0)
                .map(|secs| now + Duration::seconds(secs)),
        }
    }
}

/// Builds authorize URLs and talks to provider token endpoints.
pub struct OAuthClient {
    client: Client,
    credentials: BTreeMap<Platform, OAuthCredentials>,
    /// Replaces every provider's token URL; used to point tests at a mock.
    token_url_override: Option<Url>,
}

impl OAuthClient {
    /// # Errors
    ///
    /// Returns [`PlatformError::Http`] if the `reqwest::Client` cannot be built.
    pub fn from_config(config: &AppConfig) -> Result<Self, PlatformError> {
        let credentials = Platform::ALL
            .iter()
            .filter_map(|&p| config.oauth_for(p).map(|c| (p, c.clone())))
            .collect();
        Self::new(HttpSettings::from_app_config(config), credentials, None)
    }

    /// # Errors
    ///
    /// Returns [`PlatformError::Http`] if the `reqwest::Client` cannot be
    /// built, or [`PlatformError::InvalidUrl`] if `token_url_override` does
    /// not parse.
    pub fn new(
        settings: HttpSettings,
        credentials: BTreeMap<Platform, OAuthCredentials>,
        token_url_override: Option<&str>,
    ) -> Result<Self, PlatformError> {
        let token_url_override = token_url_override
            .map(|u| {
                Url::parse(u).map_err(|e| PlatformError::InvalidUrl {
                    url: u.to_owned(),
                    reason: e.to_string(),
                })
            })
            .transpose()?;
        Ok(Self {
            client: settings.build_client()?,
            credentials,
            token_url_override,
        })
    }

    /// Whether `platform` has a provider and configured client credentials.
    #[must_use]
    pub fn is_configured(&self, platform: Platform) -> bool {
        provider(platform).is_some() && self.credentials.contains_key(&platform)
    }

    fn provider_and_credentials(
        &self,
        platform: Platform,
    ) -> Result<(&'static Provider, &OAuthCredentials), PlatformError> {
        let provider = provider(platform).ok_or(PlatformError::Unsupported {
            platform,
            credential: "OAuth",
        })?;
        let credentials = self.credentials.get(&platform).ok_or_else(|| {
            PlatformError::OAuth(format!("no OAuth client configured for {platform}"))
        })?;
        Ok((provider, credentials))
    }

    /// The provider URL the user is redirected to.
    ///
    /// # Errors
    ///
    /// - [`PlatformError::Unsupported`] for platforms without OAuth.
    /// - [`PlatformError::OAuth`] if no client credentials are configured.
    /// - [`PlatformError::MissingCredential`] if the provider needs PKCE and
    ///   no verifier was given.
    pub fn authorize_url(
        &self,
        platform: Platform,
        redirect_uri: &str,
        state: &str,
        code_verifier: Option<&str>,
    ) -> Result<Url, PlatformError> {
        let (provider, credentials) = self.provider_and_credentials(platform)?;
        let mut url = Url::parse(provider.authorize_url).map_err(|e| PlatformError::InvalidUrl {
            url: provider.authorize_url.to_owned(),
            reason: e.to_string(),
        })?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("response_type", "code");
            pairs.append_pair("client_id", &credentials.client_id);
            pairs.append_pair("redirect_uri", redirect_uri);
            pairs.append_pair("scope", provider.scope);
            pairs.append_pair("state", state);
            if provider.pkce {
                let verifier =
                    code_verifier.ok_or(PlatformError::MissingCredential("PKCE code verifier"))?;
                pairs.append_pair("code_challenge", &code_challenge(verifier));
                pairs.append_pair("code_challenge_method", "S256");
            }
            for (k, v) in provider.extra_params {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    /// Exchanges an authorization code for tokens.
    ///
    /// # Errors
    ///
    /// - [`PlatformError::Unsupported`] / [`PlatformError::OAuth`] as for
    ///   [`OAuthClient::authorize_url`].
    /// - [`PlatformError::Status`] if the provider rejects the code.
    /// - [`PlatformError::Deserialize`] if the token response is malformed.
    pub async fn exchange_code(
        &self,
        platform: Platform,
        code: &str,
        redirect_uri: &str,
        code_verifier: Option<&str>,
    ) -> Result<TokenGrant, PlatformError> {
        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ];
        if let Some(verifier) = code_verifier {
            form.push(("code_verifier", verifier));
        }
        self.token_request(platform, &form).await
    }

    /// Trades a refresh token for a new access token.
    ///
    /// # Errors
    ///
    /// As for [`OAuthClient::exchange_code`].
    pub async fn refresh(
        &self,
        platform: Platform,
        refresh_token: &str,
    ) -> Result<TokenGrant, PlatformError> {
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];
        self.token_request(platform, &form).await
    }

    async fn token_request(
        &self,
        platform: Platform,
        form: &[(&str, &str)],
    ) -> Result<TokenGrant, PlatformError> {
        let (provider, credentials) = self.provider_and_credentials(platform)?;
        let token_url = match &self.token_url_override {
            Some(url) => url.clone(),
            None => Url::parse(provider.token_url).map_err(|e| PlatformError::InvalidUrl {
                url: provider.token_url.to_owned(),
                reason: e.to_string(),
            })?,
        };

        let mut fields: Vec<(&str, &str)> = form.to_vec();
        fields.push(("client_id", credentials.client_id.as_str()));
        if !provider.basic_auth {
            fields.push(("client_secret", credentials.client_secret.as_str()));
        }

        // Authorization codes are single use, so the POST is sent once.
        let mut request = self.client.post(token_url).form(&fields);
        if provider.basic_auth {
            request = request.basic_auth(&credentials.client_id, Some(&credentials.client_secret));
        }
        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(PlatformError::Status {
                platform,
                status,
                message: upstream_message(&text),
            });
        }
        let body: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| PlatformError::Deserialize {
                context: "token response".to_owned(),
                source: e,
            })?;

        let response: TokenResponse = decode(body, "token response")?;
        tracing::info!(%platform, has_refresh = response.refresh_token.is_some(), "oauth token granted");
        Ok(TokenGrant::from_response(response, Utc::now()))
    }
}
