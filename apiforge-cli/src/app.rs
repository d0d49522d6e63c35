//! Command implementations.
//!
//! [`App`] ties the loaded configuration, the built-in vendor endpoints and
//! the credentials file together. Output formatting stays in `main.rs`.

use anyhow::{Context, Result, bail};
use apiforge_core::{
    ApiClient, ApiError, ApiKeyCredential, AuthConfig, Credential, CredentialId,
    CredentialRecord, CredentialStore, EndpointRegistry, EndpointTable, FileDocumentStore,
    RequestSpec, VendorId, random_state,
};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::CliConfig;

/// Refresh stored tokens that expire within this many seconds before using
/// them.
pub const REFRESH_WINDOW_SECS: i64 = 60;

pub struct App {
    config: CliConfig,
    registry: EndpointRegistry,
    store: CredentialStore<FileDocumentStore>,
}

impl App {
    /// Open the credentials file named by the configuration.
    pub fn new(config: CliConfig) -> Result<Self> {
        let path = config.credentials_path();
        let store = FileDocumentStore::open(&path)
            .with_context(|| format!("Failed to open credentials file {:?}", path))?;
        Ok(Self {
            config,
            registry: apiforge_modules::registry(),
            store: CredentialStore::new(store),
        })
    }

    pub fn config(&self) -> &CliConfig {
        &self.config
    }

    fn endpoints(&self, vendor: &str) -> Result<EndpointTable> {
        let table = self.registry.get(vendor).cloned().with_context(|| {
            format!(
                "Unknown vendor '{}'; expected one of: {}",
                vendor,
                self.registry.list_ids().join(", ")
            )
        })?;
        Ok(self.config.endpoints_for(table))
    }

    fn client(&self, vendor: &str, auth: AuthConfig) -> Result<ApiClient> {
        let client = ApiClient::with_policy_and_timeout(
            auth,
            self.endpoints(vendor)?,
            self.config.retry.policy(),
            self.config.retry.timeout(),
        )?;
        Ok(client)
    }

    fn oauth_client(&self, vendor: &str) -> Result<ApiClient> {
        let endpoints = self.endpoints(vendor)?;
        if !endpoints.supports_oauth() {
            bail!("{} does not use OAuth; add an API key instead", endpoints.name);
        }
        self.client(vendor, self.config.vendor(vendor)?)
    }

    /// Authorization URL for a vendor, with a fresh `state` unless one is
    /// given or configured.
    pub fn authorization_uri(&self, vendor: &str, state: Option<String>) -> Result<String> {
        let endpoints = self.endpoints(vendor)?;
        if !endpoints.supports_oauth() {
            bail!("{} does not use OAuth; add an API key instead", endpoints.name);
        }

        let mut auth = self.config.vendor(vendor)?;
        if let Some(state) = state {
            auth.state = Some(state);
        } else if auth.state.is_none() {
            auth.state = Some(random_state());
        }

        Ok(self.client(vendor, auth)?.authorization_uri()?)
    }

    /// Exchange an authorization code and store the credential.
    pub async fn exchange(&self, vendor: &str, code: &str) -> Result<CredentialId> {
        let client = self.oauth_client(vendor)?;
        let credential = client
            .exchange_code(code)
            .await
            .with_context(|| format!("Failed to exchange authorization code with {}", vendor))?;

        let record = CredentialRecord::for_oauth_vendor(&VendorId::new(vendor), credential)
            .with_context(|| format!("{} has no OAuth credential type", vendor))?;
        Ok(self.store.save(&record).await?)
    }

    /// Store a Terminus API key.
    pub async fn add_key(&self, api_key: &str) -> Result<CredentialId> {
        let record = CredentialRecord::Terminus(ApiKeyCredential::new(api_key));
        Ok(self.store.save(&record).await?)
    }

    /// Refresh a stored OAuth credential and write it back.
    pub async fn refresh(&self, id: &CredentialId) -> Result<Credential> {
        let mut record = self.store.load(id).await?;
        let vendor = record.vendor();
        let credential = record
            .oauth()
            .cloned()
            .with_context(|| format!("{} credentials cannot be refreshed", vendor))?;

        let client = self.oauth_client(vendor.as_str())?;
        let refreshed = match client.refresh(&credential).await {
            Ok(refreshed) => refreshed,
            Err(e) if e.requires_reauthorization() => {
                return Err(anyhow::Error::new(e).context(format!(
                    "{} rejected the refresh token; run `apiforge auth-uri {}` to authorize again",
                    vendor, vendor
                )));
            }
            Err(e) => return Err(e.into()),
        };

        record.replace_oauth(refreshed.clone());
        self.store.update(id, &record).await?;
        info!("Refreshed credential {}", id);
        Ok(refreshed)
    }

    /// GET a path, or a pagination URL, with a stored credential.
    ///
    /// OAuth credentials close to expiry are refreshed first when they
    /// carry a refresh token.
    pub async fn get(
        &self,
        id: &CredentialId,
        path: &str,
        next_page_url: Option<String>,
    ) -> Result<Value> {
        let mut record = self.store.load(id).await?;

        let window = chrono::Duration::seconds(REFRESH_WINDOW_SECS);
        let expiring = record
            .oauth()
            .is_some_and(|c| c.refresh_token.is_some() && c.expires_within(window));
        if expiring {
            debug!("Credential {} expires soon, refreshing", id);
            let refreshed = self.refresh(id).await?;
            record.replace_oauth(refreshed);
        }

        let vendor = record.vendor();
        let auth = self
            .config
            .vendors
            .get(vendor.as_str())
            .cloned()
            .unwrap_or_default();
        let client = self
            .client(vendor.as_str(), auth)?
            .with_authorization(record.authorization());

        let spec = RequestSpec::get(path).with_next_page_url(next_page_url);
        let value = client.fetch(spec).await.map_err(|e| match e {
            ApiError::RequestFailed { .. } => {
                anyhow::Error::new(e).context(format!("GET {} on {} failed", path, vendor))
            }
            other => other.into(),
        })?;
        Ok(value)
    }

    pub async fn list(&self, vendor: Option<&str>) -> Result<Vec<(CredentialId, CredentialRecord)>> {
        let vendor = vendor.map(VendorId::new);
        Ok(self.store.list(vendor.as_ref()).await?)
    }

    pub async fn show(&self, id: &CredentialId) -> Result<CredentialRecord> {
        Ok(self.store.load(id).await?)
    }

    pub async fn delete(&self, id: &CredentialId) -> Result<()> {
        Ok(self.store.delete(id).await?)
    }
}
