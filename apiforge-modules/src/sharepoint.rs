//! SharePoint and OneDrive through Microsoft Graph.
//!
//! Authorization goes through Microsoft identity, whose endpoints are
//! tenant-scoped (`common` unless configured). Resource calls go to
//! `https://graph.microsoft.com/v1.0` with the default `[1s, 3s]` back-off.
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), apiforge_core::ApiError> {
//! use apiforge_core::AuthConfig;
//! use apiforge_modules::SharePointApi;
//!
//! let config = AuthConfig::new("client-id")
//!     .with_client_secret("client-secret")
//!     .with_redirect_uri("https://app.example.com/callback");
//! let api = SharePointApi::new(config)?;
//! println!("Visit: {}", api.authorization_uri()?);
//!
//! let credential = api.exchange_code("authorization-code").await?;
//! let api = api.with_credential(&credential)?;
//! let drives = api.list_default_drives().await?;
//! # Ok(())
//! # }
//! ```

use apiforge_core::{
    ApiClient, ApiError, AuthConfig, ConsentPrompt, Credential, EndpointTable, RequestSpec,
};
use serde_json::Value;

/// Vendor ID.
pub const VENDOR_ID: &str = "sharepoint";

/// Microsoft Graph base URL.
pub const BASE_URL: &str = "https://graph.microsoft.com/v1.0";

/// Folder listed when none is given.
pub const ROOT_FOLDER: &str = "root";

/// Microsoft identity endpoints and Graph base URL.
pub fn endpoints() -> EndpointTable {
    EndpointTable::new(VENDOR_ID, "SharePoint")
        .with_authorize_url("https://login.microsoftonline.com/{tenant}/oauth2/v2.0/authorize")
        .with_token_url("https://login.microsoftonline.com/{tenant}/oauth2/v2.0/token")
        .with_api_base_url(BASE_URL)
        .with_scopes(vec![
            "offline_access".to_string(),
            "openid".to_string(),
            "User.Read".to_string(),
            "Sites.Read.All".to_string(),
            "Files.Read.All".to_string(),
        ])
        .with_consent_prompt(ConsentPrompt::select_account())
}

/// Graph path templates.
pub mod urls {
    pub const USER_DETAILS: &str = "/me";
    pub const ORG_DETAILS: &str = "/organization";
    pub const DEFAULT_SITE: &str = "/sites/root";
    pub const ALL_SITES: &str = "/sites?search=*";
    pub const DEFAULT_DRIVES: &str = "/sites/root/drives";

    pub fn drives_by_site(site_id: &str) -> String {
        format!("/sites/{}/drives", site_id)
    }

    pub fn root_folders(drive_id: &str, child_id: &str) -> String {
        format!(
            "/drives/{}/items/{}/children?$expand=thumbnails&top=8&$filter=",
            drive_id, child_id
        )
    }

    pub fn folder_children(child_id: &str) -> String {
        format!("/me/drive/items/{}/children?$filter=", child_id)
    }

    pub fn get_file(drive_id: &str, file_id: &str) -> String {
        format!("/drives/{}/items/{}?$expand=listItem", drive_id, file_id)
    }

    pub fn search(drive_id: &str, query: &str) -> String {
        format!(
            "/drives/{}/root/search(q='{}')?top=20\
             &$select=id,image,name,file,parentReference,size,lastModifiedDateTime,\
             @microsoft.graph.downloadUrl&$filter=",
            drive_id, query
        )
    }
}

/// Microsoft Graph facade for sites, drives and files.
#[derive(Debug, Clone)]
pub struct SharePointApi {
    client: ApiClient,
}

impl SharePointApi {
    /// Create an unauthenticated facade.
    pub fn new(config: AuthConfig) -> Result<Self, ApiError> {
        Ok(Self::from_client(ApiClient::new(config, endpoints())?))
    }

    /// Wrap a prepared client, e.g. one with a custom retry policy.
    pub fn from_client(client: ApiClient) -> Self {
        Self { client }
    }

    /// Attach an OAuth credential.
    pub fn with_credential(self, credential: &Credential) -> Result<Self, ApiError> {
        Ok(Self {
            client: self.client.with_credential(credential)?,
        })
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn authorization_uri(&self) -> Result<String, ApiError> {
        self.client.authorization_uri()
    }

    pub async fn exchange_code(&self, code: &str) -> Result<Credential, ApiError> {
        self.client.exchange_code(code).await
    }

    pub async fn refresh(&self, credential: &Credential) -> Result<Credential, ApiError> {
        self.client.refresh(credential).await
    }

    /// The signed-in user.
    pub async fn get_user(&self) -> Result<Value, ApiError> {
        self.client.get(urls::USER_DETAILS).await
    }

    /// The user's organization, i.e. the first entry of `value`.
    ///
    /// Returns `null` if Graph lists no organization.
    pub async fn get_organization(&self) -> Result<Value, ApiError> {
        let payload = self.client.get(urls::ORG_DETAILS).await?;
        Ok(payload
            .get("value")
            .and_then(|orgs| orgs.get(0))
            .cloned()
            .unwrap_or(Value::Null))
    }

    pub async fn get_default_site(&self) -> Result<Value, ApiError> {
        self.client.get(urls::DEFAULT_SITE).await
    }

    pub async fn list_sites(&self) -> Result<Value, ApiError> {
        self.client.get(urls::ALL_SITES).await
    }

    pub async fn list_default_drives(&self) -> Result<Value, ApiError> {
        self.client.get(urls::DEFAULT_DRIVES).await
    }

    pub async fn list_drives(&self, site_id: &str) -> Result<Value, ApiError> {
        self.client.get(urls::drives_by_site(site_id)).await
    }

    /// Children of a folder in a drive, with thumbnails. Lists the drive
    /// root when `folder_id` is `None`.
    pub async fn retrieve_folder(
        &self,
        drive_id: &str,
        folder_id: Option<&str>,
    ) -> Result<Value, ApiError> {
        let folder_id = folder_id.unwrap_or(ROOT_FOLDER);
        self.client
            .get(urls::root_folders(drive_id, folder_id))
            .await
    }

    /// Children of a folder in the signed-in user's own drive.
    pub async fn retrieve_folder_children(&self, folder_id: &str) -> Result<Value, ApiError> {
        self.client.get(urls::folder_children(folder_id)).await
    }

    /// Search a drive.
    ///
    /// Pass the `@odata.nextLink` of a previous page as `next_page_url` to
    /// fetch the following page; it is requested verbatim.
    pub async fn search(
        &self,
        drive_id: &str,
        query: &str,
        next_page_url: Option<&str>,
    ) -> Result<Value, ApiError> {
        let spec = RequestSpec::get(urls::search(drive_id, query))
            .with_next_page_url(next_page_url.map(str::to_string));
        self.client.fetch(spec).await
    }

    /// A file with its list item fields.
    pub async fn retrieve_file(&self, drive_id: &str, file_id: &str) -> Result<Value, ApiError> {
        self.client.get(urls::get_file(drive_id, file_id)).await
    }
}
