//! # apiforge Modules
//!
//! Vendor API facades built on [`apiforge_core::ApiClient`].
//!
//! Each module exposes the vendor's [`EndpointTable`] and a thin facade that
//! maps operations to path templates. Retries, pagination and credential
//! handling live in `apiforge-core`.
//!
//! | Vendor     | Auth            | Facade                        |
//! |------------|-----------------|-------------------------------|
//! | SharePoint | OAuth2 (tenant) | [`sharepoint::SharePointApi`] |
//! | Slack      | OAuth2          | [`slack::SlackApi`]           |
//! | Attentive  | OAuth2          | [`attentive::AttentiveApi`]   |
//! | Terminus   | API key         | [`terminus::TerminusApi`]     |

pub mod attentive;
pub mod sharepoint;
pub mod slack;
pub mod terminus;

use apiforge_core::{EndpointRegistry, EndpointTable};

pub use attentive::AttentiveApi;
pub use sharepoint::SharePointApi;
pub use slack::SlackApi;
pub use terminus::TerminusApi;

/// Endpoint tables of every built-in vendor.
pub fn builtin_endpoints() -> Vec<EndpointTable> {
    vec![
        sharepoint::endpoints(),
        slack::endpoints(),
        attentive::endpoints(),
        terminus::endpoints(),
    ]
}

/// A registry with every built-in vendor registered.
pub fn registry() -> EndpointRegistry {
    let mut registry = EndpointRegistry::new();
    for table in builtin_endpoints() {
        registry.register(table);
    }
    registry
}
