//! HTTP client for the Leadscout backend: batch scrape submission, quota
//! checks, post actions, and prospect/keyword management.

pub mod client;
pub mod error;
pub mod types;

mod retry;

pub use client::LeadscoutClient;
pub use error::ClientError;
pub use types::{
    CreateProspectRequest, DeleteKeywordsRequest, DeleteProspectRequest, PostActionRequest,
    QuotaResponse, ScrapeBatchRequest, ScrapeBatchResponse,
};
