//! Membership read from an HTTP registry.
//!
//! `GET {base}/apps/{app_name}/members` must answer with a JSON array of
//! [`ClusterMember`].
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::{debug, warn};

use super::{ClusterMember, MembershipSource};
use crate::error::Result;
use crate::membership_error;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
pub struct HttpMembership {
    client: Client,
    base_url: Url,
}

impl HttpMembership {
    pub fn new(base_url: Url) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, base_url })
    }

    pub fn members_url(&self, app_name: &str) -> String {
        format!(
            "{}/apps/{}/members",
            self.base_url.as_str().trim_end_matches('/'),
            app_name
        )
    }
}

#[async_trait]
impl MembershipSource for HttpMembership {
    async fn list(&self, app_name: &str) -> Result<Vec<ClusterMember>> {
        let url = self.members_url(app_name);
        debug!("Fetching membership from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|err| {
                warn!("Membership registry request failed: {}", err);
                membership_error!("{}: {}", url, err)
            })?;

        response
            .json::<Vec<ClusterMember>>()
            .await
            .map_err(|err| membership_error!("{}: undecodable roster: {}", url, err))
    }
}
