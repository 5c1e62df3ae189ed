use std::env;

use anyhow::{anyhow, Context, Result};
use log::*;
use referral_common::Secret;
use referral_engine::{
    db_types::{Referral, ReferralEvent, ReferralType},
    PayoutOutcome,
    VerificationOutcome,
};
use referral_server::middleware::{ADMIN_ID_HEADER, ADMIN_KEY_HEADER};
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    RequestBuilder,
    Response,
};
use serde::de::DeserializeOwned;
use serde_json::json;
use url::Url;

const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8370";

/// Who is calling the admin API, and where.
#[derive(Debug, Clone)]
pub struct AdminProfile {
    pub server: Url,
    pub admin_id: String,
    pub api_key: Secret<String>,
}

impl AdminProfile {
    pub fn from_env() -> Result<Self> {
        let server = env::var("RPS_SERVER_URL").unwrap_or_else(|_| DEFAULT_SERVER_URL.to_string());
        let server = Url::parse(&server).with_context(|| format!("Invalid server url: {server}"))?;
        let admin_id = env::var("RPS_ADMIN_ID").context("RPS_ADMIN_ID must be set to call the admin API")?;
        let api_key = env::var("RPS_ADMIN_API_KEY").context("RPS_ADMIN_API_KEY must be set to call the admin API")?;
        Ok(Self { server, admin_id, api_key: Secret::new(api_key) })
    }
}

pub struct ReferralServerClient {
    client: Client,
    profile: AdminProfile,
}

impl ReferralServerClient {
    pub fn new(profile: AdminProfile) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .user_agent("Referral Server Client")
            .default_headers(headers)
            .build()
            .context("Failed to create http client")?;
        Ok(Self { client, profile })
    }

    pub fn url(&self, path: &str) -> Result<Url> {
        self.profile.server.join(path).map_err(|e| anyhow!("Failed to join URL: {e}"))
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        req.header(ADMIN_ID_HEADER, self.profile.admin_id.as_str())
            .header(ADMIN_KEY_HEADER, self.profile.api_key.reveal().as_str())
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path)?;
        debug!("GET {url}");
        let res = self.authorized(self.client.get(url)).send().await?;
        parse_response(res).await
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: Option<serde_json::Value>) -> Result<T> {
        let url = self.url(path)?;
        debug!("POST {url}");
        let mut req = self.authorized(self.client.post(url));
        if let Some(body) = body {
            req = req.json(&body);
        }
        parse_response(req.send().await?).await
    }

    pub async fn create_referral(
        &self,
        professional_id: i64,
        candidate_email: &str,
        referral_type: ReferralType,
    ) -> Result<Referral> {
        let body = json!({
            "professionalId": professional_id,
            "candidateEmail": candidate_email,
            "referralType": referral_type,
        });
        self.post("/api/referrals", Some(body)).await
    }

    pub async fn referral(&self, id: i64) -> Result<Referral> {
        self.get(&format!("/api/referrals/{id}")).await
    }

    pub async fn referral_events(&self, id: i64) -> Result<Vec<ReferralEvent>> {
        self.get(&format!("/api/referrals/{id}/events")).await
    }

    pub async fn unpaid_referrals(&self) -> Result<Vec<Referral>> {
        self.get("/api/referrals/unpaid").await
    }

    pub async fn referrals_for_professional(&self, id: i64) -> Result<Vec<Referral>> {
        self.get(&format!("/api/referrals/professional/{id}")).await
    }

    pub async fn referrals_for_candidate(&self, id: i64) -> Result<Vec<Referral>> {
        self.get(&format!("/api/referrals/candidate/{id}")).await
    }

    pub async fn verify(&self, id: i64) -> Result<VerificationOutcome> {
        self.post(&format!("/api/referrals/{id}/verify"), None).await
    }

    pub async fn payout(&self, id: i64) -> Result<PayoutOutcome> {
        self.post(&format!("/api/referrals/{id}/payout"), None).await
    }

    pub async fn reject(&self, id: i64, reason: &str) -> Result<Referral> {
        self.post(&format!("/api/referrals/{id}/reject"), Some(json!({ "reason": reason }))).await
    }
}

async fn parse_response<T: DeserializeOwned>(res: Response) -> Result<T> {
    let status = res.status();
    if status.is_success() {
        return Ok(res.json().await?);
    }
    let msg = res.text().await?;
    let msg = serde_json::from_str::<serde_json::Value>(&msg)
        .ok()
        .and_then(|v| v["error"].as_str().map(String::from))
        .unwrap_or(msg);
    Err(anyhow!("The server returned {status}. {msg}"))
}
