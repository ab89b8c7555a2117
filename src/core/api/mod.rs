// ─── Backend Client ───
// REST calls against the modpack backend: instance catalogue, manifests and
// the development login flow.

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::auth::AuthSession;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::instance::{validate_instance_id, InstanceSummary, Manifest};

/// Largest page the backend serves.
const PAGE_SIZE: u32 = 100;
/// Safety stop for a backend that keeps reporting more pages.
const MAX_PAGES: u32 = 1000;
const DEV_PASSWORD: &str = "dummy_password";

#[derive(Debug, Deserialize)]
pub struct InstancePage {
    pub items: Vec<InstanceSummary>,
    #[serde(default)]
    pub total: u64,
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default)]
    pub page_size: u32,
    #[serde(default = "first_page")]
    pub pages: u32,
}

fn first_page() -> u32 {
    1
}

/// Older backends answer with a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InstanceListing {
    Plain(Vec<InstanceSummary>),
    Paged(InstancePage),
}

#[derive(Serialize)]
struct CreateUser<'a> {
    username: &'a str,
    telegram_id: u64,
}

#[derive(Serialize)]
struct Agent {
    name: &'static str,
    version: u32,
}

#[derive(Serialize)]
struct Authenticate<'a> {
    username: &'a str,
    password: &'a str,
    agent: Agent,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthenticateResponse {
    access_token: String,
    selected_profile: SelectedProfile,
}

#[derive(Deserialize)]
struct SelectedProfile {
    id: String,
    name: String,
}

#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Every instance the backend publishes, walking all pages.
    pub async fn list_instances(&self) -> LauncherResult<Vec<InstanceSummary>> {
        let mut all = Vec::new();
        let mut page = 1;
        loop {
            let url = format!(
                "{}/api/client/instances?page={}&page_size={}",
                self.base_url, page, PAGE_SIZE
            );
            let listing: InstanceListing = self.get_json(&url).await?;
            match listing {
                InstanceListing::Plain(items) => return Ok(items),
                InstanceListing::Paged(body) => {
                    debug!("Instance page {}/{} ({} total)", body.page, body.pages, body.total);
                    let empty = body.items.is_empty();
                    all.extend(body.items);
                    if empty || page >= body.pages || page >= MAX_PAGES {
                        break;
                    }
                    page += 1;
                }
            }
        }
        info!("Fetched {} instances", all.len());
        Ok(all)
    }

    pub async fn fetch_manifest(&self, instance_id: &str) -> LauncherResult<Manifest> {
        validate_instance_id(instance_id)?;
        let url = format!("{}/api/client/instances/{}/manifest", self.base_url, instance_id);
        self.get_json(&url).await
    }

    pub async fn register_user(&self, username: &str, telegram_id: u64) -> LauncherResult<()> {
        let url = format!("{}/api/dev/create_user", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&CreateUser {
                username,
                telegram_id,
            })
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }

    pub async fn authenticate(&self, username: &str) -> LauncherResult<AuthSession> {
        let url = format!("{}/authserver/authenticate", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&Authenticate {
                username,
                password: DEV_PASSWORD,
                agent: Agent {
                    name: "Minecraft",
                    version: 1,
                },
            })
            .send()
            .await?;
        let body: AuthenticateResponse = check_status(response).await?.json().await?;
        Ok(AuthSession {
            username: body.selected_profile.name,
            uuid: body.selected_profile.id,
            access_token: body.access_token,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> LauncherResult<T> {
        let response = self.client.get(url).send().await?;
        let text = check_status(response).await?.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Turn a non-2xx answer into `Backend`, preferring FastAPI's `detail`.
async fn check_status(response: Response) -> LauncherResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("detail").cloned())
        .map(|detail| match detail {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        })
        .unwrap_or(body);
    Err(LauncherError::Backend {
        status: status.as_u16(),
        message,
    })
}
