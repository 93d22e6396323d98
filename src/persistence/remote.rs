use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use url::Url;

use crate::persistence::{PersistenceError, ProjectPersistence};
use crate::tracker::model::Project;
use crate::web::types::{
    DeletePhotoRequest, ErrorResponse, UploadPhotoRequest, UploadPhotoResponse,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const GET_PHOTO_PATH: &str = "api/get-photo";

/// Client for the project API server.
#[derive(Debug, Clone)]
pub struct RemoteProject {
    client: Client,
    base: Url,
}

impl RemoteProject {
    /// `base` must end with `/`; endpoint paths are joined onto it.
    pub fn new(base: Url) -> Result<Self, PersistenceError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, base })
    }

    fn endpoint(&self, path: &str) -> Result<Url, PersistenceError> {
        Ok(self.base.join(path)?)
    }

    /// Turn a non-2xx response into [`PersistenceError::Api`].
    async fn check(response: Response) -> Result<Response, PersistenceError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let (error, details) = match serde_json::from_str::<ErrorResponse>(&body) {
            Ok(parsed) => (parsed.error, parsed.details),
            Err(_) if body.trim().is_empty() => (status.to_string(), None),
            Err(_) => (status.to_string(), Some(body)),
        };
        Err(PersistenceError::Api {
            status: status.as_u16(),
            error,
            details,
        })
    }
}

/// Extract the blob id from a photo url served by `/api/get-photo`.
///
/// Relative and absolute urls are resolved against `base`; embedded data
/// urls and foreign links yield `None`.
pub fn photo_id_from_url(base: &Url, url: &str) -> Option<String> {
    let resolved = base.join(url).ok()?;
    if resolved.origin() != base.origin() || !resolved.path().ends_with(GET_PHOTO_PATH) {
        return None;
    }
    resolved
        .query_pairs()
        .find(|(key, _)| key == "id")
        .map(|(_, value)| value.into_owned())
        .filter(|id| !id.is_empty())
}

#[async_trait]
impl ProjectPersistence for RemoteProject {
    async fn load(&self) -> Result<Project, PersistenceError> {
        let response = self.client.get(self.endpoint("api/get-data")?).send().await?;
        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }

    async fn save(&self, project: &Project) -> Result<(), PersistenceError> {
        let response = self
            .client
            .post(self.endpoint("api/save-data")?)
            .json(project)
            .send()
            .await?;
        Self::check(response).await?;
        tracing::debug!("Project saved to {}", self.base);
        Ok(())
    }

    async fn store_photo(&self, data_url: String) -> Result<String, PersistenceError> {
        let response = self
            .client
            .post(self.endpoint("api/upload-photo")?)
            .json(&UploadPhotoRequest {
                data: Some(data_url),
            })
            .send()
            .await?;
        let uploaded: UploadPhotoResponse = Self::check(response).await?.json().await?;
        Ok(format!("/{GET_PHOTO_PATH}?id={}", uploaded.id))
    }

    async fn delete_photo(&self, url: &str) -> Result<(), PersistenceError> {
        let Some(id) = photo_id_from_url(&self.base, url) else {
            return Ok(());
        };
        let response = self
            .client
            .post(self.endpoint("api/delete-photo")?)
            .json(&DeletePhotoRequest { id: Some(id) })
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}
