use crate::{is_remote_id, Project, ProjectDb, ProjectError};
use chrono::Utc;
use serde::Deserialize;
use std::path::Path;
use storyboard::Scene;
use uuid::Uuid;

/// REST client for the remote project store.
pub struct RemoteProjectApi {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateEnvelope {
    data: Option<CreatedDoc>,
}

#[derive(Debug, Deserialize)]
struct CreatedDoc {
    #[serde(rename = "_id")]
    mongo_id: Option<String>,
    id: Option<String>,
}

async fn remote_error(response: reqwest::Response) -> ProjectError {
    let status = response.status();
    let message = response
        .json::<ErrorBody>()
        .await
        .ok()
        .and_then(|body| body.message)
        .unwrap_or_else(|| format!("HTTP {status}"));
    ProjectError::Remote(message)
}

impl RemoteProjectApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn list(&self) -> Result<Vec<Project>, ProjectError> {
        let response = self
            .client
            .get(format!("{}/api/projects", self.base_url))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(remote_error(response).await);
        }
        Ok(response.json().await?)
    }

    /// Creates the project document and returns the backend-assigned id.
    pub async fn create(&self, project: &Project) -> Result<String, ProjectError> {
        let body = serde_json::json!({
            "title": project.name,
            "description": project.name,
            "videoSettings": {
                "voiceOverEnabled": project.voice_over_enabled,
                "stylePreset": project.selected_preset,
            }
        });
        let response = self
            .client
            .post(format!("{}/api/projects", self.base_url))
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(remote_error(response).await);
        }
        let envelope: CreateEnvelope = response.json().await?;
        envelope
            .data
            .and_then(|doc| doc.mongo_id.or(doc.id))
            .ok_or_else(|| ProjectError::Remote("create response carried no project id".into()))
    }

    pub async fn add_scene(
        &self,
        project_id: &str,
        scene: &Scene,
        order: usize,
    ) -> Result<(), ProjectError> {
        let mut title: String = scene.prompt.chars().take(50).collect();
        if scene.prompt.chars().count() > 50 {
            title.push_str("...");
        }
        let body = serde_json::json!({
            "title": title,
            "script": scene.prompt,
            "duration": scene.duration_secs * 1000,
            "stylePreset": scene.style,
            "order": order,
        });
        let response = self
            .client
            .post(format!(
                "{}/api/projects/{}/scenes",
                self.base_url, project_id
            ))
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(remote_error(response).await);
        }
        Ok(())
    }

    pub async fn update(&self, project: &Project) -> Result<(), ProjectError> {
        let id = project.id.as_deref().ok_or(ProjectError::MissingId)?;
        let body = serde_json::json!({
            "title": project.name,
            "description": project.name,
            "videoSettings": {
                "voiceOverEnabled": project.voice_over_enabled,
                "stylePreset": project.selected_preset,
            }
        });
        let response = self
            .client
            .put(format!("{}/api/projects/{}", self.base_url, id))
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(remote_error(response).await);
        }
        Ok(())
    }

    /// Partial update: only the resolved video URL, never the scene list.
    pub async fn set_final_video_url(
        &self,
        project_id: &str,
        video_url: &str,
    ) -> Result<(), ProjectError> {
        let body = serde_json::json!({ "finalVideoUrl": video_url });
        let response = self
            .client
            .put(format!("{}/projects/{}", self.base_url, project_id))
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(remote_error(response).await);
        }
        Ok(())
    }

    pub async fn delete(&self, project_id: &str) -> Result<(), ProjectError> {
        let response = self
            .client
            .delete(format!("{}/api/projects/{}", self.base_url, project_id))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(remote_error(response).await);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Created,
    Updated,
    LocalOnly,
}

fn local_project_id() -> String {
    format!("local-{}", Uuid::new_v4().simple())
}

/// Remote store with a local fallback: every successful save refreshes the
/// local mirror, and any remote failure degrades to local-only persistence
/// instead of losing the document.
pub struct ProjectStore {
    api: RemoteProjectApi,
    db: ProjectDb,
}

impl ProjectStore {
    pub fn open(api: RemoteProjectApi, db_path: &Path) -> Result<Self, ProjectError> {
        let db = ProjectDb::open_or_create(db_path)?;
        Ok(Self { api, db })
    }

    pub fn open_default(api: RemoteProjectApi) -> Result<Self, ProjectError> {
        let db_path = crate::app_data_dir().join("projects.db");
        Self::open(api, &db_path)
    }

    pub fn with_db(api: RemoteProjectApi, db: ProjectDb) -> Self {
        Self { api, db }
    }

    pub fn api(&self) -> &RemoteProjectApi {
        &self.api
    }

    /// Create-or-update keyed on the id state: a missing or local-temporary
    /// id means create; a backend id means update. The id transition on
    /// first successful create is recorded on the document.
    pub async fn save(&self, project: &mut Project) -> Result<SaveOutcome, ProjectError> {
        project.updated_at = Utc::now();

        if !project.has_remote_id() {
            match self.api.create(project).await {
                Ok(remote_id) => {
                    for (order, scene) in project.scenes.iter().enumerate() {
                        if let Err(err) = self.api.add_scene(&remote_id, scene, order).await {
                            log::warn!(
                                "failed to push scene {} to remote project {remote_id}: {err}",
                                scene.id
                            );
                        }
                    }
                    if let Some(old_id) = project.id.take() {
                        let _ = self.db.delete_project(&old_id);
                    }
                    project.id = Some(remote_id);
                    self.db.upsert_project(project)?;
                    Ok(SaveOutcome::Created)
                }
                Err(err) => {
                    log::warn!("remote create failed, keeping project locally: {err}");
                    if project.id.is_none() {
                        project.id = Some(local_project_id());
                    }
                    self.db.upsert_project(project)?;
                    Ok(SaveOutcome::LocalOnly)
                }
            }
        } else {
            match self.api.update(project).await {
                Ok(()) => {
                    self.db.upsert_project(project)?;
                    Ok(SaveOutcome::Updated)
                }
                Err(err) => {
                    log::warn!("remote update failed, keeping project locally: {err}");
                    self.db.upsert_project(project)?;
                    Ok(SaveOutcome::LocalOnly)
                }
            }
        }
    }

    pub async fn list(&self) -> Result<Vec<Project>, ProjectError> {
        match self.api.list().await {
            Ok(projects) => Ok(projects),
            Err(err) => {
                log::warn!("remote project list failed, falling back to local store: {err}");
                self.db.list_projects()
            }
        }
    }

    pub async fn get(&self, id: &str) -> Result<Project, ProjectError> {
        if let Some(project) = self.db.get_project(id)? {
            return Ok(project);
        }
        let projects = self.list().await?;
        projects
            .into_iter()
            .find(|p| p.id.as_deref() == Some(id))
            .ok_or_else(|| ProjectError::NotFound(id.to_string()))
    }

    /// Local delete always happens; the remote store is only consulted for
    /// backend-assigned ids.
    pub async fn delete(&self, id: &str) -> Result<(), ProjectError> {
        self.db.delete_project(id)?;
        if is_remote_id(id) {
            if let Err(err) = self.api.delete(id).await {
                log::warn!("remote delete failed for {id}: {err}");
            }
        }
        Ok(())
    }

    pub async fn delete_all(&self) -> Result<(), ProjectError> {
        let projects = self.list().await?;
        for project in &projects {
            if let Some(id) = &project.id {
                if is_remote_id(id) {
                    if let Err(err) = self.api.delete(id).await {
                        log::warn!("remote delete failed for {id}: {err}");
                    }
                }
            }
        }
        self.db.clear()
    }

    pub async fn duplicate(&self, id: &str) -> Result<Project, ProjectError> {
        let source = self.get(id).await?;
        let mut copy = source.clone();
        copy.id = None;
        copy.name = format!("{} (Copy)", source.name);
        copy.created_at = Utc::now();
        self.save(&mut copy).await?;
        Ok(copy)
    }

    /// Persists the resolved video URL remotely and mirrors it locally.
    pub async fn record_final_video_url(
        &self,
        project_id: &str,
        video_url: &str,
    ) -> Result<(), ProjectError> {
        self.api.set_final_video_url(project_id, video_url).await?;
        if let Err(err) = self.db.set_final_video_url(project_id, video_url) {
            log::warn!("failed to mirror video url locally for {project_id}: {err}");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_ids_are_never_remote() {
        let id = local_project_id();
        assert!(id.starts_with("local-"));
        assert!(!is_remote_id(&id));
    }

    #[tokio::test]
    async fn test_save_falls_back_to_local_when_remote_is_down() {
        // points at a closed port so every remote call fails fast
        let api = RemoteProjectApi::new("http://127.0.0.1:1");
        let store = ProjectStore::with_db(api, ProjectDb::open_in_memory().unwrap());

        let mut board = storyboard::Storyboard::new();
        board.add_scene("a sunrise", 10, "cinematic");
        let mut project = Project::new("Offline draft", &board, false);

        let outcome = store.save(&mut project).await.unwrap();
        assert_eq!(outcome, SaveOutcome::LocalOnly);
        let id = project.id.clone().unwrap();
        assert!(id.starts_with("local-"));

        // a later save of a local-id project is still treated as a create
        let outcome = store.save(&mut project).await.unwrap();
        assert_eq!(outcome, SaveOutcome::LocalOnly);
        assert_eq!(project.id.as_deref(), Some(id.as_str()));

        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Offline draft");
    }

    #[tokio::test]
    async fn test_delete_local_project_skips_remote() {
        let api = RemoteProjectApi::new("http://127.0.0.1:1");
        let store = ProjectStore::with_db(api, ProjectDb::open_in_memory().unwrap());

        let mut board = storyboard::Storyboard::new();
        board.add_scene("a sunrise", 10, "cinematic");
        let mut project = Project::new("Draft", &board, false);
        store.save(&mut project).await.unwrap();
        let id = project.id.clone().unwrap();

        // local id: no remote call is attempted, so this must succeed even
        // though the remote endpoint is unreachable
        store.delete(&id).await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }
}
