use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use storyboard::{Scene, Storyboard};
use thiserror::Error;

mod store;
pub use store::*;

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("project has no identifier")]
    MissingId,
    #[error("project not found: {0}")]
    NotFound(String),
    #[error("remote store error: {0}")]
    Remote(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Db(#[from] rusqlite::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub fn app_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(std::env::temp_dir);
    base.join("storyreel")
}

/// Backend-assigned ids are 24-hex document ids; anything else is a local
/// temporary id. The distinction gates create-vs-update and remote deletes.
pub fn is_remote_id(id: &str) -> bool {
    id.len() == 24 && id.chars().all(|c| c.is_ascii_hexdigit())
}

/// Saved editing session: the scene sequence plus presentation settings and
/// the resolved final video URL. `id` stays `None` until the first
/// successful remote save assigns one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub scenes: Vec<Scene>,
    pub total_duration: u32,
    pub selected_preset: String,
    pub voice_over_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_video_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub fn new(name: impl Into<String>, board: &Storyboard, voice_over_enabled: bool) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            name: name.into(),
            scenes: board.scenes.clone(),
            total_duration: board.total_duration_secs(),
            selected_preset: board.selected_preset.clone(),
            voice_over_enabled,
            final_video_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_remote_id(&self) -> bool {
        self.id.as_deref().map(is_remote_id).unwrap_or(false)
    }

    /// Copies the current scene sequence back into the document before a
    /// save.
    pub fn sync_from(&mut self, board: &Storyboard) {
        self.scenes = board.scenes.clone();
        self.total_duration = board.total_duration_secs();
        self.selected_preset = board.selected_preset.clone();
    }

    pub fn storyboard(&self) -> Storyboard {
        Storyboard {
            scenes: self.scenes.clone(),
            selected_preset: self.selected_preset.clone(),
        }
    }
}

/// Relative age of the last save, for the editor header.
pub fn format_save_age(updated_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (now - updated_at).num_minutes();
    if minutes < 1 {
        return "just now".to_string();
    }
    if minutes < 60 {
        return format!("{minutes}m ago");
    }
    let hours = minutes / 60;
    if hours < 24 {
        return format!("{hours}h ago");
    }
    format!("{}d ago", hours / 24)
}

/// Local fallback store. Project documents are kept as JSON rows so the
/// schema never chases the document shape.
pub struct ProjectDb {
    conn: Mutex<Connection>,
}

impl ProjectDb {
    pub fn open_or_create(path: &Path) -> Result<Self, ProjectError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let conn = Connection::open(path)?;
        // Recommended PRAGMAs for a local interactive app DB
        conn.pragma_update(None, "journal_mode", &"WAL")?;
        conn.pragma_update(None, "synchronous", &"NORMAL")?;
        conn.pragma_update(None, "foreign_keys", &"ON")?;
        apply_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self, ProjectError> {
        let conn = Connection::open_in_memory()?;
        apply_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn upsert_project(&self, project: &Project) -> Result<(), ProjectError> {
        let id = project.id.as_deref().ok_or(ProjectError::MissingId)?;
        let doc = serde_json::to_string(project)?;
        self.conn.lock().unwrap().execute(
            "INSERT OR REPLACE INTO projects(id, name, doc_json, created_at, updated_at) VALUES(?1, ?2, ?3, ?4, ?5)",
            params![
                id,
                project.name,
                doc,
                project.created_at.timestamp(),
                project.updated_at.timestamp()
            ],
        )?;
        Ok(())
    }

    pub fn list_projects(&self) -> Result<Vec<Project>, ProjectError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT doc_json FROM projects ORDER BY updated_at DESC")?;
        let mut rows = stmt.query([])?;
        let mut projects = Vec::new();
        while let Some(row) = rows.next()? {
            let raw: String = row.get(0)?;
            match serde_json::from_str(&raw) {
                Ok(project) => projects.push(project),
                Err(err) => log::warn!("skipping unreadable project row: {err}"),
            }
        }
        Ok(projects)
    }

    pub fn get_project(&self, id: &str) -> Result<Option<Project>, ProjectError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare("SELECT doc_json FROM projects WHERE id = ?1 LIMIT 1")?;
        let mut rows = stmt.query(params![id])?;
        if let Some(row) = rows.next()? {
            let raw: String = row.get(0)?;
            Ok(Some(serde_json::from_str(&raw)?))
        } else {
            Ok(None)
        }
    }

    pub fn delete_project(&self, id: &str) -> Result<bool, ProjectError> {
        let affected = self
            .conn
            .lock()
            .unwrap()
            .execute("DELETE FROM projects WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    }

    pub fn clear(&self) -> Result<(), ProjectError> {
        self.conn.lock().unwrap().execute("DELETE FROM projects", [])?;
        Ok(())
    }

    /// Partial update mirroring the remote one; a missing local row is fine.
    pub fn set_final_video_url(&self, id: &str, video_url: &str) -> Result<(), ProjectError> {
        let Some(mut project) = self.get_project(id)? else {
            return Ok(());
        };
        project.final_video_url = Some(video_url.to_string());
        project.updated_at = Utc::now();
        self.upsert_project(&project)
    }
}

fn apply_migrations(conn: &Connection) -> Result<(), ProjectError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS projects(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            doc_json TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );",
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_project(name: &str) -> Project {
        let mut board = Storyboard::new();
        board.add_scene("a sunrise", 10, "cinematic");
        board.add_scene("a city street", 15, "documentary");
        Project::new(name, &board, false)
    }

    #[test]
    fn test_remote_id_detection() {
        assert!(is_remote_id("507f1f77bcf86cd799439011"));
        assert!(!is_remote_id("local-3f2b"));
        assert!(!is_remote_id("1700000000000"));
        assert!(!is_remote_id("507f1f77bcf86cd79943901")); // 23 chars
        assert!(!is_remote_id("507f1f77bcf86cd79943901z"));
    }

    #[test]
    fn test_format_save_age() {
        let now = Utc::now();
        assert_eq!(format_save_age(now, now), "just now");
        assert_eq!(format_save_age(now - Duration::minutes(5), now), "5m ago");
        assert_eq!(format_save_age(now - Duration::hours(3), now), "3h ago");
        assert_eq!(format_save_age(now - Duration::days(2), now), "2d ago");
    }

    #[test]
    fn test_db_roundtrip() {
        let db = ProjectDb::open_in_memory().unwrap();
        let mut project = sample_project("Launch teaser");
        project.id = Some("local-abc".to_string());
        db.upsert_project(&project).unwrap();

        let loaded = db.get_project("local-abc").unwrap().unwrap();
        assert_eq!(loaded, project);
        assert_eq!(db.list_projects().unwrap().len(), 1);

        assert!(db.delete_project("local-abc").unwrap());
        assert!(!db.delete_project("local-abc").unwrap());
        assert!(db.get_project("local-abc").unwrap().is_none());
    }

    #[test]
    fn test_upsert_requires_id() {
        let db = ProjectDb::open_in_memory().unwrap();
        let project = sample_project("No id yet");
        assert!(matches!(
            db.upsert_project(&project),
            Err(ProjectError::MissingId)
        ));
    }

    #[test]
    fn test_set_final_video_url_updates_row() {
        let db = ProjectDb::open_in_memory().unwrap();
        let mut project = sample_project("Teaser");
        project.id = Some("507f1f77bcf86cd799439011".to_string());
        db.upsert_project(&project).unwrap();

        db.set_final_video_url("507f1f77bcf86cd799439011", "http://cdn/x.mp4")
            .unwrap();
        let loaded = db.get_project("507f1f77bcf86cd799439011").unwrap().unwrap();
        assert_eq!(loaded.final_video_url.as_deref(), Some("http://cdn/x.mp4"));

        // missing row is not an error
        db.set_final_video_url("missing", "http://cdn/y.mp4").unwrap();
    }

    #[test]
    fn test_project_serialization_shape() {
        let project = sample_project("Teaser");
        let json = serde_json::to_value(&project).unwrap();
        assert!(json.get("id").is_none());
        assert_eq!(json["totalDuration"], 25);
        assert_eq!(json["voiceOverEnabled"], false);
        assert_eq!(json["selectedPreset"], "1");
        assert_eq!(json["scenes"][0]["duration"], 10);
    }
}
