use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use generation::{
    CaptionSettings, GenerationController, HttpVideoService, ServiceConfig, SubmitOutcome,
};
use project::{format_save_age, ProjectStore, RemoteProjectApi};
use std::path::PathBuf;
use std::sync::Arc;
use storyboard::{derive_tracks, preset_name};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "storyreel-cli")]
#[command(about = "Storyreel CLI - Headless storyboard-to-video operations")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true)]
    verbose: bool,

    /// Service configuration file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the generation service endpoint
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Override the local media host
    #[arg(long, global = true)]
    media_host: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new project
    New {
        /// Project name
        name: String,
    },

    /// Append a scene to a project
    AddScene {
        /// Project id
        #[arg(short, long)]
        project: String,

        /// Scene prompt text
        prompt: String,

        /// Scene duration in seconds (5-30)
        #[arg(short, long, default_value = "10")]
        duration: u32,

        /// Scene style tag
        #[arg(short, long, default_value = "cinematic")]
        style: String,
    },

    /// Edit a scene in place
    EditScene {
        /// Project id
        #[arg(short, long)]
        project: String,

        /// Scene id
        #[arg(short, long)]
        scene: String,

        /// New prompt text
        prompt: String,

        /// New duration in seconds (5-30)
        #[arg(short, long, default_value = "10")]
        duration: u32,

        /// New style tag
        #[arg(long, default_value = "cinematic")]
        style: String,
    },

    /// Remove a scene
    RemoveScene {
        /// Project id
        #[arg(short, long)]
        project: String,

        /// Scene id
        scene: String,
    },

    /// Move a scene to a new position
    Reorder {
        /// Project id
        #[arg(short, long)]
        project: String,

        /// Current scene index (0-based)
        from: usize,

        /// Target scene index (0-based)
        to: usize,
    },

    /// List a project's scenes
    Scenes {
        /// Project id
        project: String,
    },

    /// Generate voice-over narration
    Voiceover {
        /// Project id
        #[arg(short, long)]
        project: String,

        /// Scene id (omit with --all)
        #[arg(short, long)]
        scene: Option<String>,

        /// Narration text (defaults to the scene prompt)
        #[arg(short, long)]
        text: Option<String>,

        /// Voice type
        #[arg(long, default_value = "en-US-Neural2-C")]
        voice: String,

        /// Generate narration for every scene from its prompt
        #[arg(long)]
        all: bool,
    },

    /// Submit a rendering job and poll it to completion
    Generate {
        /// Project id
        #[arg(short, long)]
        project: String,

        /// Burn captions into the video
        #[arg(long)]
        captions: bool,

        /// Caption type
        #[arg(long, default_value = "standard")]
        caption_type: String,

        /// Caption font size
        #[arg(long, default_value = "medium")]
        caption_font_size: String,

        /// Add background music
        #[arg(long)]
        background_music: bool,
    },

    /// Print the derived audio-track timeline
    Tracks {
        /// Project id
        project: String,
    },

    /// Manage saved projects
    Projects {
        #[command(subcommand)]
        action: ProjectAction,
    },

    /// Download the final video to disk
    Download {
        /// Project id
        #[arg(short, long)]
        project: String,

        /// Output directory (defaults to the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ProjectAction {
    /// List saved projects
    List,

    /// Delete one project
    Delete {
        /// Project id
        id: String,
    },

    /// Delete every saved project
    DeleteAll,

    /// Duplicate a project
    Duplicate {
        /// Project id
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt().with_max_level(level).init();

    let config = load_config(&cli)?;

    match cli.command {
        Commands::New { name } => new_command(config, name).await,
        Commands::AddScene {
            project,
            prompt,
            duration,
            style,
        } => add_scene_command(config, project, prompt, duration, style).await,
        Commands::EditScene {
            project,
            scene,
            prompt,
            duration,
            style,
        } => edit_scene_command(config, project, scene, prompt, duration, style).await,
        Commands::RemoveScene { project, scene } => {
            remove_scene_command(config, project, scene).await
        }
        Commands::Reorder { project, from, to } => reorder_command(config, project, from, to).await,
        Commands::Scenes { project } => scenes_command(config, project).await,
        Commands::Voiceover {
            project,
            scene,
            text,
            voice,
            all,
        } => voiceover_command(config, project, scene, text, voice, all).await,
        Commands::Generate {
            project,
            captions,
            caption_type,
            caption_font_size,
            background_music,
        } => {
            let captions = if captions {
                CaptionSettings::enabled(caption_type, caption_font_size)
            } else {
                CaptionSettings::disabled()
            };
            generate_command(config, project, captions, background_music).await
        }
        Commands::Tracks { project } => tracks_command(config, project).await,
        Commands::Projects { action } => projects_command(config, action).await,
        Commands::Download { project, output } => download_command(config, project, output).await,
    }
}

fn load_config(cli: &Cli) -> Result<ServiceConfig> {
    let mut config = match &cli.config {
        Some(path) => ServiceConfig::load(path)
            .with_context(|| format!("failed to load service config from {path:?}"))?,
        None => ServiceConfig::default(),
    };
    if let Some(url) = &cli.api_url {
        config.api_url = url.clone();
    }
    if let Some(host) = &cli.media_host {
        config.media_host = host.clone();
    }
    Ok(config)
}

fn open_store(config: &ServiceConfig) -> Result<ProjectStore> {
    let api = RemoteProjectApi::new(config.api_url.clone());
    Ok(ProjectStore::open_default(api)?)
}

async fn new_command(config: ServiceConfig, name: String) -> Result<()> {
    let store = open_store(&config)?;
    let board = storyboard::Storyboard::new();
    let mut project = project::Project::new(name.as_str(), &board, false);

    let outcome = store.save(&mut project).await?;
    let id = project.id.as_deref().unwrap_or("?");
    info!("Created project '{name}' ({id}, {outcome:?})");
    Ok(())
}

async fn add_scene_command(
    config: ServiceConfig,
    project_id: String,
    prompt: String,
    duration: u32,
    style: String,
) -> Result<()> {
    let store = open_store(&config)?;
    let mut project = store.get(&project_id).await?;
    let mut board = project.storyboard();

    let scene_id = board.add_scene(prompt, duration, style);
    project.sync_from(&board);
    store.save(&mut project).await?;

    info!(
        "Added scene {scene_id} ({} scenes, {}s total)",
        board.len(),
        board.total_duration_secs()
    );
    Ok(())
}

async fn edit_scene_command(
    config: ServiceConfig,
    project_id: String,
    scene_id: String,
    prompt: String,
    duration: u32,
    style: String,
) -> Result<()> {
    let store = open_store(&config)?;
    let mut project = store.get(&project_id).await?;
    let mut board = project.storyboard();

    board.edit_scene(&scene_id, prompt, duration, style)?;
    project.sync_from(&board);
    store.save(&mut project).await?;

    info!("Updated scene {scene_id}");
    Ok(())
}

async fn remove_scene_command(
    config: ServiceConfig,
    project_id: String,
    scene_id: String,
) -> Result<()> {
    let store = open_store(&config)?;
    let mut project = store.get(&project_id).await?;
    let mut board = project.storyboard();

    board.remove_scene(&scene_id)?;
    project.sync_from(&board);
    store.save(&mut project).await?;

    info!("Removed scene {scene_id} ({} scenes left)", board.len());
    Ok(())
}

async fn reorder_command(
    config: ServiceConfig,
    project_id: String,
    from: usize,
    to: usize,
) -> Result<()> {
    let store = open_store(&config)?;
    let mut project = store.get(&project_id).await?;
    let mut board = project.storyboard();

    board.move_scene(from, to)?;
    project.sync_from(&board);
    store.save(&mut project).await?;

    info!("Moved scene {from} -> {to}");
    Ok(())
}

async fn scenes_command(config: ServiceConfig, project_id: String) -> Result<()> {
    let store = open_store(&config)?;
    let project = store.get(&project_id).await?;

    println!(
        "{}: {} scenes, {}s total",
        project.name,
        project.scenes.len(),
        project.total_duration
    );
    for (index, scene) in project.scenes.iter().enumerate() {
        let voice = if scene.has_voiced_audio() { " [voice]" } else { "" };
        println!(
            "  {index}: {} ({}s, {} style, {:?}){voice}",
            scene.id, scene.duration_secs, scene.style, scene.status
        );
        println!("     {}", scene.prompt);
    }
    Ok(())
}

async fn voiceover_command(
    config: ServiceConfig,
    project_id: String,
    scene_id: Option<String>,
    text: Option<String>,
    voice: String,
    all: bool,
) -> Result<()> {
    let store = Arc::new(open_store(&config)?);
    let mut project = store.get(&project_id).await?;
    let service = Arc::new(HttpVideoService::new(&config)?);
    let controller = GenerationController::new(service, store.clone(), config);
    controller.set_project_id(project.id.clone());

    if all {
        let total = project.scenes.len();
        info!("Generating voice-overs for {total} scene(s)...");
        controller
            .generate_all_voiceovers(&project.scenes, |done, total| {
                info!("Generating voice {done}/{total}...")
            })
            .await?;
        info!("All {total} voice-overs ready");
        return Ok(());
    }

    let scene_id = scene_id.ok_or_else(|| anyhow!("--scene is required unless --all is set"))?;
    let mut board = project.storyboard();
    let scene = board
        .scene_mut(&scene_id)
        .ok_or_else(|| anyhow!("scene not found: {scene_id}"))?;
    let narration = text.unwrap_or_else(|| scene.prompt.clone());

    let audio_url = controller.generate_voiceover(scene, &narration, &voice).await?;
    project.sync_from(&board);
    store.save(&mut project).await?;

    match audio_url {
        Some(url) => info!("Voice-over ready: {url}"),
        None => warn!("Voice-over generated without an audio url"),
    }
    Ok(())
}

async fn generate_command(
    config: ServiceConfig,
    project_id: String,
    captions: CaptionSettings,
    background_music: bool,
) -> Result<()> {
    let store = Arc::new(open_store(&config)?);
    let project = store.get(&project_id).await?;
    let board = project.storyboard();
    let style_name = preset_name(&board.selected_preset);

    let service = Arc::new(HttpVideoService::new(&config)?);
    let mut controller = GenerationController::new(service, store.clone(), config);
    controller.set_project_id(project.id.clone());

    let mut rx = controller.subscribe();
    info!(
        "Generating video with {} scene(s), style {style_name}...",
        board.len()
    );
    let outcome = controller
        .generate(&board.scenes, &style_name, captions, background_music)
        .await?;

    match outcome {
        SubmitOutcome::FireAndForget => {
            info!("Video generation started; the service reported no job to track");
            return Ok(());
        }
        SubmitOutcome::Polling(job_id) => info!("Job {job_id} submitted, polling..."),
    }

    loop {
        if rx.changed().await.is_err() {
            break;
        }
        let state = rx.borrow_and_update().clone();
        info!("{}", state.status_line());
        if state.is_terminal() {
            if let Some(url) = state.video_url() {
                info!("Video ready: {url}");
            }
            break;
        }
    }
    controller.join_poll().await;
    Ok(())
}

async fn tracks_command(config: ServiceConfig, project_id: String) -> Result<()> {
    let store = open_store(&config)?;
    let project = store.get(&project_id).await?;
    let tracks = derive_tracks(&project.scenes);

    if tracks.is_empty() {
        println!("No audio tracks yet. Add voice-overs to scenes to see them here.");
        return Ok(());
    }
    println!("{:>8}  {:>8}  narration", "start", "length");
    for track in &tracks {
        println!(
            "{:>7.1}s  {:>7.1}s  {}",
            track.start_secs, track.duration_secs, track.text
        );
    }
    Ok(())
}

async fn projects_command(config: ServiceConfig, action: ProjectAction) -> Result<()> {
    let store = open_store(&config)?;

    match action {
        ProjectAction::List => {
            let projects = store.list().await?;
            if projects.is_empty() {
                println!("No saved projects.");
                return Ok(());
            }
            let now = chrono::Utc::now();
            for project in &projects {
                let id = project.id.as_deref().unwrap_or("?");
                let video = if project.final_video_url.is_some() {
                    " [video]"
                } else {
                    ""
                };
                println!(
                    "{id}  {}: {} scenes, {}s, saved {}{video}",
                    project.name,
                    project.scenes.len(),
                    project.total_duration,
                    format_save_age(project.updated_at, now)
                );
            }
        }
        ProjectAction::Delete { id } => {
            store.delete(&id).await?;
            info!("Deleted project {id}");
        }
        ProjectAction::DeleteAll => {
            store.delete_all().await?;
            info!("Deleted all projects");
        }
        ProjectAction::Duplicate { id } => {
            let copy = store.duplicate(&id).await?;
            info!(
                "Duplicated {id} as '{}' ({})",
                copy.name,
                copy.id.as_deref().unwrap_or("?")
            );
        }
    }
    Ok(())
}

async fn download_command(
    config: ServiceConfig,
    project_id: String,
    output: Option<PathBuf>,
) -> Result<()> {
    let store = open_store(&config)?;
    let project = store.get(&project_id).await?;
    let video_url = project
        .final_video_url
        .clone()
        .ok_or_else(|| anyhow!("no video available to download; generate one first"))?;

    let file_name = format!(
        "{}_{}.mp4",
        file_safe_name(&project.name),
        chrono::Utc::now().timestamp_millis()
    );
    let dest = output.unwrap_or_else(|| PathBuf::from(".")).join(file_name);

    info!("Downloading {video_url}");
    let response = reqwest::get(&video_url).await?;
    if !response.status().is_success() {
        anyhow::bail!("download failed: {}", response.status());
    }
    let bytes = response.bytes().await?;
    std::fs::write(&dest, &bytes)?;

    info!("Saved {} bytes to {:?}", bytes.len(), dest);
    Ok(())
}

fn file_safe_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_safe_name_collapses_whitespace() {
        assert_eq!(file_safe_name("Launch  teaser v2"), "Launch_teaser_v2");
        assert_eq!(file_safe_name("solo"), "solo");
    }
}
