//! # Model retrieval from echo3D
//!
//! Each model named in the [`ModelManifest`] is fetched with one query for its entry and one
//! download of the entry's hologram file. Fetches run one after another on a background thread
//! while the loading text names the model in flight. There is no retry and no cache: a failed model
//! is logged and the scene falls back to a stand-in mesh for it.

use std::{
    collections::{BTreeMap, HashMap},
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    thread,
    time::Duration,
};

use bevy::prelude::*;
use crossbeam_channel::{Receiver, TryRecvError};
use serde::Deserialize;

use crate::{config::PizzaConfig, error::AssetError, hud::LoadingStatus, GameState};

pub const DEFAULT_BASE_URL: &str = "https://api.echo3D.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Model file names mapped to the echo3D entries that hold them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ModelManifest {
    models: BTreeMap<String, String>,
}

impl ModelManifest {
    pub fn load(path: &Path) -> Result<Self, AssetError> {
        let text = fs::read_to_string(path).map_err(|e| AssetError::io(path, e))?;
        Self::from_json(&text, &path.display().to_string())
    }

    pub fn from_json(json: &str, what: &str) -> Result<Self, AssetError> {
        serde_json::from_str(json).map_err(|source| AssetError::Json {
            what: what.to_owned(),
            source,
        })
    }

    pub fn entry(&self, model: &str) -> Result<&str, AssetError> {
        self.models
            .get(model)
            .map(String::as_str)
            .ok_or_else(|| AssetError::UnknownModel(model.to_owned()))
    }

    /// `(model, entry id)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.models
            .iter()
            .map(|(model, entry)| (model.as_str(), entry.as_str()))
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

/// Where a retrieved model lives on disk: `root/<entry id>/<model>`.
pub fn model_path(root: &Path, manifest: &ModelManifest, model: &str) -> Result<PathBuf, AssetError> {
    Ok(root.join(manifest.entry(model)?).join(model))
}

/// Deletes the download directory. A directory that was never created is not an error.
pub fn remove_downloads(root: &Path) -> Result<(), AssetError> {
    match fs::remove_dir_all(root) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(AssetError::io(root, e)),
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    db: HashMap<String, EntryRecord>,
}

#[derive(Debug, Deserialize)]
struct EntryRecord {
    hologram: Hologram,
}

/// The stored file behind an echo3D entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Hologram {
    pub filename: String,
    #[serde(rename = "storageID")]
    pub storage_id: String,
}

impl Hologram {
    /// Picks the hologram for `entry` out of a query reply.
    pub fn from_query(entry: &str, body: &[u8]) -> Result<Self, AssetError> {
        let response: QueryResponse =
            serde_json::from_slice(body).map_err(|source| AssetError::Json {
                what: format!("echo3D reply for entry {entry}"),
                source,
            })?;
        response
            .db
            .into_iter()
            .find_map(|(id, record)| (id == entry).then_some(record.hologram))
            .ok_or_else(|| AssetError::MissingEntry(entry.to_owned()))
    }

    /// The file name with any directory parts dropped.
    pub fn local_name(&self) -> Option<&Path> {
        Path::new(&self.filename).file_name().map(Path::new)
    }
}

/// Blocking client for the echo3D query API.
#[derive(Debug, Clone)]
pub struct Echo3dClient {
    api_key: String,
    security_key: String,
    base_url: String,
    http: reqwest::blocking::Client,
}

impl Echo3dClient {
    pub fn new(api_key: String, security_key: String) -> Result<Self, AssetError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Echo3dClient {
            api_key,
            security_key,
            base_url: DEFAULT_BASE_URL.to_owned(),
            http,
        })
    }

    pub fn with_base_url(self, base_url: impl Into<String>) -> Self {
        Echo3dClient {
            base_url: base_url.into(),
            ..self
        }
    }

    /// Downloads the hologram of `entry` into `root/<entry>/` and returns the written file.
    pub fn retrieve(&self, entry: &str, root: &Path) -> Result<PathBuf, AssetError> {
        let body = self.query(entry, &[("entry", entry)])?;
        let hologram = Hologram::from_query(entry, &body)?;
        let Some(name) = hologram.local_name() else {
            return Err(AssetError::MissingEntry(entry.to_owned()));
        };

        let file = self.query(entry, &[("file", hologram.storage_id.as_str())])?;
        let dir = root.join(entry);
        fs::create_dir_all(&dir).map_err(|e| AssetError::io(&dir, e))?;
        let path = dir.join(name);
        fs::write(&path, &file).map_err(|e| AssetError::io(&path, e))?;
        debug!("Wrote {} bytes to {}", file.len(), path.display());
        Ok(path)
    }

    fn query(&self, entry: &str, params: &[(&str, &str)]) -> Result<Vec<u8>, AssetError> {
        let response = self
            .http
            .get(format!("{}/query", self.base_url))
            .query(&[
                ("key", self.api_key.as_str()),
                ("secKey", self.security_key.as_str()),
            ])
            .query(params)
            .send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(AssetError::Status {
                entry: entry.to_owned(),
                status,
            });
        }
        Ok(response.bytes()?.to_vec())
    }
}

/// Progress reported by the fetch thread.
#[derive(Debug)]
pub enum FetchEvent {
    Started(String),
    Retrieved { model: String, path: PathBuf },
    Failed { model: String, error: AssetError },
    Finished,
}

/// Retrieves every model in the manifest on a background thread, one at a time.
pub fn spawn_fetch(
    client: Echo3dClient,
    manifest: ModelManifest,
    root: PathBuf,
) -> Result<Receiver<FetchEvent>, AssetError> {
    let (tx, rx) = crossbeam_channel::unbounded();
    thread::Builder::new()
        .name("echo3d-fetch".into())
        .spawn(move || {
            for (model, entry) in manifest.iter() {
                tx.send(FetchEvent::Started(model.to_owned())).ok();
                let event = match client.retrieve(entry, &root) {
                    Ok(path) => FetchEvent::Retrieved {
                        model: model.to_owned(),
                        path,
                    },
                    Err(error) => FetchEvent::Failed {
                        model: model.to_owned(),
                        error,
                    },
                };
                tx.send(event).ok();
            }
            tx.send(FetchEvent::Finished).ok();
        })
        .map_err(AssetError::Worker)?;
    Ok(rx)
}

/// Local files for the models that are available, keyed by model file name.
#[derive(Resource, Debug, Default, Clone)]
pub struct ModelLibrary {
    paths: HashMap<String, PathBuf>,
}

impl ModelLibrary {
    pub fn insert(&mut self, model: impl Into<String>, path: PathBuf) {
        self.paths.insert(model.into(), path);
    }

    pub fn get(&self, model: &str) -> Option<&Path> {
        self.paths.get(model).map(PathBuf::as_path)
    }

    /// Collects models already on disk, e.g. from an earlier run with `--keep-downloads`.
    pub fn scan(root: &Path, manifest: &ModelManifest) -> Self {
        let mut library = ModelLibrary::default();
        for (model, _) in manifest.iter() {
            if let Ok(path) = model_path(root, manifest, model) {
                if path.is_file() {
                    library.insert(model, path);
                }
            }
        }
        library
    }
}

#[derive(Resource)]
struct FetchProgress(Receiver<FetchEvent>);

/// Runs retrieval during [`GameState::Loading`] and moves on to [`GameState::Playing`] when done.
pub struct Echo3dPlugin;

impl Plugin for Echo3dPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ModelLibrary>()
            .add_systems(OnEnter(GameState::Loading), start_retrieval)
            .add_systems(
                Update,
                poll_retrieval
                    .run_if(in_state(GameState::Loading))
                    .run_if(resource_exists::<FetchProgress>),
            );
    }
}

fn start_retrieval(
    mut commands: Commands,
    config: Res<PizzaConfig>,
    mut library: ResMut<ModelLibrary>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    let manifest = match ModelManifest::load(&config.manifest) {
        Ok(manifest) => manifest,
        Err(e) => {
            warn!("No model manifest, using stand-in meshes: {e}");
            next_state.set(GameState::Playing);
            return;
        }
    };

    let Some(credentials) = config.credentials.clone() else {
        *library = ModelLibrary::scan(&config.downloads, &manifest);
        info!(
            "Offline, {} of {} models found in {}",
            library.paths.len(),
            manifest.len(),
            config.downloads.display()
        );
        next_state.set(GameState::Playing);
        return;
    };

    let started = Echo3dClient::new(credentials.api_key, credentials.security_key)
        .and_then(|client| spawn_fetch(client, manifest, config.downloads.clone()));
    match started {
        Ok(rx) => commands.insert_resource(FetchProgress(rx)),
        Err(e) => {
            error!("Unable to retrieve models from echo3D: {e}");
            next_state.set(GameState::Playing);
        }
    }
}

fn poll_retrieval(
    mut commands: Commands,
    progress: Res<FetchProgress>,
    mut library: ResMut<ModelLibrary>,
    mut status: ResMut<LoadingStatus>,
    mut next_state: ResMut<NextState<GameState>>,
) {
    let finished = loop {
        match progress.0.try_recv() {
            Ok(FetchEvent::Started(model)) => {
                info!("Retrieving {model}");
                status.show(format!("Retrieving {model} from echo3D.\nLoading...\n"));
            }
            Ok(FetchEvent::Retrieved { model, path }) => {
                info!("Retrieved {model} to {}", path.display());
                library.insert(model, path);
            }
            Ok(FetchEvent::Failed { model, error }) => {
                error!("Failed to retrieve {model}: {error}");
            }
            Ok(FetchEvent::Finished) => break true,
            Err(TryRecvError::Empty) => break false,
            Err(TryRecvError::Disconnected) => {
                error!("The echo3D fetch thread stopped early");
                break true;
            }
        }
    };

    if finished {
        status.clear();
        commands.remove_resource::<FetchProgress>();
        next_state.set(GameState::Playing);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root(name: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!("pizza_maker_{}_{name}", std::process::id()));
        let _ = fs::remove_dir_all(&root);
        root
    }

    fn manifest() -> ModelManifest {
        ModelManifest::from_json(
            r#"{ "plate.obj": "entry-plate", "Skybox.glb": "entry-sky" }"#,
            "test manifest",
        )
        .unwrap()
    }

    #[test]
    fn manifest_lookup() {
        let manifest = manifest();
        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.entry("plate.obj").unwrap(), "entry-plate");
        assert!(matches!(
            manifest.entry("pizza.obj"),
            Err(AssetError::UnknownModel(model)) if model == "pizza.obj"
        ));
        let names: Vec<&str> = manifest.iter().map(|(model, _)| model).collect();
        assert_eq!(names, vec!["Skybox.glb", "plate.obj"]);
    }

    #[test]
    fn manifest_rejects_bad_json() {
        assert!(matches!(
            ModelManifest::from_json("[1, 2]", "bad"),
            Err(AssetError::Json { .. })
        ));
    }

    #[test]
    fn paths_follow_entry_layout() {
        let path = model_path(Path::new("downloads"), &manifest(), "Skybox.glb").unwrap();
        assert_eq!(path, Path::new("downloads/entry-sky/Skybox.glb"));
    }

    #[test]
    fn hologram_from_query_reply() {
        let body = br#"{
            "apiKey": "key",
            "db": {
                "other": { "hologram": { "filename": "x.obj", "storageID": "s0" } },
                "entry-sky": {
                    "hologram": { "filename": "models/Skybox.glb", "storageID": "s1", "type": "MODEL" }
                }
            }
        }"#;
        let hologram = Hologram::from_query("entry-sky", body).unwrap();
        assert_eq!(hologram.storage_id, "s1");
        assert_eq!(hologram.local_name(), Some(Path::new("Skybox.glb")));

        assert!(matches!(
            Hologram::from_query("missing", body),
            Err(AssetError::MissingEntry(entry)) if entry == "missing"
        ));
        assert!(matches!(
            Hologram::from_query("entry-sky", b"not json"),
            Err(AssetError::Json { .. })
        ));
    }

    #[test]
    fn scan_finds_kept_downloads() {
        let root = temp_root("scan");
        let manifest = manifest();
        let sky = model_path(&root, &manifest, "Skybox.glb").unwrap();
        fs::create_dir_all(sky.parent().unwrap()).unwrap();
        fs::write(&sky, b"glb").unwrap();

        let library = ModelLibrary::scan(&root, &manifest);
        assert_eq!(library.get("Skybox.glb"), Some(sky.as_path()));
        assert_eq!(library.get("plate.obj"), None);

        remove_downloads(&root).unwrap();
        assert!(!root.exists());
    }

    #[test]
    fn removing_missing_downloads_is_fine() {
        let root = temp_root("missing");
        assert!(remove_downloads(&root).is_ok());
    }

    #[test]
    fn failed_fetch_still_finishes() {
        let root = temp_root("unreachable");
        let client = Echo3dClient::new("key".into(), "secret".into())
            .unwrap()
            .with_base_url("http://127.0.0.1:9");
        let rx = spawn_fetch(client, manifest(), root.clone()).unwrap();
        let events: Vec<FetchEvent> = rx.iter().collect();

        assert!(matches!(events.first(), Some(FetchEvent::Started(model)) if model == "Skybox.glb"));
        let failures = events
            .iter()
            .filter(|event| matches!(event, FetchEvent::Failed { .. }))
            .count();
        assert_eq!(failures, 2);
        assert!(matches!(events.last(), Some(FetchEvent::Finished)));
        assert!(!root.exists());
    }
}
