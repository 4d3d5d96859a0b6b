use std::path::PathBuf;

use bevy::prelude::Resource;
use clap::Parser;

/// Drag toppings onto and off a pizza.
///
/// Models are retrieved from echo3D when both keys are given. Without them the demo runs on
/// built-in stand-in meshes.
#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub struct Args {
    /// Your echo3D API key.
    #[arg(env = "ECHO3D_API_KEY")]
    pub api_key: Option<String>,
    /// Your echo3D security key.
    #[arg(env = "ECHO3D_SECURITY_KEY")]
    pub security_key: Option<String>,
    /// Skip model retrieval even if keys are available.
    #[arg(long)]
    pub offline: bool,
    /// JSON file mapping model file names to echo3D entry ids.
    #[arg(long, default_value = "models.json")]
    pub manifest: PathBuf,
    /// Where retrieved models are written. Deleted on exit.
    #[arg(long, default_value = "downloads")]
    pub downloads: PathBuf,
    /// Seed for the initial topping layout.
    #[arg(long)]
    pub seed: Option<u64>,
    /// Draw pick rays and hits.
    #[arg(long)]
    pub show_collisions: bool,
    /// Leave the download directory in place on exit.
    #[arg(long)]
    pub keep_downloads: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub security_key: String,
}

/// Settings for a run of the demo, built from the command line.
#[derive(Resource, Debug, Clone, PartialEq, Eq)]
pub struct PizzaConfig {
    /// `None` runs offline.
    pub credentials: Option<Credentials>,
    pub manifest: PathBuf,
    pub downloads: PathBuf,
    pub seed: Option<u64>,
    pub show_collisions: bool,
    pub keep_downloads: bool,
}

impl Default for PizzaConfig {
    fn default() -> Self {
        PizzaConfig {
            credentials: None,
            manifest: PathBuf::from("models.json"),
            downloads: PathBuf::from("downloads"),
            seed: None,
            show_collisions: false,
            keep_downloads: false,
        }
    }
}

impl PizzaConfig {
    pub fn is_offline(&self) -> bool {
        self.credentials.is_none()
    }
}

impl From<Args> for PizzaConfig {
    fn from(args: Args) -> Self {
        let credentials = match (args.offline, args.api_key, args.security_key) {
            (false, Some(api_key), Some(security_key)) => Some(Credentials {
                api_key,
                security_key,
            }),
            _ => None,
        };
        PizzaConfig {
            credentials,
            manifest: args.manifest,
            downloads: args.downloads,
            seed: args.seed,
            show_collisions: args.show_collisions,
            keep_downloads: args.keep_downloads,
        }
    }
}
