//! A small Bevy demo: drag toppings onto and off a pizza.
//!
//! The pizza is an 8x8 grid of squares with the corners cropped, flanked by four supply plates.
//! A ray from the camera through the cursor picks the square under the mouse; the
//! [`board::Board`] resource does all the bookkeeping for grabs, swaps and plate stacks. Models
//! can optionally be retrieved from echo3D before play begins.

pub mod board;
pub mod config;
#[cfg(feature = "debug")]
pub mod debug;
pub mod drag;
pub mod echo3d;
pub mod error;
pub mod hud;
pub mod picking;
pub mod primitives;
pub mod raycast;
pub mod scene;

use bevy::{app::AppExit, prelude::*};

use crate::{
    config::PizzaConfig,
    drag::DragPlugin,
    echo3d::{remove_downloads, Echo3dPlugin},
    hud::HudPlugin,
    picking::{PickingState, SlotPickingPlugin},
    scene::{BoardRng, ScenePlugin},
};

pub mod prelude {
    pub use crate::{
        board::{Board, Release, Square, ToppingKind},
        config::{Args, PizzaConfig},
        error::{AssetError, BoardError},
        picking::{PickSource, PickTarget, SlotPickingPlugin},
        scene::{Slot, Topping},
        GameState, PizzaMakerPlugin,
    };
}

/// Models are retrieved while [`GameState::Loading`]; the board is built on entering
/// [`GameState::Playing`].
#[derive(States, Debug, Default, Clone, PartialEq, Eq, Hash)]
pub enum GameState {
    #[default]
    Loading,
    Playing,
}

/// Everything except the window and rendering, which come from `DefaultPlugins`.
pub struct PizzaMakerPlugin {
    pub config: PizzaConfig,
}

impl PizzaMakerPlugin {
    pub fn new(config: PizzaConfig) -> Self {
        PizzaMakerPlugin { config }
    }
}

impl Plugin for PizzaMakerPlugin {
    fn build(&self, app: &mut App) {
        let picking = PickingState::default().with_debug_overlay(self.config.show_collisions);
        app.insert_resource(self.config.clone())
            .insert_resource(BoardRng::new(self.config.seed))
            .insert_resource(picking)
            .init_state::<GameState>()
            .add_plugins((
                SlotPickingPlugin,
                Echo3dPlugin,
                HudPlugin,
                ScenePlugin,
                DragPlugin,
            ))
            .add_systems(Update, exit_on_escape);
    }
}

/// Deletes the download directory, unless asked to keep it, and quits.
pub fn exit_on_escape(
    keys: Res<ButtonInput<KeyCode>>,
    config: Res<PizzaConfig>,
    mut exit: EventWriter<AppExit>,
) {
    if !keys.just_pressed(KeyCode::Escape) {
        return;
    }
    if !config.keep_downloads {
        match remove_downloads(&config.downloads) {
            Ok(()) => info!("Removed {}", config.downloads.display()),
            Err(e) => error!("Could not clean up downloads: {e}"),
        }
    }
    exit.send(AppExit::Success);
}
