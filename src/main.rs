use bevy::prelude::*;
use clap::Parser;
use pizza_maker::{config::Args, hud::TITLE, PizzaMakerPlugin};

fn main() -> AppExit {
    let args = Args::parse();

    App::new()
        .add_plugins(
            DefaultPlugins
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: TITLE.into(),
                        ..default()
                    }),
                    ..default()
                })
                // Retrieved models live under the working directory, not `assets/`.
                .set(AssetPlugin {
                    file_path: ".".into(),
                    ..default()
                }),
        )
        .add_plugins(PizzaMakerPlugin::new(args.into()))
        .run()
}
