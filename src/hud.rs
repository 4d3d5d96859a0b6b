use bevy::prelude::*;

use crate::GameState;

pub const TITLE: &str = "echo3D Pizza Maker";
pub const INSTRUCTIONS: &str =
    "It's pizza time! Pick up and drag toppings anywhere onto or off your pizza.";
pub const QUIT_HINT: &str = "ESC: Quit";

/// Text shown in the middle of the screen while models are retrieved.
#[derive(Resource, Debug, Default, Clone, PartialEq, Eq)]
pub struct LoadingStatus {
    message: Option<String>,
}

impl LoadingStatus {
    pub fn show(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }

    pub fn clear(&mut self) {
        self.message = None;
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

#[derive(Component)]
pub struct LoadingText;

pub struct HudPlugin;

impl Plugin for HudPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<LoadingStatus>()
            .add_systems(Startup, spawn_hud)
            .add_systems(
                Update,
                update_loading_text.run_if(resource_changed::<LoadingStatus>),
            )
            .add_systems(OnExit(GameState::Loading), despawn_loading_text);
    }
}

fn corner_label(text: &str, font_size: f32, style: Style) -> TextBundle {
    TextBundle::from_section(
        text,
        TextStyle {
            font_size,
            color: Color::WHITE,
            ..default()
        },
    )
    .with_style(Style {
        position_type: PositionType::Absolute,
        ..style
    })
}

/// A full-width row so centered text lines up with the middle of the window.
fn centered_row(top: Val) -> NodeBundle {
    NodeBundle {
        style: Style {
            position_type: PositionType::Absolute,
            top,
            width: Val::Percent(100.0),
            justify_content: JustifyContent::Center,
            ..default()
        },
        ..default()
    }
}

fn spawn_hud(mut commands: Commands) {
    commands
        .spawn(centered_row(Val::Percent(3.0)))
        .with_children(|row| {
            row.spawn(TextBundle::from_section(
                TITLE,
                TextStyle {
                    font_size: 34.0,
                    color: Color::WHITE,
                    ..default()
                },
            ));
        });
    commands
        .spawn(centered_row(Val::Percent(9.0)))
        .with_children(|row| {
            row.spawn(TextBundle::from_section(
                INSTRUCTIONS,
                TextStyle {
                    font_size: 22.0,
                    color: Color::WHITE,
                    ..default()
                },
            ));
        });
    commands
        .spawn(centered_row(Val::Percent(48.0)))
        .with_children(|row| {
            row.spawn((
                LoadingText,
                TextBundle::from_section(
                    "",
                    TextStyle {
                        font_size: 30.0,
                        color: Color::WHITE,
                        ..default()
                    },
                )
                .with_text_justify(JustifyText::Center),
            ));
        });
    commands.spawn(corner_label(
        QUIT_HINT,
        20.0,
        Style {
            bottom: Val::Px(12.0),
            left: Val::Px(12.0),
            ..default()
        },
    ));
}

fn update_loading_text(
    status: Res<LoadingStatus>,
    mut texts: Query<&mut Text, With<LoadingText>>,
) {
    for mut text in &mut texts {
        if let Some(section) = text.sections.first_mut() {
            section.value = status.message().unwrap_or_default().to_owned();
        }
    }
}

fn despawn_loading_text(mut commands: Commands, texts: Query<Entity, With<LoadingText>>) {
    for entity in &texts {
        commands.entity(entity).despawn_recursive();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loading_text_tracks_status() {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins)
            .add_plugins(bevy::state::app::StatesPlugin)
            .init_state::<GameState>()
            .add_plugins(HudPlugin);
        app.update();

        app.world_mut()
            .resource_mut::<LoadingStatus>()
            .show("Retrieving plate.obj from echo3D.");
        app.update();

        let mut texts = app
            .world_mut()
            .query_filtered::<&Text, With<LoadingText>>();
        let text = texts.single(app.world());
        assert_eq!(text.sections[0].value, "Retrieving plate.obj from echo3D.");

        app.world_mut()
            .resource_mut::<NextState<GameState>>()
            .set(GameState::Playing);
        app.update();
        app.update();
        let mut texts = app
            .world_mut()
            .query_filtered::<&Text, With<LoadingText>>();
        assert_eq!(texts.iter(app.world()).count(), 0);
    }
}
