//! Mouse interaction with the board: hovering, grabbing, carrying and dropping toppings.
//!
//! All bookkeeping lives in [`Board`]. These systems translate mouse input and picking results
//! into board operations, then move the topping entities to wherever the board says they are.

use bevy::prelude::*;

use crate::{
    board::{Board, Release, Square},
    picking::PickSource,
    primitives::{point_at_height, DRAG_HEIGHT},
    scene::{resting_translation, BoardRng, Slot, SquareMaterials, Topping},
    GameState,
};

pub struct DragPlugin;

impl Plugin for DragPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (
                track_hover,
                grab_topping,
                carry_topping,
                release_topping,
                highlight_hovered.run_if(resource_exists::<SquareMaterials>),
            )
                .chain()
                .run_if(in_state(GameState::Playing))
                .run_if(resource_exists::<Board<Entity>>),
        );
    }
}

/// The square under the cursor, or none when the ray misses every square.
pub fn track_hover(
    sources: Query<&PickSource>,
    slots: Query<&Slot>,
    mut board: ResMut<Board<Entity>>,
) {
    let hovered = sources
        .iter()
        .find_map(PickSource::nearest)
        .and_then(|(entity, _)| slots.get(entity).ok())
        .map(|slot| slot.0);
    if board.hovered() != hovered {
        board.hover(hovered);
    }
}

pub fn grab_topping(mouse: Res<ButtonInput<MouseButton>>, mut board: ResMut<Board<Entity>>) {
    if !mouse.just_pressed(MouseButton::Left) {
        return;
    }
    let square = board.hovered();
    if let Some(topping) = board.grab() {
        debug!("Picked up {topping:?} from {square:?}");
    }
}

/// Keeps the dragged topping under the cursor, lifted above the board.
pub fn carry_topping(
    board: Res<Board<Entity>>,
    sources: Query<&PickSource>,
    mut toppings: Query<&mut Transform, With<Topping>>,
) {
    let Some(dragging) = board.dragging() else {
        return;
    };
    let Some(point) = sources
        .iter()
        .find_map(PickSource::ray)
        .and_then(|ray| point_at_height(ray, DRAG_HEIGHT))
    else {
        return;
    };
    if let Ok(mut transform) = toppings.get_mut(dragging) {
        transform.translation = point;
    }
}

pub fn release_topping(
    mouse: Res<ButtonInput<MouseButton>>,
    mut board: ResMut<Board<Entity>>,
    mut rng: ResMut<BoardRng>,
    mut toppings: Query<&mut Transform, With<Topping>>,
) {
    if !mouse.just_released(MouseButton::Left) {
        return;
    }
    let mut settle = |topping: Entity, square: Square| {
        let jitter = rng.plate_jitter();
        if let Ok(mut transform) = toppings.get_mut(topping) {
            transform.translation = resting_translation(square, jitter);
        }
    };
    match board.release() {
        None => {}
        Some(Release::Returned { item, home }) => {
            debug!("Returned {item:?} to {home:?}");
            settle(item, home);
        }
        Some(Release::Dropped {
            item,
            to,
            displaced,
        }) => {
            debug!("Dropped {item:?} on {to:?}");
            settle(item, to);
            if let Some((other, home)) = displaced {
                debug!("Moved {other:?} to {home:?}");
                settle(other, home);
            }
        }
    }
}

/// Shows the collision square under the cursor.
pub fn highlight_hovered(
    board: Res<Board<Entity>>,
    materials: Res<SquareMaterials>,
    mut squares: Query<(&Slot, &mut Handle<StandardMaterial>)>,
) {
    for (slot, mut material) in &mut squares {
        let wanted = if board.hovered() == Some(slot.0) {
            &materials.highlighted
        } else {
            &materials.idle
        };
        if *material != *wanted {
            *material = wanted.clone();
        }
    }
}
