//! # Slot picking
//!
//! A [`PickSource`] (normally the camera) builds one ray per frame, and every [`PickTarget`] is
//! tested against it. The hits are stored on the source, sorted nearest first, so gameplay systems
//! only need to read [`PickSource::nearest`].
//!
//! Targets are flat quads, which is all the board needs: every slot is a single square polygon
//! lying on the board plane. Picking runs in [`First`] so the results are ready for [`Update`].

use bevy::{
    math::{Mat4, Ray3d},
    prelude::*,
    window::PrimaryWindow,
};

use crate::{primitives::*, raycast::ray_quad_intersection};

#[derive(Default)]
pub struct SlotPickingPlugin;

impl Plugin for SlotPickingPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PickingState>().add_systems(
            First,
            (
                build_rays
                    .in_set(PickingSystem::BuildRays)
                    .run_if(|state: Res<PickingState>| state.build_rays),
                update_picks
                    .in_set(PickingSystem::UpdatePicks)
                    .run_if(|state: Res<PickingState>| state.update_picks),
            )
                .chain(),
        );

        #[cfg(feature = "debug")]
        app.add_systems(
            First,
            crate::debug::draw_picks
                .in_set(PickingSystem::DebugOverlay)
                .run_if(|state: Res<PickingState>| state.debug_overlay)
                .after(PickingSystem::UpdatePicks),
        );
    }
}

#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum PickingSystem {
    BuildRays,
    UpdatePicks,
    #[cfg(feature = "debug")]
    DebugOverlay,
}

/// Global switches for the picking systems.
#[derive(Resource, Debug, Clone)]
pub struct PickingState {
    pub build_rays: bool,
    pub update_picks: bool,
    /// Draws rays and hits with gizmos. Only has an effect with the `debug` feature.
    pub debug_overlay: bool,
}

impl Default for PickingState {
    fn default() -> Self {
        PickingState {
            build_rays: true,
            update_picks: true,
            debug_overlay: false,
        }
    }
}

impl PickingState {
    pub fn with_debug_overlay(self, debug_overlay: bool) -> Self {
        PickingState {
            debug_overlay,
            ..self
        }
    }
}

/// Marks a flat square that picking rays can hit.
///
/// The square lies in the entity's local XZ plane, centered on its origin.
#[derive(Component, Debug, Clone, Copy)]
pub struct PickTarget {
    pub half_extents: Vec2,
}

impl PickTarget {
    pub fn square(size: f32) -> Self {
        PickTarget {
            half_extents: Vec2::splat(size / 2.0),
        }
    }
}

/// Specifies the method used to generate rays.
#[derive(Clone, Debug)]
pub enum PickMethod {
    /// Use the mouse cursor to build a ray.
    Cursor,
    /// Fixed screen coordinates relative to the camera on this entity.
    Screenspace(Vec2),
    /// Cast along the entity's forward axis. Requires a [`GlobalTransform`].
    Transform,
}

/// Builds a ray every frame and records which [`PickTarget`]s it passes through.
#[derive(Component, Clone, Debug)]
pub struct PickSource {
    pub cast_method: PickMethod,
    pub ray: Option<Ray3d>,
    hits: Vec<(Entity, IntersectionData)>,
}

impl Default for PickSource {
    fn default() -> Self {
        PickSource {
            cast_method: PickMethod::Cursor,
            ray: None,
            hits: Vec::new(),
        }
    }
}

impl PickSource {
    pub fn new_cursor() -> Self {
        PickSource::default()
    }

    pub fn new_screenspace(cursor_pos_screen: Vec2) -> Self {
        PickSource {
            cast_method: PickMethod::Screenspace(cursor_pos_screen),
            ..default()
        }
    }

    /// A source that casts along its own transform. It stays inert until the entity has a
    /// [`GlobalTransform`].
    pub fn new_transform() -> Self {
        PickSource {
            cast_method: PickMethod::Transform,
            ..default()
        }
    }

    /// A source with a fixed ray. [`build_rays`] overwrites the ray every frame, so this only sticks
    /// while [`PickingState::build_rays`] is off.
    pub fn with_ray(self, ray: Ray3d) -> Self {
        PickSource {
            ray: Some(ray),
            ..self
        }
    }

    /// Every hit from the last pick, nearest first.
    pub fn hits(&self) -> &[(Entity, IntersectionData)] {
        &self.hits
    }

    pub fn nearest(&self) -> Option<(Entity, &IntersectionData)> {
        self.hits.first().map(|(entity, hit)| (*entity, hit))
    }

    pub fn ray(&self) -> Option<Ray3d> {
        self.ray
    }
}

pub fn build_rays(
    mut sources: Query<(&mut PickSource, Option<&GlobalTransform>, Option<&Camera>)>,
    window: Query<&Window, With<PrimaryWindow>>,
) {
    for (mut source, transform, camera) in &mut sources {
        source.ray = match &source.cast_method {
            PickMethod::Cursor => query_window(&window, camera, transform).and_then(
                |(window, camera, transform)| {
                    window.cursor_position().and_then(|cursor_pos| {
                        ray_from_screenspace(cursor_pos, camera, transform)
                    })
                },
            ),
            PickMethod::Screenspace(cursor_pos_screen) => {
                let cursor_pos_screen = *cursor_pos_screen;
                query_window(&window, camera, transform).and_then(|(_, camera, transform)| {
                    ray_from_screenspace(cursor_pos_screen, camera, transform)
                })
            }
            PickMethod::Transform => transform
                .map(|t| t.compute_matrix())
                .and_then(ray_from_transform),
        };
    }
}

fn query_window<'q, 'a: 'q, 'b>(
    window: &'q Query<'_, '_, &'a Window, With<PrimaryWindow>>,
    camera: Option<&'b Camera>,
    transform: Option<&'b GlobalTransform>,
) -> Option<(&'q Window, &'b Camera, &'b GlobalTransform)> {
    let window = match window.get_single() {
        Ok(window) => window,
        Err(_) => {
            error!("No primary window found, cannot cast ray");
            return None;
        }
    };
    let Some(camera) = camera else {
        error!("The PickSource casts from the screen but has no associated Camera component");
        return None;
    };
    let Some(camera_transform) = transform else {
        error!("The PickSource casts from the screen but has no associated GlobalTransform");
        return None;
    };
    Some((window, camera, camera_transform))
}

/// Tests each source's ray against every [`PickTarget`], storing hits sorted by distance.
pub fn update_picks(
    mut sources: Query<&mut PickSource>,
    targets: Query<(Entity, &PickTarget, &GlobalTransform)>,
) {
    for mut source in &mut sources {
        source.hits.clear();
        let Some(ray) = source.ray else {
            continue;
        };
        source.hits = cast_ray(ray, &targets);
    }
}

fn cast_ray(
    ray: Ray3d,
    targets: &Query<(Entity, &PickTarget, &GlobalTransform)>,
) -> Vec<(Entity, IntersectionData)> {
    let _pick_guard = info_span!("slot picking").entered();

    let max_hits = targets.iter().len();
    let (hits_tx, hits_rx) = crossbeam_channel::bounded::<(Entity, IntersectionData)>(max_hits);

    targets.par_iter().for_each(|(entity, target, transform)| {
        let local_to_world: Mat4 = transform.compute_matrix();
        if let Some(hit) = ray_quad_intersection(&ray, target.half_extents, &local_to_world) {
            hits_tx.send((entity, hit)).ok();
        }
    });
    drop(hits_tx);

    let mut hits: Vec<(Entity, IntersectionData)> = hits_rx.try_iter().collect();
    hits.sort_by(|a, b| a.1.distance().total_cmp(&b.1.distance()));
    hits
}
