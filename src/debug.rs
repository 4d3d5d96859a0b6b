use bevy::{color::palettes::css, prelude::*};

use crate::picking::PickSource;

/// Draws every pick ray and marks its hits: the nearest in green, anything behind it in pink.
pub fn draw_picks(sources: Query<&PickSource>, mut gizmos: Gizmos) {
    for ray in sources.iter().filter_map(|s| s.ray()) {
        let orientation = Quat::from_rotation_arc(Vec3::NEG_Z, *ray.direction);
        gizmos.sphere(ray.origin, orientation, 0.1, css::BLUE);
    }

    for (is_first, hit) in sources.iter().flat_map(|source| {
        source
            .hits()
            .iter()
            .enumerate()
            .map(|(i, (_, hit))| (i == 0, hit.clone()))
    }) {
        let color = match is_first {
            true => css::GREEN,
            false => css::PINK,
        };
        gizmos.ray(hit.position(), hit.normal(), color);
        gizmos.sphere(hit.position(), Quat::IDENTITY, 0.1, color);
        if let Some(triangle) = hit.triangle() {
            gizmos.linestrip(
                [triangle.v0, triangle.v1, triangle.v2, triangle.v0].map(Vec3::from),
                color,
            );
        }
    }
}
