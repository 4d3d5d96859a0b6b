use std::f32::EPSILON;

use bevy::math::{Mat4, Ray3d, Vec2, Vec3, Vec3A};

use crate::primitives::*;

#[derive(Copy, Clone, Default)]
pub enum Backfaces {
    #[default]
    Cull,
    Include,
}

/// Takes a ray and triangle and computes the intersection and normal
#[inline(always)]
pub fn ray_triangle_intersection(
    ray: &Ray3d,
    triangle: &Triangle,
    backface_culling: Backfaces,
) -> Option<RayHit> {
    raycast_moller_trumbore(ray, triangle, backface_culling)
}

#[derive(Default, Debug)]
pub struct RayHit {
    distance: f32,
    uv_coords: (f32, f32),
}

impl RayHit {
    /// Get a reference to the intersection's uv coords.
    pub fn uv_coords(&self) -> &(f32, f32) {
        &self.uv_coords
    }

    /// Get a reference to the intersection's distance.
    pub fn distance(&self) -> &f32 {
        &self.distance
    }
}

/// Implementation of the Möller-Trumbore ray-triangle intersection test
pub fn raycast_moller_trumbore(
    ray: &Ray3d,
    triangle: &Triangle,
    backface_culling: Backfaces,
) -> Option<RayHit> {
    // Source: https://www.scratchapixel.com/lessons/3d-basic-rendering/ray-tracing-rendering-a-triangle/moller-trumbore-ray-triangle-intersection
    let origin = Vec3A::from(ray.origin);
    let direction = Vec3A::from(*ray.direction);
    let vector_v0_to_v1: Vec3A = triangle.v1 - triangle.v0;
    let vector_v0_to_v2: Vec3A = triangle.v2 - triangle.v0;
    let p_vec: Vec3A = direction.cross(vector_v0_to_v2);
    let determinant: f32 = vector_v0_to_v1.dot(p_vec);

    match backface_culling {
        Backfaces::Cull => {
            // if the determinant is negative the triangle is back facing
            // if the determinant is close to 0, the ray misses the triangle
            // This test checks both cases
            if determinant < EPSILON {
                return None;
            }
        }
        Backfaces::Include => {
            // ray and triangle are parallel if det is close to 0
            if determinant.abs() < EPSILON {
                return None;
            }
        }
    }

    let determinant_inverse = 1.0 / determinant;

    let t_vec = origin - triangle.v0;
    let u = t_vec.dot(p_vec) * determinant_inverse;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q_vec = t_vec.cross(vector_v0_to_v1);
    let v = direction.dot(q_vec) * determinant_inverse;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    // The distance between ray origin and intersection is t.
    let t: f32 = vector_v0_to_v2.dot(q_vec) * determinant_inverse;

    Some(RayHit {
        distance: t,
        uv_coords: (u, v),
    })
}

/// The two triangles of a flat quad lying in its local XZ plane, facing +Y.
pub fn quad_triangles(half_extents: Vec2) -> [Triangle; 2] {
    let Vec2 { x, y: z } = half_extents;
    let corners = [
        Vec3::new(-x, 0.0, -z),
        Vec3::new(-x, 0.0, z),
        Vec3::new(x, 0.0, z),
        Vec3::new(x, 0.0, -z),
    ];
    [
        Triangle::from([corners[0], corners[1], corners[2]]),
        Triangle::from([corners[0], corners[2], corners[3]]),
    ]
}

/// Intersects a world-space ray with a flat quad.
///
/// The quad lies in the local XZ plane of `local_to_world` and is hit from either side. The ray is
/// moved into quad space for the triangle tests, and the nearest hit is moved back out so distance,
/// position and normal are all in world units.
pub fn ray_quad_intersection(
    ray: &Ray3d,
    half_extents: Vec2,
    local_to_world: &Mat4,
) -> Option<IntersectionData> {
    let world_to_local = local_to_world.inverse();
    let local_direction = world_to_local.transform_vector3(*ray.direction);
    let local_ray = Ray3d {
        origin: world_to_local.transform_point3(ray.origin),
        direction: bevy::math::Dir3::new(local_direction).ok()?,
    };

    let (triangle, hit) = quad_triangles(half_extents)
        .into_iter()
        .filter_map(|triangle| {
            ray_triangle_intersection(&local_ray, &triangle, Backfaces::Include)
                .filter(|hit| *hit.distance() >= 0.0)
                .map(|hit| (triangle, hit))
        })
        .min_by(|(_, a), (_, b)| a.distance().total_cmp(b.distance()))?;

    let position = local_to_world.transform_point3(local_ray.get_point(*hit.distance()));
    let world_triangle = triangle.transformed(local_to_world);
    let mut normal = Vec3::from(world_triangle.normal());
    if normal.dot(*ray.direction) > 0.0 {
        normal = -normal;
    }
    Some(IntersectionData::new(
        position,
        normal,
        position.distance(ray.origin),
        Some(world_triangle),
    ))
}

#[cfg(test)]
mod tests {
    use bevy::math::{Quat, Vec3};

    use super::*;

    // Triangle vertices to be used in a left-hand coordinate system
    const V0: [f32; 3] = [1.0, -1.0, 2.0];
    const V1: [f32; 3] = [1.0, 2.0, -1.0];
    const V2: [f32; 3] = [1.0, -1.0, -1.0];

    #[test]
    fn raycast_triangle_mt() {
        let triangle = Triangle::from([Vec3A::from(V0), V1.into(), V2.into()]);
        let ray = Ray3d::new(Vec3::ZERO, Vec3::X);
        let result = ray_triangle_intersection(&ray, &triangle, Backfaces::Include);
        assert!(result.unwrap().distance - 1.0 <= f32::EPSILON);
    }

    #[test]
    fn raycast_triangle_mt_culling() {
        let triangle = Triangle::from([Vec3A::from(V2), V1.into(), V0.into()]);
        let ray = Ray3d::new(Vec3::ZERO, Vec3::X);
        let result = ray_triangle_intersection(&ray, &triangle, Backfaces::Cull);
        assert!(result.is_none());
    }

    #[test]
    fn quad_faces_up() {
        for triangle in quad_triangles(Vec2::splat(0.5)) {
            assert!(triangle.normal().abs_diff_eq(Vec3A::Y, 1e-6));
        }
    }

    #[test]
    fn quad_hit_in_world_units() {
        let transform = Mat4::from_scale_rotation_translation(
            Vec3::splat(2.0),
            Quat::IDENTITY,
            Vec3::new(3.0, 0.0, -1.0),
        );
        let ray = Ray3d::new(Vec3::new(3.4, 5.0, -1.4), Vec3::NEG_Y);
        let hit = ray_quad_intersection(&ray, Vec2::splat(0.5), &transform).unwrap();
        assert!(hit.position().abs_diff_eq(Vec3::new(3.4, 0.0, -1.4), 1e-5));
        assert!((hit.distance() - 5.0).abs() < 1e-5);
        assert!(hit.normal().abs_diff_eq(Vec3::Y, 1e-5));
    }

    #[test]
    fn quad_hit_from_below_faces_ray() {
        let ray = Ray3d::new(Vec3::new(0.1, -2.0, 0.1), Vec3::Y);
        let hit = ray_quad_intersection(&ray, Vec2::splat(0.5), &Mat4::IDENTITY).unwrap();
        assert!(hit.normal().abs_diff_eq(Vec3::NEG_Y, 1e-5));
    }

    #[test]
    fn quad_miss() {
        let outside = Ray3d::new(Vec3::new(0.6, 5.0, 0.0), Vec3::NEG_Y);
        assert!(ray_quad_intersection(&outside, Vec2::splat(0.5), &Mat4::IDENTITY).is_none());
        let behind = Ray3d::new(Vec3::new(0.0, 5.0, 0.0), Vec3::Y);
        assert!(ray_quad_intersection(&behind, Vec2::splat(0.5), &Mat4::IDENTITY).is_none());
        let parallel = Ray3d::new(Vec3::new(-2.0, 0.0, 0.0), Vec3::X);
        assert!(ray_quad_intersection(&parallel, Vec2::splat(0.5), &Mat4::IDENTITY).is_none());
    }
}
