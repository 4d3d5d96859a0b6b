use bevy::{
    math::{Dir3, Ray3d, Vec3A},
    prelude::*,
};

/// Height above the board plane at which a dragged topping hovers.
pub const DRAG_HEIGHT: f32 = 0.5;

#[non_exhaustive]
pub enum Primitive3d {
    Plane { point: Vec3, normal: Vec3 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntersectionData {
    position: Vec3,
    normal: Vec3,
    distance: f32,
    triangle: Option<Triangle>,
}

impl IntersectionData {
    pub fn new(position: Vec3, normal: Vec3, distance: f32, triangle: Option<Triangle>) -> Self {
        Self {
            position,
            normal,
            distance,
            triangle,
        }
    }

    /// Get the intersection data's position.
    #[must_use]
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Get the intersection data's normal.
    #[must_use]
    pub fn normal(&self) -> Vec3 {
        self.normal
    }

    /// Get the intersection data's distance.
    #[must_use]
    pub fn distance(&self) -> f32 {
        self.distance
    }

    /// Get the intersection data's triangle.
    #[must_use]
    pub fn triangle(&self) -> Option<Triangle> {
        self.triangle
    }
}

/// Intersects `ray` with a primitive shape. Only hits in front of the ray origin count.
pub fn intersect_primitive(ray: Ray3d, shape: Primitive3d) -> Option<IntersectionData> {
    match shape {
        Primitive3d::Plane {
            point: plane_origin,
            normal: plane_normal,
        } => {
            let plane_normal = plane_normal.normalize();
            let denominator = ray.direction.dot(plane_normal);
            if denominator.abs() <= f32::EPSILON {
                return None;
            }
            let point_to_point = plane_origin - ray.origin;
            let intersect_dist = plane_normal.dot(point_to_point) / denominator;
            if intersect_dist < 0.0 {
                return None;
            }
            Some(IntersectionData::new(
                ray.get_point(intersect_dist),
                plane_normal,
                intersect_dist,
                None,
            ))
        }
    }
}

/// The point along `ray` at the given height above the board, used to carry a topping under the
/// cursor.
pub fn point_at_height(ray: Ray3d, height: f32) -> Option<Vec3> {
    intersect_primitive(
        ray,
        Primitive3d::Plane {
            point: Vec3::Y * height,
            normal: Vec3::Y,
        },
    )
    .map(|hit| hit.position())
}

/// Lifts a point on the board plane into world space. The board's y axis runs away from the
/// camera, which is world -Z.
pub fn board_to_world(point: Vec2, height: f32) -> Vec3 {
    Vec3::new(point.x, height, -point.y)
}

pub fn ray_from_screenspace(
    cursor_pos_screen: Vec2,
    camera: &Camera,
    camera_transform: &GlobalTransform,
) -> Option<Ray3d> {
    camera.viewport_to_world(camera_transform, cursor_pos_screen)
}

/// Builds a ray along the transform's forward (-Z) axis.
pub fn ray_from_transform(transform: Mat4) -> Option<Ray3d> {
    let pick_position_ndc = Vec3::from([0.0, 0.0, -1.0]);
    let pick_position = transform.project_point3(pick_position_ndc);
    let (_, _, source_origin) = transform.to_scale_rotation_translation();
    let direction = Dir3::new(pick_position - source_origin).ok()?;
    Some(Ray3d {
        origin: source_origin,
        direction,
    })
}

#[derive(Debug, PartialEq, Copy, Clone)]
pub struct Triangle {
    pub v0: Vec3A,
    pub v1: Vec3A,
    pub v2: Vec3A,
}

impl Triangle {
    /// Unit normal following the right hand rule over `v0, v1, v2`.
    pub fn normal(&self) -> Vec3A {
        (self.v1 - self.v0).cross(self.v2 - self.v0).normalize()
    }

    pub fn transformed(&self, transform: &Mat4) -> Triangle {
        Triangle {
            v0: transform.transform_point3a(self.v0),
            v1: transform.transform_point3a(self.v1),
            v2: transform.transform_point3a(self.v2),
        }
    }
}

impl From<[Vec3A; 3]> for Triangle {
    fn from(vertices: [Vec3A; 3]) -> Self {
        Triangle {
            v0: vertices[0],
            v1: vertices[1],
            v2: vertices[2],
        }
    }
}

impl From<[Vec3; 3]> for Triangle {
    fn from(vertices: [Vec3; 3]) -> Self {
        Triangle {
            v0: vertices[0].into(),
            v1: vertices[1].into(),
            v2: vertices[2].into(),
        }
    }
}
