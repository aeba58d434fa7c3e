use cgmath::{Deg, Quaternion, Rad, Rotation3, Vector3};

use crate::camera::{Camera, Pose};
use crate::config::ConeConfig;
use crate::error::VrResult;
use crate::scene::{Color, Model, ModelId, Scene, TriangleSet};

const CONE_COLOR: [u8; 3] = [0x40, 0x90, 0xff];
const MAX_ALPHA: f32 = 0.5;

// Tracking volume of a virtual sensor, a frustum looking down -z of its pose.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConeShape {
    pose: Pose, // Tracking space.
    half_tan_h: f32,
    half_tan_v: f32,
    near: f32,
    far: f32,
    fade_dist: f32,
}

impl ConeShape {
    pub fn new(config: &ConeConfig) -> Self {
        Self {
            pose: Pose::new(Vector3::from(config.pos), Quaternion::from_angle_y(Deg(config.yaw_deg))),
            half_tan_h: Rad::from(Deg(config.hfov_deg / 2.0)).0.tan(),
            half_tan_v: Rad::from(Deg(config.vfov_deg / 2.0)).0.tan(),
            near: config.near,
            far: config.far,
            fade_dist: config.fade_dist,
        }
    }

    pub fn get_pose(&self) -> &Pose {
        &self.pose
    }

    // Signed distance to the closest side of the frustum, positive inside.
    pub fn get_edge_dist(&self, point: &Vector3<f32>) -> f32 {
        let local = self.pose.rot.conjugate() * (point - self.pose.pos);
        let depth = -local.z;

        let side = |offset: f32, half_tan: f32| (depth * half_tan - offset.abs()) / (1.0 + half_tan * half_tan).sqrt();

        [depth - self.near, self.far - depth, side(local.x, self.half_tan_h), side(local.y, self.half_tan_v)]
            .into_iter()
            .fold(f32::INFINITY, f32::min)
    }

    pub fn contains(&self, point: &Vector3<f32>) -> bool {
        self.get_edge_dist(point) >= 0.0
    }

    // 0.0 deep inside, rising to 1.0 at the boundary and outside.
    pub fn get_alpha(&self, point: &Vector3<f32>) -> f32 {
        let dist = self.get_edge_dist(point);

        if dist <= 0.0 {
            1.0
        } else if self.fade_dist <= 0.0 || dist >= self.fade_dist {
            0.0
        } else {
            1.0 - dist / self.fade_dist
        }
    }
}

// The sensor volume drawn into the scene, only while the head gets close to
// its boundary or leaves it.
pub struct CameraCone {
    shape: ConeShape,
    model: ModelId,
}

impl CameraCone {
    pub fn new(scene: &mut Scene, config: &ConeConfig) -> VrResult<Self> {
        let shape = ConeShape::new(config);

        let [r, g, b] = CONE_COLOR;
        let mut mesh = TriangleSet::new();
        mesh.add_frustum(Rad::from(Deg(config.hfov_deg)).0, Rad::from(Deg(config.vfov_deg)).0, config.near, config.far, Color::from_srgb_byte(r, g, b, u8::MAX))?;

        let mut model = Model::new(mesh, shape.pose.pos, shape.pose.rot);
        model.tint[3] = 0.0;
        model.visible = false;

        Ok(Self {
            shape,
            model: scene.add(model),
        })
    }

    pub fn get_model(&self) -> ModelId {
        self.model
    }

    pub fn contains(&self, point: &Vector3<f32>) -> bool {
        self.shape.contains(point)
    }

    pub fn get_alpha(&self, point: &Vector3<f32>) -> f32 {
        self.shape.get_alpha(point)
    }

    pub fn update(&self, scene: &mut Scene, camera: &Camera, head: &Pose) {
        let alpha = self.get_alpha(&head.pos);
        let world = camera.to_world(self.shape.get_pose());

        let model = scene.get_mut(self.model);
        model.pos = world.pos;
        model.rot = world.rot;
        model.tint[3] = alpha * MAX_ALPHA;
        model.visible = alpha > 0.0;
    }
}
