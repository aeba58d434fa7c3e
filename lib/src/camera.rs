use cgmath::{Angle, InnerSpace, Matrix4, Quaternion, Rad, Rotation3, Vector3};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    pub pos: Vector3<f32>,
    pub rot: Quaternion<f32>,
}

impl Pose {
    pub fn new(pos: Vector3<f32>, rot: Quaternion<f32>) -> Self {
        Self {
            pos,
            rot,
        }
    }

    pub fn from_xr(pose: &openxr::Posef) -> Self {
        let pos = pose.position;
        let rot = pose.orientation;

        Self::new(Vector3::new(pos.x, pos.y, pos.z), Quaternion::new(rot.w, rot.x, rot.y, rot.z))
    }

    pub fn to_xr(&self) -> openxr::Posef {
        openxr::Posef {
            orientation: openxr::Quaternionf {
                x: self.rot.v.x,
                y: self.rot.v.y,
                z: self.rot.v.z,
                w: self.rot.s,
            },
            position: openxr::Vector3f {
                x: self.pos.x,
                y: self.pos.y,
                z: self.pos.z,
            },
        }
    }
}

// Field of view half angles [rad], left/down are negative.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fov {
    pub angle_left: f32,
    pub angle_right: f32,
    pub angle_up: f32,
    pub angle_down: f32,
}

impl Fov {
    pub fn from_xr(fov: &openxr::Fovf) -> Self {
        Self {
            angle_left: fov.angle_left,
            angle_right: fov.angle_right,
            angle_up: fov.angle_up,
            angle_down: fov.angle_down,
        }
    }

    pub fn to_xr(&self) -> openxr::Fovf {
        openxr::Fovf {
            angle_left: self.angle_left,
            angle_right: self.angle_right,
            angle_up: self.angle_up,
            angle_down: self.angle_down,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera {
    pub pos: Vector3<f32>,
    pub rot: Quaternion<f32>,
}

impl Camera {
    pub fn new(pos: Vector3<f32>, rot: Quaternion<f32>) -> Self {
        Self {
            pos,
            rot,
        }
    }

    // Place a pose given in tracking space (eye, hand) into the world, as
    // seen from this camera.
    pub fn to_world(&self, pose: &Pose) -> Pose {
        Pose::new(self.pos + self.rot * pose.pos, self.rot * pose.rot)
    }

    pub fn get_view_matrix(&self) -> Matrix4<f32> {
        // We are doing the pose matrix inversion manually, since it is trivial.

        let rot_m = Matrix4::from(self.rot.conjugate());
        let pos_m = Matrix4::from_translation(-self.pos);

        rot_m * pos_m
    }

    pub fn get_forward(&self) -> Vector3<f32> {
        self.rot * -Vector3::unit_z()
    }

    // View projection matrix of an eye, eye pose is in tracking space.
    pub fn get_eye_view_proj(&self, eye_pose: &Pose, fov: &Fov, near: f32, far: f32) -> Matrix4<f32> {
        let eye = self.to_world(eye_pose);
        let eye_cam = Camera::new(eye.pos, eye.rot);

        projection(fov, near, far) * eye_cam.get_view_matrix()
    }
}

pub fn projection(fov: &Fov, near: f32, far: f32) -> Matrix4<f32> {
    // Calculate projection matrix suitable for wgpu NDC: (-1, -1, 0) ... (1, 1, 1).
    // Taken from https://github.com/KhronosGroup/OpenXR-SDK/blob/main/src/common/xr_linear.h->XrMatrix4x4f_CreateProjectionFov.

    let tan_left = Rad(fov.angle_left).tan();
    let tan_right = Rad(fov.angle_right).tan();
    let tan_up = Rad(fov.angle_up).tan();
    let tan_down = Rad(fov.angle_down).tan();

    let tan_width = tan_right - tan_left;
    let tan_height = tan_up - tan_down;

    Matrix4::new(
        2.0 / tan_width, 0.0, 0.0, 0.0,
        0.0, 2.0 / tan_height, 0.0, 0.0,
        (tan_right + tan_left) / tan_width, (tan_up + tan_down) / tan_height, -far / (far - near), -1.0,
        0.0, 0.0, -(far * near) / (far - near), 0.0
    )
}

pub fn get_yaw(rot: &Quaternion<f32>) -> Rad<f32> {
    let forward = *rot * -Vector3::unit_z();
    Rad((-forward.x).atan2(-forward.z))
}

// New tracking origin for a recenter: on the floor below the head, turned
// to where the head looks, pitch and roll ignored.
pub fn recenter_pose(head: &Pose) -> Pose {
    let flat = Vector3::new(head.pos.x, 0.0, head.pos.z);
    let rot = Quaternion::from_angle_y(get_yaw(&head.rot)); // Looking straight up/down gives zero yaw.

    Pose::new(flat, rot)
}

pub fn distance(a: &Vector3<f32>, b: &Vector3<f32>) -> f32 {
    (a - b).magnitude()
}
