use std::collections::HashSet;

use cgmath::{Quaternion, Rad, Rotation3, Vector2, Vector3, Zero};
use winit::keyboard::KeyCode;

use crate::camera::{Camera, Pose};
use crate::config::Config;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct InputState {
    pub forward: f32, // -1.0 ... 1.0
    pub right: f32, // -1.0 ... 1.0
    pub turn_left: f32, // -1.0 ... 1.0
    pub recenter: bool,
}

impl InputState {
    pub fn from_keys(keys: &HashSet<KeyCode>) -> Self {
        let pressed = |codes: &[KeyCode]| codes.iter().any(|code| keys.contains(code));
        let axis = |pos: bool, neg: bool| (pos as i32 - neg as i32) as f32;

        Self {
            forward: axis(pressed(&[KeyCode::KeyW, KeyCode::ArrowUp]), pressed(&[KeyCode::KeyS, KeyCode::ArrowDown])),
            right: axis(pressed(&[KeyCode::KeyD]), pressed(&[KeyCode::KeyA])),
            turn_left: axis(pressed(&[KeyCode::ArrowLeft]), pressed(&[KeyCode::ArrowRight])),
            recenter: pressed(&[KeyCode::KeyR]),
        }
    }

    // Left stick walks, right stick x turns. Keyboard wins on each axis if it
    // is held.
    pub fn with_thumbsticks(mut self, left: Vector2<f32>, right: Vector2<f32>, deadzone: f32) -> Self {
        let dz = |v: f32| if v.abs() < deadzone { 0.0 } else { v.clamp(-1.0, 1.0) };

        if self.forward == 0.0 {
            self.forward = dz(left.y);
        }

        if self.right == 0.0 {
            self.right = dz(left.x);
        }

        if self.turn_left == 0.0 {
            self.turn_left = -dz(right.x);
        }

        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HandInput {
    pub pose: Option<Pose>, // Tracking space, None if not tracked.
    pub grab: bool,
    pub thumbstick: Vector2<f32>,
}

impl Default for HandInput {
    fn default() -> Self {
        Self {
            pose: None,
            grab: false,
            thumbstick: Vector2::zero(),
        }
    }
}

// Turns a held button into a single event on the frame it goes down.
#[derive(Debug, Default)]
pub struct ButtonEdge {
    prev: bool,
}

impl ButtonEdge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, down: bool) -> bool {
        let pressed = down && !self.prev;
        self.prev = down;

        pressed
    }
}

pub struct CameraControl {
    move_step: f32,
    yaw_step: f32,
    yaw: f32, // [rad]
}

impl CameraControl {
    pub fn new(config: &Config) -> Self {
        Self {
            move_step: config.move_step,
            yaw_step: config.yaw_step,
            yaw: 0.0,
        }
    }

    pub fn apply(&mut self, camera: &mut Camera, input: &InputState) {
        // Movement is relative to the orientation before this frame's turn.

        let forward = camera.rot * Vector3::new(0.0, 0.0, -self.move_step);
        let right = camera.rot * Vector3::new(self.move_step, 0.0, 0.0);

        camera.pos += forward * input.forward + right * input.right;

        if input.turn_left != 0.0 {
            self.yaw += self.yaw_step * input.turn_left;
            camera.rot = Quaternion::from_angle_y(Rad(self.yaw));
        }
    }
}
