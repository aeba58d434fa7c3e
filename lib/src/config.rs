use std::fs;
use std::path::Path;
use std::time::Duration;

use cgmath::Vector3;
use serde::Deserialize;

use crate::error::VrResult;

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub sample_count: u32,
    pub near_z: f32,
    pub far_z: f32,
    pub move_step: f32, // [m/frame]
    pub yaw_step: f32, // [rad/frame]
    pub stick_deadzone: f32,
    pub start_pos: [f32; 3],
    pub mirror: bool,
    pub mirror_scale: f32,
    pub retry_sleep_ms: u64,
    pub notrunning_sleep_ms: u64,
    pub cube: CubeConfig,
    pub grab_reach: f32, // [m]
    pub hand_size: f32, // [m]
    pub cone: ConeConfig,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct CubeConfig {
    pub radius: f32,
    pub height: f32,
    pub step: f32, // [rad/frame]
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ConeConfig {
    pub pos: [f32; 3], // Tracking space.
    pub yaw_deg: f32,
    pub hfov_deg: f32,
    pub vfov_deg: f32,
    pub near: f32,
    pub far: f32,
    pub fade_dist: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sample_count: 4,
            near_z: 0.2,
            far_z: 1000.0,
            move_step: 0.05,
            yaw_step: 0.02,
            stick_deadzone: 0.2,
            start_pos: [0.0, 0.0, 5.0],
            mirror: true,
            mirror_scale: 0.5,
            retry_sleep_ms: 10,
            notrunning_sleep_ms: 100,
            cube: CubeConfig::default(),
            grab_reach: 0.2,
            hand_size: 0.05,
            cone: ConeConfig::default(),
        }
    }
}

impl Default for CubeConfig {
    fn default() -> Self {
        Self {
            radius: 9.0,
            height: 3.0,
            step: 0.015,
        }
    }
}

impl Default for ConeConfig {
    fn default() -> Self {
        // Sensor on a desk in front of the user, looking back at them.

        Self {
            pos: [0.0, 1.2, -1.5],
            yaw_deg: 180.0,
            hfov_deg: 80.0,
            vfov_deg: 60.0,
            near: 0.4,
            far: 2.5,
            fade_dist: 0.3,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> VrResult<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn load_opt<P: AsRef<Path>>(path_opt: Option<P>) -> VrResult<Self> {
        match path_opt {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_toml(text: &str) -> VrResult<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn get_start_pos(&self) -> Vector3<f32> {
        Vector3::from(self.start_pos)
    }

    pub fn get_retry_sleep(&self) -> Duration {
        Duration::from_millis(self.retry_sleep_ms)
    }

    pub fn get_notrunning_sleep(&self) -> Duration {
        Duration::from_millis(self.notrunning_sleep_ms)
    }
}
