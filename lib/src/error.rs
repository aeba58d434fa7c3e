use thiserror::Error;

use crate::frameloop::LoopState;

pub type VrResult<T> = Result<T, VrError>;

#[derive(Debug, Error)]
pub enum VrError {
    #[error("OpenXR {call}() failed: {result}")]
    Xr {
        call: &'static str,
        result: openxr::sys::Result,
    },
    #[error("Vulkan {call}() failed: {result}")]
    Vulkan {
        call: &'static str,
        result: ash::vk::Result,
    },
    #[error("Unable to load Vulkan: {0}")]
    VulkanLoad(#[from] ash::LoadingError),
    #[error("wgpu {call}() failed: {msg}")]
    Gpu {
        call: &'static str,
        msg: String,
    },
    #[error("Unable to create render surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("Display lost")]
    DisplayLost,
    #[error("HMD not detected: {0}")]
    HmdNotDetected(String),
    #[error("Unsupported: {0}")]
    Unsupported(String),
    #[error("Invalid frame loop transition {from:?} -> {to:?}")]
    Transition {
        from: LoopState,
        to: LoopState,
    },
    #[error("Swapchain {0}")]
    Swapchain(&'static str),
    #[error("Window: {0}")]
    Window(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unable to parse config: {0}")]
    Config(#[from] toml::de::Error),
    #[error("Asset: {0}")]
    Asset(String),
    #[error("Mesh exceeds {0} vertexes")]
    MeshTooLarge(usize),
}

impl VrError {
    pub fn is_retryable(&self) -> bool {
        // Losing the session or instance means the headset went away, a new
        // session may succeed once it is back.

        match self {
            VrError::DisplayLost => true,
            VrError::Xr { result, .. } => is_loss(*result),
            _ => false,
        }
    }

    pub fn gpu<E: ToString>(call: &'static str, e: E) -> Self {
        VrError::Gpu {
            call,
            msg: e.to_string(),
        }
    }
}

fn is_loss(result: openxr::sys::Result) -> bool {
    result == openxr::sys::Result::ERROR_SESSION_LOST || result == openxr::sys::Result::ERROR_INSTANCE_LOST
}

pub trait XrResultExt<T> {
    fn xr(self, call: &'static str) -> VrResult<T>;
}

impl<T> XrResultExt<T> for openxr::Result<T> {
    fn xr(self, call: &'static str) -> VrResult<T> {
        self.map_err(|result| if is_loss(result) {
            VrError::DisplayLost
        } else {
            VrError::Xr {
                call,
                result,
            }
        })
    }
}

pub trait VkResultExt<T> {
    fn vk(self, call: &'static str) -> VrResult<T>;
}

impl<T> VkResultExt<T> for ash::prelude::VkResult<T> {
    fn vk(self, call: &'static str) -> VrResult<T> {
        self.map_err(|result| VrError::Vulkan {
            call,
            result,
        })
    }
}
