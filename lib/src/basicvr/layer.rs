use wgpu::CommandEncoder;

use crate::camera::Camera;
use crate::error::{VrError, VrResult};
use crate::frameloop::EYE_COUNT;
use crate::output::{EyeTexture, EyeView, FrameTiming, XROutput};
use crate::render::RoomRenderer;
use crate::scene::Scene;

// Both eye textures of a session plus the eye views of the frame in flight.
pub struct VRLayer {
    eye_textures: [EyeTexture; EYE_COUNT],
    eye_views_opt: Option<[EyeView; EYE_COUNT]>,
}

impl VRLayer {
    pub fn make_eye_buffers(output: &XROutput) -> VrResult<Self> {
        let eye_textures = [EyeTexture::new(output, 0)?, EyeTexture::new(output, 1)?];

        Ok(Self {
            eye_textures,
            eye_views_opt: None,
        })
    }

    pub fn len(&self) -> usize {
        self.eye_textures.len()
    }

    pub fn get_eye_texture(&self, eye: usize) -> &EyeTexture {
        &self.eye_textures[eye]
    }

    pub fn get_eye_poses(&mut self, output: &XROutput, timing: &FrameTiming) -> VrResult<[EyeView; EYE_COUNT]> {
        let eye_views = output.get_eye_poses(timing)?;
        self.eye_views_opt = Some(eye_views);
        Ok(eye_views)
    }

    // Acquires the eye's swapchain images and draws the scene as seen from
    // the camera. Images stay acquired until commit().
    #[allow(clippy::too_many_arguments)]
    pub fn render_scene_to_eye_buffer(&mut self, renderer: &RoomRenderer, encoder: &mut CommandEncoder, eye: usize, camera: &Camera, scene: &Scene, near: f32, far: f32) -> VrResult<()> {
        let eye_view = self.eye_views_opt.ok_or(VrError::Swapchain("eye poses missing for render"))?[eye];
        let eye_texture = &mut self.eye_textures[eye];

        eye_texture.acquire()?;

        let view_proj = camera.get_eye_view_proj(&eye_view.pose, &eye_view.fov, near, far);
        let target = eye_texture.get_target()?;

        renderer.render_eye(encoder, eye, &target, &view_proj, scene);

        Ok(())
    }

    pub fn commit(&mut self) -> VrResult<()> {
        for eye_texture in &mut self.eye_textures {
            eye_texture.commit()?;
        }

        Ok(())
    }

    // Layer for XROutput::submit_frame(), consumes the eye views of this frame.
    pub fn prepare_layer(&mut self) -> Option<(&[EyeTexture; EYE_COUNT], [EyeView; EYE_COUNT])> {
        let eye_views = self.eye_views_opt.take()?;
        Some((&self.eye_textures, eye_views))
    }
}
