use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info};
use wgpu::CommandEncoderDescriptor;

use crate::asset::EmbedAssetManager;
use crate::camera::{Camera, Pose};
use crate::config::Config;
use crate::error::VrResult;
use crate::frameloop::{EYE_COUNT, FrameLoop, SessionEnd, classify_session_end, run_retry_loop};
use crate::input::{ButtonEdge, CameraControl, HandInput, InputState};
use crate::output::{Mirror, MirrorWindow, SessionStatus, XROutput};
use crate::render::RoomRenderer;
use crate::scene::{CubeAnimator, Scene, create_room, identity_rot};
use crate::util::FrameStats;

mod cone;
pub use cone::*;

mod hand;
pub use hand::*;

mod layer;
pub use layer::*;

const STATS_PERIOD: Duration = Duration::from_secs(5);

// Application hooks. The scene is rebuilt for every session, so init() is
// called again after a retry.
pub trait VrApp {
    fn init(&mut self, scene: &mut Scene) -> VrResult<()>;
    fn update(&mut self, frame: &mut AppFrame);
}

pub struct AppFrame<'a> {
    pub scene: &'a mut Scene,
    pub camera: &'a mut Camera,
    pub status: SessionStatus,
    pub hands: [HandInput; 2], // Tracking space.
    pub hand_poses: [Option<Pose>; 2], // World space.
    haptics: [bool; 2],
}

impl<'a> AppFrame<'a> {
    pub fn new(scene: &'a mut Scene, camera: &'a mut Camera, status: SessionStatus, hands: [HandInput; 2], hand_poses: [Option<Pose>; 2]) -> Self {
        Self {
            scene,
            camera,
            status,
            hands,
            hand_poses,
            haptics: [false; 2],
        }
    }

    pub fn request_haptic(&mut self, hand: usize) {
        self.haptics[hand] = true;
    }

    pub fn get_haptics(&self) -> [bool; 2] {
        self.haptics
    }
}

// Owns everything living longer than a session: the window and the
// OpenXR loader.
pub struct BasicVR {
    config: Config,
    xr_entry: openxr::Entry,
    window: MirrorWindow,
    asset_mgr: EmbedAssetManager,
}

impl BasicVR {
    pub fn new(xr_entry: openxr::Entry, config: Config) -> VrResult<Self> {
        Ok(Self {
            config,
            xr_entry,
            window: MirrorWindow::new()?,
            asset_mgr: EmbedAssetManager::new(),
        })
    }

    pub fn get_config(&self) -> &Config {
        &self.config
    }

    pub fn run<A: VrApp>(&mut self, app: &mut A) -> VrResult<()> {
        let retry_sleep = self.config.get_retry_sleep();
        let mut host = (self, app);

        run_retry_loop(&mut host, |host| host.0.window.handle_messages(), |host, retry_create| {
            let (vr, app) = host;
            classify_session_end(vr.run_session(&mut **app), retry_create)
        }, retry_sleep)
    }

    fn run_session<A: VrApp>(&mut self, app: &mut A) -> VrResult<SessionEnd> {
        let config = &self.config;

        let mut output = XROutput::new(&self.xr_entry, config)?;
        let info = output.get_info();
        let mut layer = VRLayer::make_eye_buffers(&output)?;

        let mut frame_loop = FrameLoop::new();
        frame_loop.session_started(layer.len())?;

        info!("Session created");

        // Setup scene.

        let mut scene = Scene::new();
        let cube = create_room(&mut scene)?;
        let mut cube_animator = CubeAnimator::new(cube, &config.cube);
        let hand_models = HandModels::new(&mut scene, config.hand_size)?;
        let cone = CameraCone::new(&mut scene, &config.cone)?;
        app.init(&mut scene)?;

        let renderer = RoomRenderer::new(&info, &self.asset_mgr, &scene)?;
        let mut mirror_opt = Mirror::new_opt(&output, &self.window, config, &self.asset_mgr)?;

        let mut camera = Camera::new(config.get_start_pos(), identity_rot());
        let mut camera_control = CameraControl::new(config);
        let mut recenter_edge = ButtonEdge::new();
        let mut stats = FrameStats::new(STATS_PERIOD);

        loop {
            if !self.window.handle_messages() {
                frame_loop.teardown();
                return Ok(SessionEnd::WindowClosed);
            }

            let status = output.poll_status()?;

            if status.should_quit {
                info!("Session exiting");
                frame_loop.teardown();
                return Ok(SessionEnd::Quit);
            }

            if !status.is_running {
                thread::sleep(config.get_notrunning_sleep());
                continue;
            }

            let keys_input = InputState::from_keys(self.window.get_keys());
            let timing = output.wait_frame()?;

            let recenter_key = recenter_edge.update(keys_input.recenter); // Once per press.

            if status.should_recenter || recenter_key {
                output.recenter(&timing)?;
            }

            if timing.should_render() && status.is_visible {
                frame_loop.pose_acquired()?;

                // Handle input.

                let hands = output.get_hands(&timing)?;
                let input = keys_input.with_thumbsticks(hands[0].thumbstick, hands[1].thumbstick, config.stick_deadzone);
                camera_control.apply(&mut camera, &input);

                // Update scene.

                cube_animator.update(&mut scene, status.has_input_focus);
                layer.get_eye_poses(&output, &timing)?;

                let hand_poses = hand_models.update(&mut scene, &camera, &hands);

                if let Some(head) = output.get_head_pose(&timing)? {
                    cone.update(&mut scene, &camera, &head);
                }

                let mut frame = AppFrame::new(&mut scene, &mut camera, status, hands, hand_poses);
                app.update(&mut frame);

                for (hand, haptic) in frame.get_haptics().into_iter().enumerate() {
                    if haptic {
                        output.apply_haptic(hand)?;
                    }
                }

                // Render both eyes, the mirror copies them while still acquired.

                renderer.prepare(&scene);

                let mut encoder = info.get_device().create_command_encoder(&CommandEncoderDescriptor {
                    label: None,
                });

                for eye in 0..EYE_COUNT {
                    layer.render_scene_to_eye_buffer(&renderer, &mut encoder, eye, &camera, &scene, config.near_z, config.far_z)?;

                    if let Some(mirror) = &mirror_opt {
                        mirror.copy_eye(&mut encoder, eye, layer.get_eye_texture(eye))?;
                    }
                }

                info.get_queue().submit([encoder.finish()]);
                layer.commit()?;
                frame_loop.rendered()?;

                output.submit_frame(&timing, layer.prepare_layer())?;
                frame_loop.submitted()?;

                if let Some(fps) = stats.tick(Instant::now()) {
                    debug!("Frame {}: {:.1} fps", frame_loop.get_frame_index(), fps);
                }
            } else {
                output.submit_frame(&timing, None)?;
            }

            if let Some(mirror) = &mut mirror_opt {
                mirror.present()?;
            }

            frame_loop.mirror_presented()?;
        }
    }
}
