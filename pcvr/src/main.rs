use std::env;
use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, error, info};
use wgpu::CommandEncoderDescriptor;

use vrtest_lib::APP_NAME;
use vrtest_lib::asset::EmbedAssetManager;
use vrtest_lib::camera::Camera;
use vrtest_lib::config::Config;
use vrtest_lib::error::VrResult;
use vrtest_lib::frameloop::{FrameLoop, SessionEnd, classify_session_end, run_retry_loop};
use vrtest_lib::input::{ButtonEdge, CameraControl, InputState};
use vrtest_lib::output::{EyeTexture, Mirror, MirrorWindow, XROutput};
use vrtest_lib::render::RoomRenderer;
use vrtest_lib::scene::{CubeAnimator, Scene, create_room, identity_rot};
use vrtest_lib::util::FrameStats;

const STATS_PERIOD: Duration = Duration::from_secs(5);

// Lives across sessions.
struct Host {
    config: Config,
    xr_entry: openxr::Entry,
    window: MirrorWindow,
    asset_mgr: EmbedAssetManager,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{} failed: {}", APP_NAME, e);
            ExitCode::FAILURE
        },
    }
}

fn run() -> VrResult<()> {
    let config = Config::load_opt(env::args().nth(1))?;
    let retry_sleep = config.get_retry_sleep();

    let mut host = Host {
        config,
        xr_entry: openxr::Entry::linked(), // Use compiled-in OpenXR loader.
        window: MirrorWindow::new()?,
        asset_mgr: EmbedAssetManager::new(),
    };

    run_retry_loop(&mut host, |host| host.window.handle_messages(), |host, retry_create| {
        classify_session_end(run_session(host), retry_create)
    }, retry_sleep)
}

fn run_session(host: &mut Host) -> VrResult<SessionEnd> {
    let config = &host.config;

    let mut output = XROutput::new(&host.xr_entry, config)?;
    let info = output.get_info();

    // Setup eye textures.

    let mut eye_textures = [EyeTexture::new(&output, 0)?, EyeTexture::new(&output, 1)?];

    let mut frame_loop = FrameLoop::new();
    frame_loop.session_started(eye_textures.len())?;

    info!("Session created, {}x{} per eye, {} samples", eye_textures[0].get_size().0, eye_textures[0].get_size().1, output.get_sample_count());

    // Setup scene.

    let mut scene = Scene::new();
    let cube = create_room(&mut scene)?;
    let mut cube_animator = CubeAnimator::new(cube, &config.cube);

    let renderer = RoomRenderer::new(&info, &host.asset_mgr, &scene)?;
    let mut mirror_opt = Mirror::new_opt(&output, &host.window, config, &host.asset_mgr)?;

    let mut camera = Camera::new(config.get_start_pos(), identity_rot());
    let mut camera_control = CameraControl::new(config);
    let mut recenter_edge = ButtonEdge::new();
    let mut stats = FrameStats::new(STATS_PERIOD);

    loop {
        if !host.window.handle_messages() {
            info!("Window closed");
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

        let keys_input = InputState::from_keys(host.window.get_keys());
        let timing = output.wait_frame()?;

        let recenter_key = recenter_edge.update(keys_input.recenter); // Once per press.

        if status.should_recenter || recenter_key {
            output.recenter(&timing)?;
        }

        if timing.should_render() && status.is_visible {
            frame_loop.pose_acquired()?;

            // Move camera by keyboard and thumbsticks.

            let hands = output.get_hands(&timing)?;
            let input = keys_input.with_thumbsticks(hands[0].thumbstick, hands[1].thumbstick, config.stick_deadzone);
            camera_control.apply(&mut camera, &input);

            cube_animator.update(&mut scene, status.has_input_focus);

            // Render each eye into its swapchain image.

            let views = output.get_eye_poses(&timing)?;
            renderer.prepare(&scene);

            let mut encoder = info.get_device().create_command_encoder(&CommandEncoderDescriptor {
                label: None,
            });

            for (eye, (eye_texture, view)) in eye_textures.iter_mut().zip(&views).enumerate() {
                eye_texture.acquire()?;

                let view_proj = camera.get_eye_view_proj(&view.pose, &view.fov, config.near_z, config.far_z);
                let target = eye_texture.get_target()?;
                renderer.render_eye(&mut encoder, eye, &target, &view_proj, &scene);

                if let Some(mirror) = &mirror_opt {
                    mirror.copy_eye(&mut encoder, eye, eye_texture)?;
                }
            }

            info.get_queue().submit([encoder.finish()]);

            for eye_texture in &mut eye_textures {
                eye_texture.commit()?;
            }

            frame_loop.rendered()?;

            output.submit_frame(&timing, Some((&eye_textures, views)))?;
            let frame_index = frame_loop.submitted()?;

            if let Some(fps) = stats.tick(Instant::now()) {
                debug!("Frame {}: {:.1} fps", frame_index, fps);
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
