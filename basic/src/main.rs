use std::env;
use std::process::ExitCode;

use cgmath::Vector3;
use log::{error, info};

use vrtest_lib::APP_NAME;
use vrtest_lib::basicvr::{AppFrame, BasicVR, GrabEvent, HandGrabbers, VrApp};
use vrtest_lib::config::Config;
use vrtest_lib::error::VrResult;
use vrtest_lib::scene::{Model, ModelId, Scene, TriangleSet, identity_rot};

const BLOCK_POS: Vector3<f32> = Vector3::new(0.0, 1.1, 4.5); // Half a meter ahead of the start position.
const BLOCK_SIZE: f32 = 0.1;
const BLOCK_COLOR: u32 = 0xffc03020;
const HAND_NAMES: [&str; 2] = ["left", "right"];

// A single block which can be picked up with either controller.
struct GrabDemo {
    reach: f32,
    block_opt: Option<ModelId>,
    grabbers: HandGrabbers,
}

impl GrabDemo {
    fn new(reach: f32) -> Self {
        Self {
            reach,
            block_opt: None,
            grabbers: HandGrabbers::new(reach),
        }
    }
}

impl VrApp for GrabDemo {
    fn init(&mut self, scene: &mut Scene) -> VrResult<()> {
        let half = BLOCK_SIZE / 2.0;

        let mut mesh = TriangleSet::new();
        mesh.add_solid_color_box(-half, -half, -half, half, half, half, BLOCK_COLOR)?;

        self.block_opt = Some(scene.add(Model::new(mesh, BLOCK_POS, identity_rot())));
        self.grabbers = HandGrabbers::new(self.reach); // New session, new scene.

        Ok(())
    }

    fn update(&mut self, frame: &mut AppFrame) {
        let Some(block) = self.block_opt else {
            return;
        };

        let events = self.grabbers.update(&frame.hand_poses, &frame.hands, frame.scene.get_mut(block));

        for (hand, event) in events.into_iter().enumerate() {
            match event {
                GrabEvent::Grabbed => {
                    info!("Block grabbed with {} hand", HAND_NAMES[hand]);
                    frame.request_haptic(hand);
                },
                GrabEvent::Released => info!("Block released"),
                GrabEvent::None => (),
            }
        }
    }
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

    let mut vr = BasicVR::new(openxr::Entry::linked(), config)?; // Use compiled-in OpenXR loader.
    let mut app = GrabDemo::new(vr.get_config().grab_reach);

    vr.run(&mut app)
}
