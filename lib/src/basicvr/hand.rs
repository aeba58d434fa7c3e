use cgmath::{Vector3, Zero};

use crate::camera::{Camera, Pose, distance};
use crate::error::VrResult;
use crate::input::HandInput;
use crate::scene::{Model, ModelId, Scene, TriangleSet, identity_rot};

const HAND_COLORS: [u32; 2] = [0xff2080ff, 0xffff8020];
const GRAB_TINT: [f32; 4] = [1.5, 1.5, 1.5, 1.0];
const IDLE_TINT: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

// Small boxes following the tracked controllers.
pub struct HandModels {
    models: [ModelId; 2],
}

impl HandModels {
    pub fn new(scene: &mut Scene, size: f32) -> VrResult<Self> {
        let half = size / 2.0;

        let mut add_hand = |argb: u32| -> VrResult<ModelId> {
            let mut mesh = TriangleSet::new();
            mesh.add_solid_color_box(-half, -half, -half, half, half, half, argb)?;

            let mut model = Model::new(mesh, Vector3::zero(), identity_rot());
            model.visible = false;

            Ok(scene.add(model))
        };

        Ok(Self {
            models: [add_hand(HAND_COLORS[0])?, add_hand(HAND_COLORS[1])?],
        })
    }

    pub fn get_model(&self, hand: usize) -> ModelId {
        self.models[hand]
    }

    // Moves the boxes to the hands, returns the hand poses in world space.
    pub fn update(&self, scene: &mut Scene, camera: &Camera, hands: &[HandInput; 2]) -> [Option<Pose>; 2] {
        let mut world_poses = [None; 2];

        for ((model_id, hand), world_pose) in self.models.iter().zip(hands).zip(world_poses.iter_mut()) {
            let model = scene.get_mut(*model_id);

            match &hand.pose {
                Some(pose) => {
                    let world = camera.to_world(pose);

                    model.pos = world.pos;
                    model.rot = world.rot;
                    model.tint = if hand.grab { GRAB_TINT } else { IDLE_TINT };
                    model.visible = true;

                    *world_pose = Some(world);
                },
                None => {
                    model.visible = false;
                },
            }
        }

        world_poses
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GrabEvent {
    None,
    Grabbed,
    Released,
}

// Grab-and-move of a single model by one hand. The model keeps the offset it
// had to the hand when grabbed.
pub struct Grabber {
    reach: f32,
    offset_opt: Option<Pose>, // Model pose in hand space while held.
    prev_grab: bool,
}

impl Grabber {
    pub fn new(reach: f32) -> Self {
        Self {
            reach,
            offset_opt: None,
            prev_grab: false,
        }
    }

    pub fn is_holding(&self) -> bool {
        self.offset_opt.is_some()
    }

    // Tracks the button without grabbing, for frames where the other hand owns the model.
    pub fn observe(&mut self, grab: bool) {
        self.prev_grab = grab;
    }

    // Hand pose is in world space. A grab starts on the press edge only, so
    // sweeping a held button through the model does not pick it up.
    pub fn update(&mut self, hand_opt: Option<&Pose>, grab: bool, model: &mut Model) -> GrabEvent {
        let pressed = grab && !self.prev_grab;
        self.prev_grab = grab;

        if let Some(offset) = &self.offset_opt {
            return match hand_opt {
                Some(hand) if grab => {
                    model.pos = hand.pos + hand.rot * offset.pos;
                    model.rot = hand.rot * offset.rot;
                    GrabEvent::None
                },
                _ => {
                    self.offset_opt = None;
                    GrabEvent::Released
                },
            };
        }

        match hand_opt {
            Some(hand) if pressed && distance(&hand.pos, &model.pos) <= self.reach => {
                let inv_rot = hand.rot.conjugate();

                self.offset_opt = Some(Pose::new(inv_rot * (model.pos - hand.pos), inv_rot * model.rot));
                GrabEvent::Grabbed
            },
            _ => GrabEvent::None,
        }
    }
}

// One grabber per hand for a single model. Only one hand holds it at a time.
pub struct HandGrabbers {
    grabbers: [Grabber; 2],
}

impl HandGrabbers {
    pub fn new(reach: f32) -> Self {
        Self {
            grabbers: [Grabber::new(reach), Grabber::new(reach)],
        }
    }

    pub fn update(&mut self, hand_poses: &[Option<Pose>; 2], hands: &[HandInput; 2], model: &mut Model) -> [GrabEvent; 2] {
        let mut events = [GrabEvent::None, GrabEvent::None];

        // The left hand wins when both press on the same frame.

        for hand in 0..2 {
            if self.grabbers[1 - hand].is_holding() {
                self.grabbers[hand].observe(hands[hand].grab);
            } else {
                events[hand] = self.grabbers[hand].update(hand_poses[hand].as_ref(), hands[hand].grab, model);
            }
        }

        events
    }
}
