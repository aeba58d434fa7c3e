use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};

use cgmath::{Deg, InnerSpace, Quaternion, Rad, Rotation3, Vector2, Vector3, Vector4};
use winit::keyboard::KeyCode;

use crate::asset::{AssetManagerTrait, EmbedAssetManager};
use crate::basicvr::{AppFrame, ConeShape, GrabEvent, Grabber, HandGrabbers, HandModels};
use crate::camera::{Camera, Fov, Pose, get_yaw, projection, recenter_pose};
use crate::config::{Config, ConeConfig, CubeConfig};
use crate::error::{VrError, VrResult, XrResultExt};
use crate::frameloop::{FrameLoop, LoopState, SessionEnd, classify_session_end, run_retry_loop};
use crate::input::{ButtonEdge, CameraControl, HandInput, InputState};
use crate::output::{ChainCursor, SessionStatus, get_window_size};
use crate::scene::{Color, CubeAnimator, Model, Scene, TriangleSet, create_room, identity_rot};
use crate::util::FrameStats;

const EPS: f32 = 1e-4;

fn assert_near(a: f32, b: f32) {
    assert!((a - b).abs() < EPS, "{} != {}", a, b);
}

fn assert_vec_near(a: Vector3<f32>, b: Vector3<f32>) {
    assert!((a - b).magnitude() < EPS, "{:?} != {:?}", a, b);
}

fn symmetric_fov(deg: f32) -> Fov {
    let angle = Rad::from(Deg(deg)).0;

    Fov {
        angle_left: -angle,
        angle_right: angle,
        angle_up: angle,
        angle_down: -angle,
    }
}

fn small_box() -> TriangleSet {
    let mut mesh = TriangleSet::new();
    mesh.add_solid_color_box(-0.05, -0.05, -0.05, 0.05, 0.05, 0.05, 0xffffffff).expect("Box fits");
    mesh
}

// Frame loop

fn started_loop() -> FrameLoop {
    let mut frame_loop = FrameLoop::new();
    frame_loop.session_started(2).expect("Unable to start session");
    frame_loop
}

#[test]
fn test_frame_loop_cycle() {
    let mut frame_loop = started_loop();
    assert_eq!(frame_loop.get_state(), LoopState::SessionActive);

    for expected in 0..3 {
        assert_eq!(frame_loop.pose_acquired().unwrap(), expected);
        frame_loop.rendered().unwrap();
        assert_eq!(frame_loop.submitted().unwrap(), expected);
        frame_loop.mirror_presented().unwrap();
        assert_eq!(frame_loop.get_state(), LoopState::MirrorPresented);
    }

    assert_eq!(frame_loop.get_frame_index(), 3);
}

#[test]
fn test_frame_loop_requires_eye_pair() {
    let mut frame_loop = FrameLoop::new();

    assert!(matches!(frame_loop.session_started(1), Err(VrError::Swapchain(_))));
    assert_eq!(frame_loop.get_state(), LoopState::Uninitialized);
    assert!(frame_loop.pose_acquired().is_err());
}

#[test]
fn test_frame_loop_rejects_skipped_states() {
    let mut frame_loop = started_loop();

    assert!(matches!(frame_loop.rendered(), Err(VrError::Transition { from: LoopState::SessionActive, to: LoopState::Rendered })));
    assert!(frame_loop.submitted().is_err());

    frame_loop.pose_acquired().unwrap();
    assert!(frame_loop.mirror_presented().is_err());
    assert!(frame_loop.pose_acquired().is_err());

    frame_loop.rendered().unwrap();
    frame_loop.submitted().unwrap();
    assert!(frame_loop.submitted().is_err());
    assert_eq!(frame_loop.get_frame_index(), 1);
}

#[test]
fn test_frame_loop_mirror_without_render() {
    // HMD not visible: nothing is submitted, the mirror is still presented.

    let mut frame_loop = started_loop();

    frame_loop.mirror_presented().unwrap();
    frame_loop.mirror_presented().unwrap();
    assert_eq!(frame_loop.get_frame_index(), 0);

    frame_loop.pose_acquired().unwrap();
    frame_loop.rendered().unwrap();
    frame_loop.submitted().unwrap();
    frame_loop.pose_acquired().unwrap(); // Mirror presentation may be skipped, too.
}

#[test]
fn test_frame_loop_teardown() {
    let mut frame_loop = started_loop();

    frame_loop.pose_acquired().unwrap();
    frame_loop.rendered().unwrap();
    frame_loop.submitted().unwrap();

    assert_eq!(frame_loop.get_frame_index(), 1);

    frame_loop.teardown();
    assert_eq!(frame_loop.get_state(), LoopState::Teardown);
    assert!(frame_loop.pose_acquired().is_err());
    assert!(frame_loop.session_started(2).is_err()); // A new session gets a new loop.

    let mut frame_loop = started_loop();
    assert_eq!(frame_loop.pose_acquired().unwrap(), 0);
}

// Swapchain cursor

#[test]
fn test_chain_cursor() {
    let mut cursor = ChainCursor::new(3);
    assert!(!cursor.is_acquired());
    cursor.check_acquire().unwrap();

    cursor.acquire(1).unwrap();
    assert_eq!(cursor.get(), Some(1));
    assert!(matches!(cursor.check_acquire(), Err(VrError::Swapchain(_))));
    assert!(matches!(cursor.acquire(2), Err(VrError::Swapchain(_))));
    assert_eq!(cursor.get(), Some(1));

    assert_eq!(cursor.release().unwrap(), 1);
    assert!(cursor.release().is_err());
    assert_eq!(cursor.get(), None);

    assert!(cursor.acquire(3).is_err());
    assert!(!cursor.is_acquired());
}

// Retry policy

#[test]
fn test_classify_session_end() {
    assert!(!classify_session_end(Ok(SessionEnd::Quit), false).unwrap());
    assert!(!classify_session_end(Ok(SessionEnd::WindowClosed), true).unwrap());

    assert!(classify_session_end(Err(VrError::DisplayLost), false).unwrap());

    let lost = VrError::Xr {
        call: "end",
        result: openxr::sys::Result::ERROR_SESSION_LOST,
    };
    assert!(classify_session_end(Err(lost), false).unwrap());

    assert!(classify_session_end(Err(VrError::HmdNotDetected(String::from("none"))), true).unwrap());
    assert!(matches!(classify_session_end(Err(VrError::HmdNotDetected(String::from("none"))), false), Err(VrError::HmdNotDetected(_))));
}

#[test]
fn test_xr_result_mapping() {
    let lost: openxr::Result<()> = Err(openxr::sys::Result::ERROR_INSTANCE_LOST);
    assert!(matches!(lost.xr("poll_event"), Err(VrError::DisplayLost)));

    let failed: openxr::Result<()> = Err(openxr::sys::Result::ERROR_RUNTIME_FAILURE);
    let e = failed.xr("wait").unwrap_err();
    assert!(matches!(e, VrError::Xr { call: "wait", .. }));
    assert!(!e.is_retryable());
}

struct RetryHost {
    results: VecDeque<VrResult<bool>>,
    calls: Vec<bool>,
    alive: bool,
}

impl RetryHost {
    fn new(results: Vec<VrResult<bool>>, alive: bool) -> Self {
        Self {
            results: results.into(),
            calls: Vec::new(),
            alive,
        }
    }

    fn run(&mut self) -> VrResult<()> {
        run_retry_loop(self, |host| host.alive, |host, retry_create| {
            host.calls.push(retry_create);
            host.results.pop_front().expect("Too many session attempts")
        }, Duration::ZERO)
    }
}

#[test]
fn test_retry_loop_until_stop() {
    let mut host = RetryHost::new(vec![Ok(true), Ok(true), Ok(false)], true);

    host.run().unwrap();
    assert_eq!(host.calls, vec![false, true, true]);
}

#[test]
fn test_retry_loop_first_failure_is_fatal() {
    let mut host = RetryHost::new(vec![Err(VrError::HmdNotDetected(String::from("none")))], true);

    assert!(host.run().is_err());
    assert_eq!(host.calls, vec![false]);
}

#[test]
fn test_retry_loop_stops_with_host() {
    let mut host = RetryHost::new(vec![Ok(true)], false);

    host.run().unwrap();
    assert_eq!(host.calls, vec![false]);
}

// Camera

#[test]
fn test_camera_to_world() {
    let camera = Camera::new(Vector3::new(1.0, 2.0, 3.0), Quaternion::from_angle_y(Deg(90.0)));
    let eye = Pose::new(Vector3::new(1.0, 0.0, 0.0), Quaternion::from_angle_y(Deg(10.0)));

    let world = camera.to_world(&eye);

    assert_vec_near(world.pos, Vector3::new(1.0, 2.0, 2.0));
    assert_near(get_yaw(&world.rot).0, Rad::from(Deg(100.0)).0);
}

#[test]
fn test_view_matrix_moves_camera_to_origin() {
    let camera = Camera::new(Vector3::new(1.0, 2.0, 3.0), Quaternion::from_angle_y(Deg(30.0)));
    let view_m = camera.get_view_matrix();

    let origin = view_m * Vector4::new(1.0, 2.0, 3.0, 1.0);
    assert_vec_near(origin.truncate(), Vector3::new(0.0, 0.0, 0.0));

    let ahead = camera.pos + camera.get_forward() * 2.0;
    let ahead_view = view_m * ahead.extend(1.0);
    assert_vec_near(ahead_view.truncate(), Vector3::new(0.0, 0.0, -2.0));
}

#[test]
fn test_projection_depth_range() {
    let (near, far) = (0.2, 1000.0);
    let proj_m = projection(&symmetric_fov(45.0), near, far);

    let at_near = proj_m * Vector4::new(0.0, 0.0, -near, 1.0);
    assert_near(at_near.z / at_near.w, 0.0);

    let at_far = proj_m * Vector4::new(0.0, 0.0, -far, 1.0);
    assert_near(at_far.z / at_far.w, 1.0);

    let right_edge = proj_m * Vector4::new(1.0, 0.0, -1.0, 1.0); // tan(45) = 1
    assert_near(right_edge.x / right_edge.w, 1.0);

    let top_edge = proj_m * Vector4::new(0.0, 1.0, -1.0, 1.0);
    assert_near(top_edge.y / top_edge.w, 1.0);
}

#[test]
fn test_projection_asymmetric_fov() {
    let fov = Fov {
        angle_left: -Rad::from(Deg(30.0)).0,
        angle_right: Rad::from(Deg(50.0)).0,
        angle_up: Rad::from(Deg(40.0)).0,
        angle_down: -Rad::from(Deg(45.0)).0,
    };
    let proj_m = projection(&fov, 0.1, 100.0);

    let left = proj_m * Vector4::new(-Rad::from(Deg(30.0_f32)).0.tan(), 0.0, -1.0, 1.0);
    assert_near(left.x / left.w, -1.0);

    let right = proj_m * Vector4::new(Rad::from(Deg(50.0_f32)).0.tan(), 0.0, -1.0, 1.0);
    assert_near(right.x / right.w, 1.0);

    let bottom = proj_m * Vector4::new(0.0, -1.0, -1.0, 1.0); // tan(45) = 1
    assert_near(bottom.y / bottom.w, -1.0);
}

#[test]
fn test_eye_view_proj_centers_forward_point() {
    let camera = Camera::new(Vector3::new(0.0, 0.0, 5.0), Quaternion::from_angle_y(Deg(90.0)));
    let eye = Pose::new(Vector3::new(0.0, 1.6, 0.0), identity_rot());

    let view_proj = camera.get_eye_view_proj(&eye, &symmetric_fov(45.0), 0.2, 1000.0);

    let target = camera.to_world(&eye).pos + camera.get_forward() * 3.0;
    let clip = view_proj * target.extend(1.0);

    assert_near(clip.x / clip.w, 0.0);
    assert_near(clip.y / clip.w, 0.0);
    assert!(clip.w > 0.0);
}

#[test]
fn test_recenter_pose_keeps_yaw_only() {
    let rot = Quaternion::from_angle_y(Rad(0.5)) * Quaternion::from_angle_x(Deg(20.0)) * Quaternion::from_angle_z(Deg(10.0));
    let head = Pose::new(Vector3::new(1.0, 1.7, 2.0), rot);

    let origin = recenter_pose(&head);

    assert_vec_near(origin.pos, Vector3::new(1.0, 0.0, 2.0));
    assert_near(get_yaw(&origin.rot).0, 0.5);
    assert_vec_near(origin.rot * Vector3::unit_y(), Vector3::unit_y()); // Stays level.
}

#[test]
fn test_get_yaw() {
    assert_near(get_yaw(&identity_rot()).0, 0.0);
    assert_near(get_yaw(&Quaternion::from_angle_y(Rad(0.7))).0, 0.7);
    assert_near(get_yaw(&Quaternion::from_angle_y(Rad(-2.0))).0, -2.0);
}

// Input

fn keys(codes: &[KeyCode]) -> HashSet<KeyCode> {
    codes.iter().copied().collect()
}

#[test]
fn test_input_from_keys() {
    let input = InputState::from_keys(&keys(&[KeyCode::KeyW, KeyCode::KeyD]));
    assert_eq!(input.forward, 1.0);
    assert_eq!(input.right, 1.0);
    assert_eq!(input.turn_left, 0.0);
    assert!(!input.recenter);

    let input = InputState::from_keys(&keys(&[KeyCode::ArrowDown, KeyCode::KeyA, KeyCode::ArrowLeft, KeyCode::KeyR]));
    assert_eq!(input.forward, -1.0);
    assert_eq!(input.right, -1.0);
    assert_eq!(input.turn_left, 1.0);
    assert!(input.recenter);

    let input = InputState::from_keys(&keys(&[KeyCode::KeyW, KeyCode::KeyS, KeyCode::ArrowRight]));
    assert_eq!(input.forward, 0.0);
    assert_eq!(input.turn_left, -1.0);
}

#[test]
fn test_recenter_key_fires_once_per_press() {
    let mut edge = ButtonEdge::new();
    let held = InputState::from_keys(&keys(&[KeyCode::KeyR]));
    let released = InputState::from_keys(&keys(&[]));

    assert!(edge.update(held.recenter));
    for _ in 0..10 {
        assert!(!edge.update(held.recenter)); // Holding R doesn't recenter every frame.
    }

    assert!(!edge.update(released.recenter));
    assert!(edge.update(held.recenter));
}

#[test]
fn test_input_thumbsticks() {
    let input = InputState::default().with_thumbsticks(Vector2::new(0.5, 0.1), Vector2::new(0.8, 0.0), 0.2);
    assert_eq!(input.forward, 0.0); // Inside dead zone.
    assert_eq!(input.right, 0.5);
    assert_eq!(input.turn_left, -0.8);

    let input = InputState::from_keys(&keys(&[KeyCode::KeyW])).with_thumbsticks(Vector2::new(0.0, -1.0), Vector2::new(0.0, 0.0), 0.2);
    assert_eq!(input.forward, 1.0); // Keyboard wins.
}

#[test]
fn test_camera_control() {
    let config = Config::default();
    let mut control = CameraControl::new(&config);
    let mut camera = Camera::new(Vector3::new(0.0, 0.0, 0.0), identity_rot());

    let forward = InputState {
        forward: 1.0,
        ..Default::default()
    };
    control.apply(&mut camera, &forward);
    assert_vec_near(camera.pos, Vector3::new(0.0, 0.0, -0.05));

    let right = InputState {
        right: 1.0,
        ..Default::default()
    };
    control.apply(&mut camera, &right);
    assert_vec_near(camera.pos, Vector3::new(0.05, 0.0, -0.05));

    let turn = InputState {
        turn_left: 1.0,
        ..Default::default()
    };
    for _ in 0..10 {
        control.apply(&mut camera, &turn);
    }
    assert_near(get_yaw(&camera.rot).0, 0.2);
    assert_vec_near(camera.pos, Vector3::new(0.05, 0.0, -0.05)); // Turning doesn't move.

    // Forward follows the yaw.

    let before = camera.pos;
    control.apply(&mut camera, &forward);
    assert_vec_near(camera.pos - before, Vector3::new(-0.05 * 0.2f32.sin(), 0.0, -0.05 * 0.2f32.cos()));
}

// Scene

#[test]
fn test_color_from_argb() {
    assert_eq!(Color::from_argb(0xff000000).0, [0.0, 0.0, 0.0, 1.0]);

    let white = Color::from_argb(0x80ffffff).0;
    assert_near(white[0], 1.0);
    assert_near(white[3], 128.0 / 255.0);
}

#[test]
fn test_solid_color_box_faces_outward() {
    let mut mesh = TriangleSet::new();
    mesh.add_solid_color_box(1.0, 2.0, 3.0, -1.0, 0.0, 1.0, 0xff808080).expect("Box fits"); // Corners swapped.

    let vertexes = mesh.get_vertexes();
    let indexes = mesh.get_indexes();
    assert_eq!(vertexes.len(), 24);
    assert_eq!(indexes.len(), 36);

    let pos = |index: u16| Vector3::from(vertexes[index as usize].pos);
    let center = Vector3::new(0.0, 1.0, 2.0);

    for v in vertexes {
        for (c, (lo, hi)) in v.pos.iter().zip([(-1.0, 1.0), (0.0, 2.0), (1.0, 3.0)]) {
            assert!(*c == lo || *c == hi);
        }
    }

    for tri in indexes.chunks(3) {
        let (a, b, c) = (pos(tri[0]), pos(tri[1]), pos(tri[2]));
        let normal = (b - a).cross(c - a);
        let mid = (a + b + c) / 3.0;

        assert!(normal.dot(mid - center) > 0.0, "Triangle {:?} faces inward", tri);
    }
}

#[test]
fn test_box_shading_is_deterministic() {
    let build = || {
        let mut mesh = TriangleSet::new();
        mesh.add_solid_color_box(0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 0xff404040).expect("Box fits");
        mesh.add_solid_color_box(2.0, 0.0, 0.0, 3.0, 1.0, 1.0, 0xff404040).expect("Box fits");
        mesh
    };

    let (a, b) = (build(), build());
    assert_eq!(a.get_vertexes(), b.get_vertexes());

    for v in a.get_vertexes() {
        assert_eq!(v.color[3], 1.0);
        assert!(v.color[..3].iter().all(|c| (0.0..=1.0).contains(c)));
    }
}

#[test]
fn test_frustum_is_double_sided() {
    let mut mesh = TriangleSet::new();
    mesh.add_frustum(Rad::from(Deg(80.0)).0, Rad::from(Deg(60.0)).0, 0.4, 2.5, Color::from_argb(0xffffffff)).expect("Frustum fits");

    assert_eq!(mesh.get_vertexes().len(), 48);
    assert_eq!(mesh.get_indexes().len(), 72);

    let far_width = 2.5 * Rad::from(Deg(40.0_f32)).0.tan();
    let max_x = mesh.get_vertexes().iter().map(|v| v.pos[0]).fold(f32::MIN, f32::max);
    assert_near(max_x, far_width);
    assert!(mesh.get_vertexes().iter().all(|v| v.pos[2] <= -0.4 + EPS));
}

#[test]
fn test_mesh_vertex_limit() {
    let corners = [Vector3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0), Vector3::new(1.0, 1.0, 0.0), Vector3::new(0.0, 1.0, 0.0)];
    let colors = [Color::from_argb(0xffffffff); 4];

    let mut mesh = TriangleSet::new();
    for _ in 0..16384 {
        mesh.add_quad(corners, colors).expect("Quad fits");
    }
    assert_eq!(mesh.get_vertexes().len(), 65536);
    assert_eq!(*mesh.get_indexes().iter().max().expect("Mesh has indexes"), u16::MAX);

    assert!(matches!(mesh.add_quad(corners, colors), Err(VrError::MeshTooLarge(65536))));
    assert!(mesh.add_solid_color_box(0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 0xff404040).is_err());
    assert_eq!(mesh.get_vertexes().len(), 65536); // Nothing partial gets added.
}

#[test]
fn test_room_contents() {
    let mut scene = Scene::new();
    let cube = create_room(&mut scene).expect("Room fits");

    assert_eq!(cube.get_index(), 0);
    assert_eq!(scene.len(), 6);
    assert!(scene.get_models().iter().all(|model| model.visible && !model.get_mesh().is_empty()));
    assert_vec_near(scene.get_models()[1].pos, Vector3::new(0.0, -10.0, 0.0)); // Spare cube below the floor.
}

#[test]
fn test_cube_animation() {
    let mut scene = Scene::new();
    let cube = create_room(&mut scene).expect("Room fits");
    let mut animator = CubeAnimator::new(cube, &CubeConfig::default());

    animator.update(&mut scene, true);
    assert_vec_near(scene.get(cube).pos, Vector3::new(9.0 * 0.015f32.sin(), 3.0, 9.0 * 0.015f32.cos()));
    assert_near(animator.get_clock(), 0.015);

    animator.update(&mut scene, false); // No focus, no movement.
    assert_near(animator.get_clock(), 0.015);
    assert_vec_near(scene.get(cube).pos, Vector3::new(9.0 * 0.015f32.sin(), 3.0, 9.0 * 0.015f32.cos()));

    for _ in 0..99 {
        animator.update(&mut scene, true);
    }
    assert_near(animator.get_clock(), 1.5);
    assert_vec_near(scene.get(cube).pos, Vector3::new(9.0 * 1.5f32.sin(), 3.0, 9.0 * 1.5f32.cos()));
}

#[test]
fn test_cube_stays_on_orbit() {
    let mut scene = Scene::new();
    let cube = create_room(&mut scene).expect("Room fits");
    let mut animator = CubeAnimator::new(cube, &CubeConfig::default());

    for _ in 0..500 {
        animator.update(&mut scene, true);
        let pos = scene.get(cube).pos;
        assert!(((pos.x * pos.x + pos.z * pos.z).sqrt() - 9.0).abs() < 1e-3, "off orbit at {:?}", pos);
        assert_near(pos.y, 3.0);
    }
}

#[test]
fn test_model_matrix_and_translucency() {
    let mut model = Model::new(small_box(), Vector3::new(1.0, 2.0, 3.0), Quaternion::from_angle_y(Deg(90.0)));
    model.scale = 2.0;

    let p = model.get_matrix() * Vector4::new(1.0, 0.0, 0.0, 1.0);
    assert_vec_near(p.truncate(), Vector3::new(1.0, 2.0, 1.0));

    assert!(!model.is_translucent());
    model.tint[3] = 0.5;
    assert!(model.is_translucent());
}

// Camera cone

#[test]
fn test_cone_contains_and_fades() {
    let cone = ConeShape::new(&ConeConfig::default()); // At (0, 1.2, -1.5) looking towards +z.

    let center = Vector3::new(0.0, 1.2, 0.0);
    assert!(cone.contains(&center));
    assert_near(cone.get_alpha(&center), 0.0);

    let near_far = Vector3::new(0.0, 1.2, 0.9); // 0.1 m from the far plane.
    assert!(cone.contains(&near_far));
    assert_near(cone.get_alpha(&near_far), 1.0 - 0.1 / 0.3);

    let behind = Vector3::new(0.0, 1.2, -3.0);
    assert!(!cone.contains(&behind));
    assert_near(cone.get_alpha(&behind), 1.0);

    let aside = Vector3::new(5.0, 1.2, 0.0);
    assert!(!cone.contains(&aside));
    assert_near(cone.get_alpha(&aside), 1.0);
}

// Hands

#[test]
fn test_hand_models_follow_hands() {
    let mut scene = Scene::new();
    let hand_models = HandModels::new(&mut scene, 0.05).expect("Hands fit");
    let camera = Camera::new(Vector3::new(0.0, 0.0, 5.0), identity_rot());

    let hands = [
        HandInput {
            pose: Some(Pose::new(Vector3::new(0.1, 1.0, -0.2), identity_rot())),
            grab: true,
            ..Default::default()
        },
        HandInput::default(),
    ];

    let poses = hand_models.update(&mut scene, &camera, &hands);

    let left = scene.get(hand_models.get_model(0));
    assert!(left.visible);
    assert_vec_near(left.pos, Vector3::new(0.1, 1.0, 4.8));
    assert_vec_near(poses[0].expect("Left hand is tracked").pos, Vector3::new(0.1, 1.0, 4.8));

    assert!(!scene.get(hand_models.get_model(1)).visible);
    assert!(poses[1].is_none());
}

#[test]
fn test_grab_move_release() {
    let mut model = Model::new(small_box(), Vector3::new(0.0, 1.0, 0.0), identity_rot());
    let mut grabber = Grabber::new(0.2);

    let hand = Pose::new(Vector3::new(0.0, 1.0, 0.1), identity_rot());
    assert_eq!(grabber.update(Some(&hand), true, &mut model), GrabEvent::Grabbed);
    assert!(grabber.is_holding());

    let moved = Pose::new(Vector3::new(1.0, 1.0, 0.1), identity_rot());
    assert_eq!(grabber.update(Some(&moved), true, &mut model), GrabEvent::None);
    assert_vec_near(model.pos, Vector3::new(1.0, 1.0, 0.0)); // Offset is kept.

    assert_eq!(grabber.update(Some(&moved), false, &mut model), GrabEvent::Released);
    assert!(!grabber.is_holding());

    let away = Pose::new(Vector3::new(2.0, 1.0, 0.1), identity_rot());
    assert_eq!(grabber.update(Some(&away), false, &mut model), GrabEvent::None);
    assert_vec_near(model.pos, Vector3::new(1.0, 1.0, 0.0)); // Dropped where released.
}

#[test]
fn test_grab_needs_press_in_reach() {
    let mut model = Model::new(small_box(), Vector3::new(0.0, 1.0, 0.0), identity_rot());
    let mut grabber = Grabber::new(0.2);

    let far = Pose::new(Vector3::new(0.0, 1.0, 1.0), identity_rot());
    assert_eq!(grabber.update(Some(&far), true, &mut model), GrabEvent::None);

    // Sweeping a held button into the model doesn't grab.

    let near = Pose::new(Vector3::new(0.0, 1.0, 0.1), identity_rot());
    assert_eq!(grabber.update(Some(&near), true, &mut model), GrabEvent::None);

    assert_eq!(grabber.update(Some(&near), false, &mut model), GrabEvent::None);
    assert_eq!(grabber.update(Some(&near), true, &mut model), GrabEvent::Grabbed);

    // Tracking loss drops the model.

    assert_eq!(grabber.update(None, true, &mut model), GrabEvent::Released);
}

#[test]
fn test_grab_follows_hand_rotation() {
    let mut model = Model::new(small_box(), Vector3::new(0.0, 0.0, -0.1), identity_rot());
    let mut grabber = Grabber::new(0.2);

    let hand = Pose::new(Vector3::new(0.0, 0.0, 0.0), identity_rot());
    assert_eq!(grabber.update(Some(&hand), true, &mut model), GrabEvent::Grabbed);

    let turned = Pose::new(Vector3::new(0.0, 0.0, 0.0), Quaternion::from_angle_y(Deg(90.0)));
    grabber.update(Some(&turned), true, &mut model);

    assert_vec_near(model.pos, Vector3::new(-0.1, 0.0, 0.0));
    assert_near(get_yaw(&model.rot).0, Rad::from(Deg(90.0)).0);
}

fn grab_input(grab: bool) -> HandInput {
    HandInput {
        grab,
        ..Default::default()
    }
}

#[test]
fn test_grab_handover_needs_new_press() {
    let mut model = Model::new(small_box(), Vector3::new(0.0, 1.0, 0.0), identity_rot());
    let mut grabbers = HandGrabbers::new(0.2);

    let near = Some(Pose::new(Vector3::new(0.0, 1.0, 0.1), identity_rot()));
    let poses = [near, near];

    assert_eq!(grabbers.update(&poses, &[grab_input(true), grab_input(false)], &mut model), [GrabEvent::Grabbed, GrabEvent::None]);

    // Right button goes down while the left hand holds the block.

    assert_eq!(grabbers.update(&poses, &[grab_input(true), grab_input(true)], &mut model), [GrabEvent::None, GrabEvent::None]);

    // Left lets go, right keeps its button held: no grab without a new press.

    assert_eq!(grabbers.update(&poses, &[grab_input(false), grab_input(true)], &mut model), [GrabEvent::Released, GrabEvent::None]);
    assert_eq!(grabbers.update(&poses, &[grab_input(false), grab_input(true)], &mut model), [GrabEvent::None, GrabEvent::None]);

    assert_eq!(grabbers.update(&poses, &[grab_input(false), grab_input(false)], &mut model), [GrabEvent::None, GrabEvent::None]);
    assert_eq!(grabbers.update(&poses, &[grab_input(false), grab_input(true)], &mut model), [GrabEvent::None, GrabEvent::Grabbed]);
}

#[test]
fn test_grab_simultaneous_press() {
    let mut model = Model::new(small_box(), Vector3::new(0.0, 1.0, 0.0), identity_rot());
    let mut grabbers = HandGrabbers::new(0.2);

    let near = Some(Pose::new(Vector3::new(0.0, 1.0, 0.1), identity_rot()));
    assert_eq!(grabbers.update(&[near, near], &[grab_input(true), grab_input(true)], &mut model), [GrabEvent::Grabbed, GrabEvent::None]);

    // The right hand can't take over while the left one holds the block.

    assert_eq!(grabbers.update(&[near, near], &[grab_input(true), grab_input(false)], &mut model), [GrabEvent::None, GrabEvent::None]);
    assert_eq!(grabbers.update(&[near, near], &[grab_input(true), grab_input(true)], &mut model), [GrabEvent::None, GrabEvent::None]);
}

#[test]
fn test_grab_observe_tracks_button() {
    let mut model = Model::new(small_box(), Vector3::new(0.0, 1.0, 0.0), identity_rot());
    let mut grabber = Grabber::new(0.2);
    let near = Pose::new(Vector3::new(0.0, 1.0, 0.1), identity_rot());

    grabber.observe(true);
    assert_eq!(grabber.update(Some(&near), true, &mut model), GrabEvent::None);
    assert!(!grabber.is_holding());
}

#[test]
fn test_app_frame_haptics() {
    let mut scene = Scene::new();
    let mut camera = Camera::new(Vector3::new(0.0, 0.0, 0.0), identity_rot());

    let mut frame = AppFrame::new(&mut scene, &mut camera, SessionStatus::default(), [HandInput::default(); 2], [None; 2]);
    assert_eq!(frame.get_haptics(), [false, false]);

    frame.request_haptic(1);
    assert_eq!(frame.get_haptics(), [false, true]);
}

// Config

#[test]
fn test_config_defaults() {
    let config = Config::from_toml("").unwrap();

    assert_eq!(config, Config::default());
    assert_eq!(config.sample_count, 4);
    assert_eq!(config.move_step, 0.05);
    assert_eq!(config.yaw_step, 0.02);
    assert_eq!(config.get_start_pos(), Vector3::new(0.0, 0.0, 5.0));
    assert_eq!(config.get_retry_sleep(), Duration::from_millis(10));
}

#[test]
fn test_config_partial_override() {
    let config = Config::from_toml("sample_count = 2\nmirror = false\n\n[cube]\nradius = 4.0\n").unwrap();

    assert_eq!(config.sample_count, 2);
    assert!(!config.mirror);
    assert_eq!(config.cube.radius, 4.0);
    assert_eq!(config.cube.height, 3.0);
    assert_eq!(config.cone, ConeConfig::default());
}

#[test]
fn test_config_invalid() {
    assert!(matches!(Config::from_toml("sample_count = \"four\""), Err(VrError::Config(_))));
    assert!(matches!(Config::load_opt(Some("/nonexistent/vrtest.toml")), Err(VrError::Io(_))));
    assert_eq!(Config::load_opt(None::<&str>).unwrap(), Config::default());
}

// Misc

#[test]
fn test_frame_stats() {
    let mut stats = FrameStats::new(Duration::from_secs(1));
    let t0 = Instant::now();

    assert_eq!(stats.tick(t0), None);
    assert_eq!(stats.tick(t0 + Duration::from_millis(500)), None);

    let fps = stats.tick(t0 + Duration::from_secs(1)).expect("Period is over");
    assert_near(fps, 3.0);

    assert_eq!(stats.tick(t0 + Duration::from_millis(1500)), None);
}

#[test]
fn test_mirror_window_size() {
    assert_eq!(get_window_size(&[(1000, 1100), (1000, 1100)], 0.5), (1000, 550));
    assert_eq!(get_window_size(&[(1000, 1100), (1200, 1000)], 1.0), (2200, 1100));
}

#[test]
fn test_embedded_shaders() {
    let asset_mgr = EmbedAssetManager::new();

    for name in ["shader/room.wgsl", "shader/mirror.wgsl"] {
        let source = asset_mgr.read_file(name).unwrap();
        assert!(source.contains("fn vs_main") && source.contains("fn fs_main"));
    }

    assert!(matches!(asset_mgr.read_file("shader/missing.wgsl"), Err(VrError::Asset(_))));
}
