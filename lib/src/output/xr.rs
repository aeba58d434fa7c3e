use std::collections::HashSet;
use std::ffi::{CStr, CString};
use std::sync::{Arc, Mutex};

use ash::vk::Handle;
use cgmath::Vector2;
use log::{info, warn};
use wgpu::{Adapter, Device, DeviceDescriptor, Instance, Queue, TextureFormat};

use crate::{APP_NAME, APP_VERSION_MAJOR, APP_VERSION_MINOR, APP_VERSION_PATCH};
use crate::camera::{Fov, Pose, recenter_pose};
use crate::config::Config;
use crate::error::{VkResultExt, VrError, VrResult, XrResultExt};
use crate::frameloop::EYE_COUNT;
use crate::input::HandInput;
use crate::output::{DEPTH_FORMAT, EyeTexture, OutputInfo, get_default_features, get_default_limits, get_sample_count};

const WGPU_FORMATS: [TextureFormat; 2] = [TextureFormat::Bgra8UnormSrgb, TextureFormat::Rgba8UnormSrgb];
const HAND_NAMES: [&str; 2] = ["left", "right"];
const PROFILES: [(&str, &str, Option<&str>); 3] = [ // (profile, grab, thumbstick)
    ("/interaction_profiles/khr/simple_controller", "input/select/click", None),
    ("/interaction_profiles/oculus/touch_controller", "input/squeeze/value", Some("input/thumbstick")),
    ("/interaction_profiles/valve/index_controller", "input/squeeze/value", Some("input/thumbstick")),
];

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SessionStatus {
    pub is_running: bool, // Frames may be waited and submitted.
    pub is_visible: bool,
    pub has_input_focus: bool,
    pub should_quit: bool,
    pub should_recenter: bool,
}

#[derive(Clone, Copy, Debug)]
pub struct FrameTiming {
    display_t: openxr::Time,
    should_render: bool,
}

impl FrameTiming {
    pub fn should_render(&self) -> bool {
        self.should_render
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EyeView {
    pub pose: Pose, // Tracking space.
    pub fov: Fov,
}

impl EyeView {
    fn from_xr(view: &openxr::View) -> Self {
        Self {
            pose: Pose::from_xr(&view.pose),
            fov: Fov::from_xr(&view.fov),
        }
    }
}

pub struct XROutput {
    // wgpu
    wgpu_inst: Instance,
    adapter: Adapter,
    device: Device,
    queue: Queue,
    color_format: TextureFormat,
    sample_count: u32,
    // OpenXR
    xr_color_format: u32,
    xr_depth_format: u32,
    eye_sizes: [(u32, u32); EYE_COUNT],
    state: State,
    event_buf: openxr::EventDataBuffer,
    xr_waiter: openxr::FrameWaiter,
    xr_stream: openxr::FrameStream<openxr::Vulkan>,
    xr_session: openxr::Session<openxr::Vulkan>,
    xr_stage_space: openxr::Space,
    xr_space: openxr::Space, // Recentered stage.
    xr_view_space: openxr::Space,
    xr_action_set: openxr::ActionSet,
    xr_hands: [HandActions; 2],
    xr_hand_spaces: [openxr::Space; 2],
    xr_inst: openxr::Instance,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum State {
    Stopped,
    Ready,
    Visible,
    Focused,
    Exit,
}

struct HandActions {
    aim: openxr::Action<openxr::Posef>,
    grab: openxr::Action<bool>,
    thumbstick: openxr::Action<openxr::Vector2f>,
    haptic: openxr::Action<openxr::Haptic>,
}

impl HandActions {
    fn new(xr_action_set: &openxr::ActionSet, name: &str) -> VrResult<Self> {
        let names = |kind: &str| (format!("{}_{}", name, kind), format!("{} {}", name, kind));

        let (aim_name, aim_title) = names("aim");
        let (grab_name, grab_title) = names("grab");
        let (thumbstick_name, thumbstick_title) = names("thumbstick");
        let (haptic_name, haptic_title) = names("haptic");

        Ok(Self {
            aim: xr_action_set.create_action(&aim_name, &aim_title, &[]).xr("create_action")?,
            grab: xr_action_set.create_action(&grab_name, &grab_title, &[]).xr("create_action")?,
            thumbstick: xr_action_set.create_action(&thumbstick_name, &thumbstick_title, &[]).xr("create_action")?,
            haptic: xr_action_set.create_action(&haptic_name, &haptic_title, &[]).xr("create_action")?,
        })
    }
}

impl XROutput {
    pub fn new(xr_entry: &openxr::Entry, config: &Config) -> VrResult<Self> {
        // This code is based on:
        // - https://openxr-tutorial.com/index.html
        // - https://github.com/rust-mobile/rust-android-examples/blob/main/na-openxr-wgpu/src/lib.rs
        // - https://github.com/philpax/wgpu-openxr-example

        let app_version = get_app_version();
        let wgpu_hal_flags = wgpu::InstanceFlags::default();

        // Use fullly qualified names for Vulkan/OpenXR, since they have
        // similar named structs.

        // Load Vulkan.

        let vk_entry = unsafe { ash::Entry::load() }?;
        let drop_guard = Arc::new(Mutex::new(DropGuard::new(vk_entry.clone())));

        // Create OpenXR instance:
        // - Don't let OpenXR to create vulkan instance and device (khr_vulkan_enable2).
        // - Instead, we create it manually (khr_vulkan_enable), since we need to tell
        //   wgpu which extensions are actually enabled.

        let xr_app_info = openxr::ApplicationInfo {
            application_name: APP_NAME,
            application_version: app_version,
            engine_name: APP_NAME,
            engine_version: app_version,
            ..Default::default()
        };

        let xr_ext_avail = xr_entry.enumerate_extensions().xr("enumerate_extensions")?;

        let mut xr_ext = openxr::ExtensionSet::default();
        xr_ext.khr_vulkan_enable = true;

        if xr_ext_avail.fb_display_refresh_rate {
            xr_ext.fb_display_refresh_rate = true;
        }

        let xr_inst = xr_entry.create_instance(&xr_app_info, &xr_ext, &[]).xr("create_instance")?;
        let xr_system = xr_inst.system(openxr::FormFactor::HEAD_MOUNTED_DISPLAY).map_err(|e| VrError::HmdNotDetected(e.to_string()))?;

        let xr_system_prop = xr_inst.system_properties(xr_system).xr("system_properties")?;
        info!("Using HMD: {} (vendor {})", xr_system_prop.system_name, xr_system_prop.vendor_id);

        // Check Vulkan/OpenXR compatibility.

        let xr_gfx_req = xr_inst.graphics_requirements::<openxr::Vulkan>(xr_system).xr("graphics_requirements")?;
        let vk_version = unsafe { vk_entry.try_enumerate_instance_version() }.vk("try_enumerate_instance_version")?.unwrap_or(ash::vk::API_VERSION_1_0);
        let vk_version_conv = openxr::Version::new(ash::vk::api_version_major(vk_version) as u16, ash::vk::api_version_minor(vk_version) as u16, ash::vk::api_version_patch(vk_version));

        // Runtimes tend to report an outdated max_api_version_supported, so only
        // the minimum is checked.

        if vk_version_conv < xr_gfx_req.min_api_version_supported {
            return Err(VrError::Unsupported(format!("Vulkan version {} mismatch, OpenXR min supported version = {}", vk_version_conv, xr_gfx_req.min_api_version_supported)));
        }

        // Create Vulkan instance:
        // - Query wgpu required extensions.
        // - Query OpenXR required extensions.

        let vk_app_name = to_cstring(APP_NAME)?;

        let vk_app_info = ash::vk::ApplicationInfo::default()
            .application_name(&vk_app_name)
            .application_version(app_version)
            .engine_name(&vk_app_name)
            .engine_version(app_version);

        let wgpu_exts = wgpu::hal::vulkan::Instance::desired_extensions(&vk_entry, vk_version, wgpu_hal_flags).map_err(|e| VrError::gpu("desired_extensions", e))?;
        let xr_exts = xr_inst.vulkan_legacy_instance_extensions(xr_system).xr("vulkan_legacy_instance_extensions")?;

        let exts_c = merge_extensions(&wgpu_exts, &xr_exts)?;
        let exts_c_ptr: Box<[_]> = exts_c.iter().map(|s| s.as_ptr()).collect();

        let vk_inst_create_info = ash::vk::InstanceCreateInfo::default()
            .application_info(&vk_app_info)
            .enabled_extension_names(&exts_c_ptr);

        let vk_inst = unsafe { vk_entry.create_instance(&vk_inst_create_info, None) }.vk("create_instance")?;
        drop_guard.lock().map_err(|e| VrError::gpu("lock", e))?.set_vk_inst(vk_inst.clone());

        // Get suitable Vulkan physical device.

        let vk_phys_dev_handle = unsafe { xr_inst.vulkan_graphics_device(xr_system, vk_inst.handle().as_raw() as _) }.xr("vulkan_graphics_device")?;
        let vk_phys_dev = ash::vk::PhysicalDevice::from_raw(vk_phys_dev_handle as _);

        // Find graphics queue.

        let vk_queue_families = unsafe { vk_inst.get_physical_device_queue_family_properties(vk_phys_dev) };
        let vk_queue_family_index = vk_queue_families
            .into_iter()
            .position(|family| family.queue_flags.contains(ash::vk::QueueFlags::GRAPHICS))
            .ok_or_else(|| VrError::Unsupported(String::from("Unable to find suitable graphics queue")))? as u32;

        let vk_queue_create_info = ash::vk::DeviceQueueCreateInfo::default()
            .queue_family_index(vk_queue_family_index)
            .queue_priorities(&[1.0]);
        let vk_queue_create_infos = [vk_queue_create_info];

        // Init wgpu.

        let wgpu_hal_exts: Vec<_> = exts_c.into_iter().map(leak_cstr).collect(); // TODO: How to do it without leak? Every session retry leaks the names again.

        // Dummy closure is created to hold drop_guard.

        let drop_callback: Option<wgpu::hal::DropCallback> = {
            let drop_guard = Arc::clone(&drop_guard);
            Some(Box::new(move || { let _ = Arc::strong_count(&drop_guard); }))
        };
        let wgpu_hal_inst = unsafe { wgpu::hal::vulkan::Instance::from_raw(vk_entry, vk_inst.clone(), vk_version, 0, None, wgpu_hal_exts, wgpu_hal_flags, Default::default(), false, drop_callback) }.map_err(|e| VrError::gpu("from_raw", e))?;
        let wgpu_hal_adapter = wgpu_hal_inst.expose_adapter(vk_phys_dev).ok_or_else(|| VrError::Unsupported(String::from("wgpu expose_adapter() failed")))?;

        // Create Vulkan device:
        // - Query wgpu required extensions.
        // - Query OpenXR required extensions.

        let wgpu_features = get_default_features();

        let wgpu_exts = wgpu_hal_adapter.adapter.required_device_extensions(wgpu_features);
        let xr_exts = xr_inst.vulkan_legacy_device_extensions(xr_system).xr("vulkan_legacy_device_extensions")?;

        let exts_c = merge_extensions(&wgpu_exts, &xr_exts)?;
        let exts_c_ptr: Box<[_]> = exts_c.iter().map(|s| s.as_ptr()).collect();

        let vk_dev_create_info = ash::vk::DeviceCreateInfo::default()
            .queue_create_infos(&vk_queue_create_infos)
            .enabled_extension_names(&exts_c_ptr);

        let wgpu_phys_exts: Box<[_]> = exts_c.into_iter().map(leak_cstr).collect();
        let mut wgpu_phys_features = wgpu_hal_adapter.adapter.physical_device_features(&wgpu_phys_exts, wgpu_features);
        let vk_dev_create_info2 = wgpu_phys_features.add_to_device_create(vk_dev_create_info);

        let vk_dev = unsafe { vk_inst.create_device(vk_phys_dev, &vk_dev_create_info2, None) }.vk("create_device")?;
        drop_guard.lock().map_err(|e| VrError::gpu("lock", e))?.set_vk_dev(vk_dev.clone());

        // Create OpenXR session.

        let xr_session_create_info = openxr::vulkan::SessionCreateInfo {
            instance: vk_inst.handle().as_raw() as _,
            physical_device: vk_phys_dev_handle,
            device: vk_dev.handle().as_raw() as _,
            queue_family_index: vk_queue_family_index,
            queue_index: 0,
        };

        let (xr_session, xr_waiter, xr_stream) = unsafe { xr_inst.create_session_with_guard::<openxr::Vulkan>(xr_system, &xr_session_create_info, Box::new(Arc::clone(&drop_guard))) }.xr("create_session")?;

        // Set display refresh rate to max.

        if xr_ext.fb_display_refresh_rate {
            let rates = xr_session.enumerate_display_refresh_rates().xr("enumerate_display_refresh_rates")?;
            if let Some(rate) = rates.into_iter().reduce(f32::max) {
                xr_session.request_display_refresh_rate(rate).xr("request_display_refresh_rate")?;
                info!("Display refresh rate: {} Hz", rate);
            }
        }

        // Query swapchain formats.

        let xr_formats = xr_session.enumerate_swapchain_formats().xr("enumerate_swapchain_formats")?;
        let as_raw = |format: TextureFormat| wgpu_hal_adapter.adapter.texture_format_as_raw(format).as_raw();

        let (xr_color_format, color_format) = xr_formats.iter().find_map(|xr_format| {
            WGPU_FORMATS.iter().find(|wgpu_format| as_raw(**wgpu_format) == *xr_format as i32).map(|wgpu_format| (*xr_format, *wgpu_format))
        }).ok_or_else(|| VrError::Unsupported(String::from("Unable to select color swapchain format")))?;

        let xr_depth_format = *xr_formats.iter().find(|xr_format| as_raw(DEPTH_FORMAT) == **xr_format as i32).ok_or_else(|| VrError::Unsupported(String::from("Unable to select depth swapchain format")))?;

        // Create wgpu device.

        // Dummy closure is created to hold drop_guard.

        let drop_callback: Option<wgpu::hal::DropCallback> = {
            let drop_guard = Arc::clone(&drop_guard);
            Some(Box::new(move || { let _ = Arc::strong_count(&drop_guard); }))
        };
        let wgpu_hal_dev = unsafe { wgpu_hal_adapter.adapter.device_from_raw(vk_dev.clone(), drop_callback, &wgpu_phys_exts, wgpu_features, &Default::default(), vk_queue_family_index, 0) }.map_err(|e| VrError::gpu("device_from_raw", e))?;

        let wgpu_inst = unsafe { Instance::from_hal::<wgpu::hal::vulkan::Api>(wgpu_hal_inst) };
        let adapter = unsafe { wgpu_inst.create_adapter_from_hal(wgpu_hal_adapter) };

        let device_desc = DeviceDescriptor {
            required_features: wgpu_features,
            required_limits: get_default_limits(),
            ..Default::default()
        };
        let (device, queue) = unsafe { adapter.create_device_from_hal(wgpu_hal_dev, &device_desc) }.map_err(|e| VrError::gpu("create_device_from_hal", e))?;

        // Query eye sizes.

        let xr_views = xr_inst.enumerate_view_configuration_views(xr_system, openxr::ViewConfigurationType::PRIMARY_STEREO).xr("enumerate_view_configuration_views")?;
        if xr_views.len() != EYE_COUNT {
            return Err(VrError::Unsupported(format!("Stereo view configuration expected, got {} views", xr_views.len())));
        }

        let eye_sizes = [0, 1].map(|eye| (xr_views[eye].recommended_image_rect_width, xr_views[eye].recommended_image_rect_height));
        let max_sample_count = xr_views.iter().map(|view| view.max_swapchain_sample_count).min().unwrap_or(1);
        let sample_count = get_sample_count(&adapter, color_format, config.sample_count, max_sample_count);

        info!("Eye texture sizes: {:?}, sample count: {}", eye_sizes, sample_count);

        // Setup spaces.

        let xr_stage_space = xr_session.create_reference_space(openxr::ReferenceSpaceType::STAGE, openxr::Posef::IDENTITY).xr("create_reference_space")?;
        let xr_space = xr_session.create_reference_space(openxr::ReferenceSpaceType::STAGE, openxr::Posef::IDENTITY).xr("create_reference_space")?;
        let xr_view_space = xr_session.create_reference_space(openxr::ReferenceSpaceType::VIEW, openxr::Posef::IDENTITY).xr("create_reference_space")?;

        // Setup input.

        let xr_action_set = xr_inst.create_action_set("input", "Input", 0).xr("create_action_set")?;
        let xr_hands = [HandActions::new(&xr_action_set, HAND_NAMES[0])?, HandActions::new(&xr_action_set, HAND_NAMES[1])?];

        suggest_bindings(&xr_inst, &xr_hands)?;
        xr_session.attach_action_sets(&[&xr_action_set]).xr("attach_action_sets")?;

        let xr_hand_spaces = [
            xr_hands[0].aim.create_space(xr_session.clone(), openxr::Path::NULL, openxr::Posef::IDENTITY).xr("create_space")?,
            xr_hands[1].aim.create_space(xr_session.clone(), openxr::Path::NULL, openxr::Posef::IDENTITY).xr("create_space")?,
        ];

        Ok(Self {
            wgpu_inst,
            adapter,
            device,
            queue,
            color_format,
            sample_count,
            xr_color_format,
            xr_depth_format,
            eye_sizes,
            state: State::Stopped,
            event_buf: openxr::EventDataBuffer::new(),
            xr_waiter,
            xr_stream,
            xr_session,
            xr_stage_space,
            xr_space,
            xr_view_space,
            xr_action_set,
            xr_hands,
            xr_hand_spaces,
            xr_inst,
        })
    }

    pub fn get_info(&self) -> OutputInfo {
        OutputInfo::new(&self.device, &self.queue, self.color_format, DEPTH_FORMAT, self.sample_count)
    }

    pub fn get_eye_texture_sizes(&self) -> [(u32, u32); EYE_COUNT] {
        self.eye_sizes
    }

    pub fn get_sample_count(&self) -> u32 {
        self.sample_count
    }

    pub(super) fn get_instance(&self) -> &Instance {
        &self.wgpu_inst
    }

    pub(super) fn get_adapter(&self) -> &Adapter {
        &self.adapter
    }

    pub(super) fn get_device(&self) -> &Device {
        &self.device
    }

    pub(super) fn get_color_format(&self) -> TextureFormat {
        self.color_format
    }

    pub(super) fn get_session(&self) -> &openxr::Session<openxr::Vulkan> {
        &self.xr_session
    }

    pub(super) fn get_xr_formats(&self) -> (u32, u32) {
        (self.xr_color_format, self.xr_depth_format)
    }

    pub fn poll_status(&mut self) -> VrResult<SessionStatus> {
        assert!(self.state != State::Exit); // Once exited, no more poll is possible.

        let mut should_recenter = false;

        while let Some(event) = self.xr_inst.poll_event(&mut self.event_buf).xr("poll_event")? {
            match event {
                openxr::Event::SessionStateChanged(event) => {
                    info!("Session state: {:?}", event.state());

                    match event.state() {
                        openxr::SessionState::READY => {
                            self.xr_session.begin(openxr::ViewConfigurationType::PRIMARY_STEREO).xr("begin")?;
                            self.state = State::Ready;
                        },
                        openxr::SessionState::STOPPING => {
                            self.xr_session.end().xr("end")?;
                            self.state = State::Stopped;
                        },
                        openxr::SessionState::SYNCHRONIZED => {
                            self.state = State::Ready;
                        },
                        openxr::SessionState::VISIBLE => {
                            self.state = State::Visible;
                        },
                        openxr::SessionState::FOCUSED => {
                            self.state = State::Focused;
                        },
                        openxr::SessionState::EXITING => {
                            self.state = State::Exit;
                            break;
                        },
                        openxr::SessionState::LOSS_PENDING => {
                            return Err(VrError::DisplayLost);
                        },
                        _ => (),
                    }
                },
                openxr::Event::InstanceLossPending(_) => {
                    return Err(VrError::DisplayLost);
                },
                openxr::Event::ReferenceSpaceChangePending(_) => {
                    should_recenter = true;
                },
                _ => (),
            }
        }

        Ok(SessionStatus {
            is_running: matches!(self.state, State::Ready | State::Visible | State::Focused),
            is_visible: matches!(self.state, State::Visible | State::Focused),
            has_input_focus: self.state == State::Focused,
            should_quit: self.state == State::Exit,
            should_recenter,
        })
    }

    pub fn wait_frame(&mut self) -> VrResult<FrameTiming> {
        let frame_state = self.xr_waiter.wait().xr("wait")?;
        self.xr_stream.begin().xr("begin")?;

        Ok(FrameTiming {
            display_t: frame_state.predicted_display_time,
            should_render: frame_state.should_render, // See openxr::SessionState::SYNCHRONIZED.
        })
    }

    pub fn recenter(&mut self, timing: &FrameTiming) -> VrResult<()> {
        let location = self.xr_view_space.locate(&self.xr_stage_space, timing.display_t).xr("locate")?;

        if !is_tracked(&location) {
            warn!("Unable to recenter, head is not tracked");
            return Ok(());
        }

        let origin = recenter_pose(&Pose::from_xr(&location.pose));
        self.xr_space = self.xr_session.create_reference_space(openxr::ReferenceSpaceType::STAGE, origin.to_xr()).xr("create_reference_space")?;

        info!("Recentered to {:?}", origin.pos);

        Ok(())
    }

    pub fn get_head_pose(&self, timing: &FrameTiming) -> VrResult<Option<Pose>> {
        let location = self.xr_view_space.locate(&self.xr_space, timing.display_t).xr("locate")?;
        Ok(is_tracked(&location).then(|| Pose::from_xr(&location.pose)))
    }

    pub fn get_eye_poses(&self, timing: &FrameTiming) -> VrResult<[EyeView; EYE_COUNT]> {
        let (_, views) = self.xr_session.locate_views(openxr::ViewConfigurationType::PRIMARY_STEREO, timing.display_t, &self.xr_space).xr("locate_views")?;

        if views.len() != EYE_COUNT {
            return Err(VrError::Unsupported(format!("Stereo views expected, got {} views", views.len())));
        }

        Ok([0, 1].map(|eye| EyeView::from_xr(&views[eye])))
    }

    pub fn get_hands(&self, timing: &FrameTiming) -> VrResult<[HandInput; 2]> {
        let mut hands = [HandInput::default(); 2];

        if self.state != State::Focused { // Actions are only active while focused.
            return Ok(hands);
        }

        self.xr_session.sync_actions(&[(&self.xr_action_set).into()]).xr("sync_actions")?;

        for ((hand, actions), space) in hands.iter_mut().zip(&self.xr_hands).zip(&self.xr_hand_spaces) {
            let location = space.locate(&self.xr_space, timing.display_t).xr("locate")?;
            let grab_state = actions.grab.state(&self.xr_session, openxr::Path::NULL).xr("state")?;
            let thumbstick_state = actions.thumbstick.state(&self.xr_session, openxr::Path::NULL).xr("state")?;

            if is_tracked(&location) {
                hand.pose = Some(Pose::from_xr(&location.pose));
            }

            hand.grab = grab_state.is_active && grab_state.current_state;

            if thumbstick_state.is_active {
                hand.thumbstick = Vector2::new(thumbstick_state.current_state.x, thumbstick_state.current_state.y);
            }
        }

        Ok(hands)
    }

    pub fn apply_haptic(&self, hand: usize) -> VrResult<()> {
        let event = openxr::HapticVibration::new().duration(openxr::Duration::MIN_HAPTIC).frequency(openxr::FREQUENCY_UNSPECIFIED).amplitude(1.0);
        self.xr_hands[hand].haptic.apply_feedback(&self.xr_session, openxr::Path::NULL, &event).xr("apply_feedback")
    }

    pub fn submit_frame(&mut self, timing: &FrameTiming, layer_opt: Option<(&[EyeTexture; EYE_COUNT], [EyeView; EYE_COUNT])>) -> VrResult<()> {
        let Some((textures, eye_views)) = layer_opt else {
            return self.xr_stream.end(timing.display_t, openxr::EnvironmentBlendMode::OPAQUE, &[]).xr("end");
        };

        if textures.iter().any(|texture| texture.is_acquired()) {
            return Err(VrError::Swapchain("submitted while an image is still acquired"));
        }

        let views = [0, 1].map(|eye| {
            openxr::CompositionLayerProjectionView::new()
                .pose(eye_views[eye].pose.to_xr())
                .fov(eye_views[eye].fov.to_xr())
                .sub_image(openxr::SwapchainSubImage::new()
                    .swapchain(textures[eye].get_color_chain())
                    .image_array_index(0)
                    .image_rect(textures[eye].get_rect())
                )
        });

        let layer = openxr::CompositionLayerProjection::new()
            .space(&self.xr_space)
            .views(&views);

        self.xr_stream.end(timing.display_t, openxr::EnvironmentBlendMode::OPAQUE, &[&layer]).xr("end")
    }
}

fn get_app_version() -> u32 {
    let parse = |s: &str| s.parse::<u8>().unwrap_or(0) as u32;
    parse(APP_VERSION_MAJOR) << 24 | parse(APP_VERSION_MINOR) << 16 | parse(APP_VERSION_PATCH)
}

fn is_tracked(location: &openxr::SpaceLocation) -> bool {
    location.location_flags.contains(openxr::SpaceLocationFlags::POSITION_VALID | openxr::SpaceLocationFlags::ORIENTATION_VALID)
}

fn to_cstring(s: &str) -> VrResult<CString> {
    CString::new(s).map_err(|e| VrError::Unsupported(e.to_string()))
}

fn merge_extensions(wgpu_exts: &[&'static CStr], xr_exts: &str) -> VrResult<Box<[CString]>> {
    let mut exts: HashSet<CString> = wgpu_exts.iter().map(|s| CString::from(*s)).collect(); // Deduplicate.

    for ext in xr_exts.split_ascii_whitespace() {
        exts.insert(to_cstring(ext)?);
    }

    Ok(exts.into_iter().collect())
}

fn leak_cstr(s: CString) -> &'static CStr {
    Box::leak(Box::new(s)).as_c_str()
}

fn suggest_bindings(xr_inst: &openxr::Instance, xr_hands: &[HandActions; 2]) -> VrResult<()> {
    for (profile, grab_input, thumbstick_opt) in PROFILES {
        let mut bindings = Vec::new();

        for (actions, hand_name) in xr_hands.iter().zip(HAND_NAMES) {
            let path = |input: &str| xr_inst.string_to_path(&format!("/user/hand/{}/{}", hand_name, input)).xr("string_to_path");

            bindings.push(openxr::Binding::new(&actions.aim, path("input/aim/pose")?));
            bindings.push(openxr::Binding::new(&actions.grab, path(grab_input)?));

            if let Some(thumbstick) = thumbstick_opt {
                bindings.push(openxr::Binding::new(&actions.thumbstick, path(thumbstick)?));
            }

            bindings.push(openxr::Binding::new(&actions.haptic, path("output/haptic")?));
        }

        let profile_path = xr_inst.string_to_path(profile).xr("string_to_path")?;

        // Runtimes may not know every profile, only the simple controller is mandatory.

        if let Err(e) = xr_inst.suggest_interaction_profile_bindings(profile_path, &bindings) {
            if thumbstick_opt.is_none() {
                return Err(VrError::Xr {
                    call: "suggest_interaction_profile_bindings",
                    result: e,
                });
            }

            warn!("Bindings for {} rejected: {}", profile, e);
        }
    }

    Ok(())
}

struct DropGuard {
    vk_inst: Option<ash::Instance>,
    vk_dev: Option<ash::Device>,
    _vk_entry: ash::Entry, // Make sure it is dropped last.
}

impl DropGuard {
    fn new(vk_entry: ash::Entry) -> Self {
        Self {
            vk_inst: None,
            vk_dev: None,
            _vk_entry: vk_entry,
        }
    }

    fn set_vk_inst(&mut self, vk_inst: ash::Instance) {
        assert!(self.vk_inst.is_none());
        self.vk_inst = Some(vk_inst);
    }

    fn set_vk_dev(&mut self, vk_dev: ash::Device) {
        assert!(self.vk_dev.is_none());
        self.vk_dev = Some(vk_dev);
    }
}

impl Drop for DropGuard {
    fn drop(&mut self) {
        // OpenXR/wgpu don't own the Vulkan handles created in XROutput::new().
        // DropGuard is shared with their drop callbacks, the handles are
        // destroyed once the last reference is gone.

        if let Some(vk_dev) = &self.vk_dev {
            // Device must be destroyed before its parent instance.

            unsafe { vk_dev.destroy_device(None) };
        }

        if let Some(vk_inst) = &self.vk_inst {
            unsafe { vk_inst.destroy_instance(None) };
        }
    }
}
