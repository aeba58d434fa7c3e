use std::thread;
use std::time::Duration;

use log::{error, info, warn};

use crate::error::{VrError, VrResult};

pub const EYE_COUNT: usize = 2;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LoopState {
    Uninitialized,
    SessionActive,
    PoseAcquired,
    Rendered,
    Submitted,
    MirrorPresented,
    Teardown,
}

// Tracks where a session is within its frame cycle. The runtime enforces the
// same ordering, this only catches it on our side before calling into it.
pub struct FrameLoop {
    state: LoopState,
    frame_index: u64,
}

impl FrameLoop {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            state: LoopState::Uninitialized,
            frame_index: 0,
        }
    }

    pub fn get_state(&self) -> LoopState {
        self.state
    }

    pub fn get_frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn session_started(&mut self, eye_count: usize) -> VrResult<()> {
        if eye_count != EYE_COUNT {
            return Err(VrError::Swapchain("pair is incomplete, two eye textures are needed"));
        }

        self.go(&[LoopState::Uninitialized], LoopState::SessionActive)?;
        self.frame_index = 0;

        Ok(())
    }

    pub fn pose_acquired(&mut self) -> VrResult<u64> {
        self.go(&[LoopState::SessionActive, LoopState::Submitted, LoopState::MirrorPresented], LoopState::PoseAcquired)?;
        Ok(self.frame_index)
    }

    pub fn rendered(&mut self) -> VrResult<()> {
        self.go(&[LoopState::PoseAcquired], LoopState::Rendered)
    }

    pub fn submitted(&mut self) -> VrResult<u64> {
        self.go(&[LoopState::Rendered], LoopState::Submitted)?;

        let index = self.frame_index;
        self.frame_index += 1;

        Ok(index)
    }

    pub fn mirror_presented(&mut self) -> VrResult<()> {
        // The mirror is presented on every iteration, also when the HMD is
        // not visible and nothing has been submitted.

        self.go(&[LoopState::SessionActive, LoopState::Submitted, LoopState::MirrorPresented], LoopState::MirrorPresented)
    }

    pub fn teardown(&mut self) {
        self.state = LoopState::Teardown;
    }

    fn go(&mut self, from: &[LoopState], to: LoopState) -> VrResult<()> {
        if from.contains(&self.state) {
            self.state = to;
            Ok(())
        } else {
            Err(VrError::Transition {
                from: self.state,
                to,
            })
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SessionEnd {
    Quit,
    WindowClosed,
}

// Decides whether the host should try to create a new session. Ok(true) means
// retry, Ok(false) means stop, Err is fatal.
pub fn classify_session_end(end: VrResult<SessionEnd>, retry_create: bool) -> VrResult<bool> {
    match end {
        Ok(SessionEnd::Quit) | Ok(SessionEnd::WindowClosed) => Ok(false),
        Err(e) if e.is_retryable() => {
            warn!("Session ended: {}, retrying", e);
            Ok(true)
        },
        Err(e) if retry_create => {
            warn!("Session failed: {}, retrying", e);
            Ok(true)
        },
        Err(e) => {
            error!("Session failed: {}", e);
            Err(e)
        },
    }
}

pub fn run_retry_loop<S, H, M>(host: &mut S, mut host_alive: H, mut main_loop: M, retry_sleep: Duration) -> VrResult<()>
where
    H: FnMut(&mut S) -> bool,
    M: FnMut(&mut S, bool) -> VrResult<bool>,
{
    // First attempt must not fail silently: an error here means there is
    // nothing to render to.

    let mut retry = main_loop(host, false)?;

    while retry && host_alive(host) {
        thread::sleep(retry_sleep); // Don't spin while the HMD is disconnected.

        info!("Recreating session");
        retry = main_loop(host, true)?;
    }

    Ok(())
}
