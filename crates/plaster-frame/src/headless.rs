//! Scripted fake device and surface.
//!
//! [`HeadlessDevice`] implements [`GpuBackend`] without a GPU. It keeps an
//! ordered event log, lets tests decide when submitted work completes, scripts
//! acquisition and presentation outcomes, injects creation failures, and
//! records protocol violations such as resetting a command buffer that is still
//! executing or writing uniforms the GPU is reading.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use hashbrown::{HashMap, HashSet};
use parking_lot::{Condvar, Mutex, MutexGuard};
use plaster_core::{CameraUniforms, Extent2d, LightUniforms, ObjectUniforms};
use tracing::warn;

use crate::backend::{
    AcquireOutcome, FenceStatus, GpuBackend, PresentOutcome, Submission, SwapchainDesc,
};
use crate::draw::{BindMaterial, DrawMesh};
use crate::error::{FrameError, Result};
use crate::surface::{PresentMode, Surface, SurfaceFormat, SurfaceSupport};

macro_rules! handles {
    ($($name:ident),* $(,)?) => {
        $(
            #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
            pub struct $name(pub u64);
        )*
    };
}

handles!(
    HeadlessFence,
    HeadlessSemaphore,
    HeadlessCommandBuffer,
    HeadlessImageView,
    HeadlessFramebuffer,
    HeadlessRenderPass,
    HeadlessPipeline,
);

#[derive(Debug)]
pub struct HeadlessSwapchain {
    pub id: u64,
    pub extent: Extent2d,
    pub image_count: u32,
}

#[derive(Debug)]
pub struct HeadlessFrameResources {
    id: u64,
    object_capacity: usize,
    object_stride: u64,
}

/// When submitted work completes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GpuCompletion {
    /// Fences signal as soon as their submission is queued.
    #[default]
    Immediate,
    /// Fences signal only through [`HeadlessDevice::complete_all`],
    /// [`HeadlessDevice::signal_fence`] or a device idle wait.
    Manual,
}

/// Device steps that can be made to fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FaultPoint {
    Swapchain,
    ImageView,
    Framebuffer,
    FrameResources,
    RenderPass,
    Pipeline,
    /// Beginning command buffer recording.
    Record,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ScriptedAcquire {
    OutOfDate,
    Suboptimal,
    Timeout,
    Image(u32),
}

/// A swapchain creation as seen by the device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwapchainCreation {
    pub id: u64,
    pub extent: Extent2d,
    pub image_count: u32,
    pub present_mode: PresentMode,
    pub format: SurfaceFormat,
    /// Swapchain handed over as the predecessor.
    pub retired: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeviceEvent {
    FenceWaited { fence: HeadlessFence, signaled: bool },
    FenceReset(HeadlessFence),
    FenceSignaled(HeadlessFence),
    CommandBufferReset(HeadlessCommandBuffer),
    FrameUniformsWritten { resources: u64 },
    Acquired { swapchain: u64, image_index: u32 },
    AcquireOutOfDate,
    RenderPassBegun { framebuffer: HeadlessFramebuffer, extent: Extent2d },
    PipelineBound { extent: Extent2d },
    ObjectBound { dynamic_offset: u32 },
    MaterialBound(u32),
    MeshBound(u32),
    Draw { mesh: u32, index_count: u32 },
    Submitted { command_buffer: HeadlessCommandBuffer, fence: HeadlessFence },
    Presented { swapchain: u64, image_index: u32 },
    SwapchainCreated(SwapchainCreation),
    SwapchainDestroyed(u64),
    WaitIdle,
}

/// Counts of live device objects.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LiveObjects {
    pub fences: usize,
    pub semaphores: usize,
    pub command_buffers: usize,
    pub swapchains: usize,
    pub image_views: usize,
    pub framebuffers: usize,
    pub render_passes: usize,
    pub pipelines: usize,
    pub frame_resources: usize,
}

impl LiveObjects {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Surface capabilities and behavior of a [`HeadlessDevice`].
#[derive(Clone, Debug)]
pub struct HeadlessConfig {
    pub completion: GpuCompletion,
    pub formats: Vec<SurfaceFormat>,
    pub present_modes: Vec<PresentMode>,
    pub min_image_count: u32,
    pub max_image_count: u32,
    pub current_extent: Option<Extent2d>,
    pub min_extent: Extent2d,
    pub max_extent: Extent2d,
    pub uniform_alignment: u64,
}

impl Default for HeadlessConfig {
    /// Three images, mailbox available, extent chosen by the swapchain.
    fn default() -> Self {
        Self {
            completion: GpuCompletion::Immediate,
            formats: vec![SurfaceFormat::BGRA8_SRGB],
            present_modes: vec![PresentMode::Fifo, PresentMode::Mailbox],
            min_image_count: 2,
            max_image_count: 3,
            current_extent: None,
            min_extent: Extent2d::new(1, 1),
            max_extent: Extent2d::new(16384, 16384),
            uniform_alignment: 256,
        }
    }
}

impl HeadlessConfig {
    #[must_use]
    pub const fn with_completion(mut self, completion: GpuCompletion) -> Self {
        self.completion = completion;
        self
    }

    /// Capabilities under which swapchains get exactly `count` images.
    #[must_use]
    pub fn with_image_count(mut self, count: u32) -> Self {
        self.min_image_count = count.saturating_sub(1).max(1);
        self.max_image_count = count.max(1);
        self
    }

    #[must_use]
    pub fn with_formats(mut self, formats: Vec<SurfaceFormat>) -> Self {
        self.formats = formats;
        self
    }

    #[must_use]
    pub fn with_present_modes(mut self, present_modes: Vec<PresentMode>) -> Self {
        self.present_modes = present_modes;
        self
    }

    #[must_use]
    pub const fn with_current_extent(mut self, extent: Option<Extent2d>) -> Self {
        self.current_extent = extent;
        self
    }

    #[must_use]
    pub const fn with_uniform_alignment(mut self, alignment: u64) -> Self {
        self.uniform_alignment = alignment;
        self
    }
}

#[derive(Default)]
struct CommandBufferState {
    recording: bool,
    framebuffer: Option<u64>,
    resources: Option<u64>,
}

struct SwapchainRecord {
    image_count: u32,
    next_image: u32,
    retired: bool,
}

struct PendingSubmission {
    fence: u64,
    command_buffer: u64,
    framebuffer: Option<u64>,
    resources: Option<u64>,
}

#[derive(Default)]
struct DeviceState {
    config: HeadlessConfig,
    next_id: u64,
    /// Fence id to signaled.
    fences: HashMap<u64, bool>,
    /// Semaphore id to signaled-and-not-yet-waited.
    semaphores: HashMap<u64, bool>,
    command_buffers: HashMap<u64, CommandBufferState>,
    swapchains: HashMap<u64, SwapchainRecord>,
    image_views: HashSet<u64>,
    framebuffers: HashSet<u64>,
    render_passes: HashSet<u64>,
    pipelines: HashSet<u64>,
    frame_resources: HashSet<u64>,
    pending: Vec<PendingSubmission>,
    acquire_script: VecDeque<ScriptedAcquire>,
    present_script: VecDeque<PresentOutcome>,
    faults: HashMap<FaultPoint, usize>,
    creations: Vec<SwapchainCreation>,
    events: Vec<DeviceEvent>,
    violations: Vec<String>,
    submissions: u64,
}

impl DeviceState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn violation(&mut self, message: String) {
        warn!("Headless device violation: {}", message);
        self.violations.push(message);
    }

    fn fault(&mut self, point: FaultPoint) -> Result<()> {
        let Some(remaining) = self.faults.get_mut(&point) else {
            return Ok(());
        };
        if *remaining > 0 {
            *remaining -= 1;
            return Ok(());
        }
        self.faults.remove(&point);
        Err(FrameError::Device(format!("injected {point:?} failure")))
    }

    fn signal(&mut self, fence: u64) {
        if let Some(signaled) = self.fences.get_mut(&fence) {
            if !*signaled {
                *signaled = true;
                self.events.push(DeviceEvent::FenceSignaled(HeadlessFence(fence)));
            }
        }
        self.pending.retain(|p| p.fence != fence);
    }

    fn complete_all(&mut self) {
        let fences: Vec<u64> = self.pending.iter().map(|p| p.fence).collect();
        for fence in fences {
            self.signal(fence);
        }
    }

    fn check_idle(&mut self, what: &str) {
        if !self.pending.is_empty() {
            self.violation(format!(
                "{what} destroyed while {} submissions are executing",
                self.pending.len()
            ));
        }
    }

    fn remove_live(set: &mut HashSet<u64>, id: u64, what: &str, violations: &mut Vec<String>) {
        if !set.remove(&id) {
            let message = format!("destroyed unknown {what} {id}");
            warn!("Headless device violation: {}", message);
            violations.push(message);
        }
    }

    /// Wait on a semaphore, which must have a signal pending.
    fn consume_semaphore(&mut self, id: u64, by: &str) {
        let consumed = match self.semaphores.get_mut(&id) {
            Some(signaled) if *signaled => {
                *signaled = false;
                true
            }
            _ => false,
        };
        if !consumed {
            self.violation(format!("{by} waits on semaphore {id} that nothing signals"));
        }
    }

    /// Signal a semaphore, which must not already have a signal pending.
    fn raise_semaphore(&mut self, id: u64, by: &str) {
        let raised = match self.semaphores.get_mut(&id) {
            Some(signaled) if !*signaled => {
                *signaled = true;
                true
            }
            _ => false,
        };
        if !raised {
            self.violation(format!(
                "{by} signals semaphore {id} that is unknown or already pending"
            ));
        }
    }

    fn check_resources_idle(&mut self, resources: u64) {
        if self.pending.iter().any(|p| p.resources == Some(resources)) {
            self.violation(format!(
                "uniforms of frame resources {resources} written while the GPU reads them"
            ));
        }
    }
}

struct Shared {
    state: Mutex<DeviceState>,
    fence_signaled: Condvar,
}

/// Fake GPU device. Clones share the same state.
#[derive(Clone)]
pub struct HeadlessDevice {
    shared: Arc<Shared>,
}

impl HeadlessDevice {
    pub fn new(config: HeadlessConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(DeviceState {
                    config,
                    ..DeviceState::default()
                }),
                fence_signaled: Condvar::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, DeviceState> {
        self.shared.state.lock()
    }

    /// Complete every submission still executing.
    pub fn complete_all(&self) {
        self.state().complete_all();
        self.shared.fence_signaled.notify_all();
    }

    /// Complete the submission guarded by `fence`.
    pub fn signal_fence(&self, fence: HeadlessFence) {
        self.state().signal(fence.0);
        self.shared.fence_signaled.notify_all();
    }

    pub fn is_fence_signaled(&self, fence: HeadlessFence) -> bool {
        self.state().fences.get(&fence.0).copied().unwrap_or(false)
    }

    /// Submissions still executing.
    pub fn pending_submissions(&self) -> usize {
        self.state().pending.len()
    }

    /// Fences guarding the submissions still executing, oldest first.
    pub fn pending_fences(&self) -> Vec<HeadlessFence> {
        self.state().pending.iter().map(|p| HeadlessFence(p.fence)).collect()
    }

    /// The next `count` acquisitions report the swapchain out of date.
    pub fn script_acquire_out_of_date(&self, count: usize) {
        self.script_acquire(ScriptedAcquire::OutOfDate, count);
    }

    /// The next `count` acquisitions succeed but report suboptimal.
    pub fn script_acquire_suboptimal(&self, count: usize) {
        self.script_acquire(ScriptedAcquire::Suboptimal, count);
    }

    /// The next `count` acquisitions time out.
    pub fn script_acquire_timeout(&self, count: usize) {
        self.script_acquire(ScriptedAcquire::Timeout, count);
    }

    /// The next acquisitions return these image indices, in order.
    pub fn script_acquire_images(&self, indices: &[u32]) {
        let mut state = self.state();
        state
            .acquire_script
            .extend(indices.iter().map(|&i| ScriptedAcquire::Image(i)));
    }

    fn script_acquire(&self, outcome: ScriptedAcquire, count: usize) {
        let mut state = self.state();
        state
            .acquire_script
            .extend(std::iter::repeat(outcome).take(count));
    }

    /// The next `count` presentations return `outcome`.
    pub fn script_present(&self, outcome: PresentOutcome, count: usize) {
        let mut state = self.state();
        state
            .present_script
            .extend(std::iter::repeat(outcome).take(count));
    }

    /// Make the creation step at `point` fail once, after `after` more successes.
    pub fn inject_fault(&self, point: FaultPoint, after: usize) {
        self.state().faults.insert(point, after);
    }

    /// Change what the surface reports from now on.
    pub fn set_current_extent(&self, extent: Option<Extent2d>) {
        self.state().config.current_extent = extent;
    }

    pub fn set_formats(&self, formats: Vec<SurfaceFormat>) {
        self.state().config.formats = formats;
    }

    pub fn events(&self) -> Vec<DeviceEvent> {
        self.state().events.clone()
    }

    pub fn clear_events(&self) {
        self.state().events.clear();
    }

    pub fn violations(&self) -> Vec<String> {
        self.state().violations.clone()
    }

    pub fn swapchain_creations(&self) -> Vec<SwapchainCreation> {
        self.state().creations.clone()
    }

    pub fn submission_count(&self) -> u64 {
        self.state().submissions
    }

    pub fn draw_count(&self) -> usize {
        self.state()
            .events
            .iter()
            .filter(|e| matches!(e, DeviceEvent::Draw { .. }))
            .count()
    }

    pub fn live_objects(&self) -> LiveObjects {
        let state = self.state();
        LiveObjects {
            fences: state.fences.len(),
            semaphores: state.semaphores.len(),
            command_buffers: state.command_buffers.len(),
            swapchains: state.swapchains.len(),
            image_views: state.image_views.len(),
            framebuffers: state.framebuffers.len(),
            render_passes: state.render_passes.len(),
            pipelines: state.pipelines.len(),
            frame_resources: state.frame_resources.len(),
        }
    }

    fn record(&self, event: DeviceEvent) {
        self.state().events.push(event);
    }
}

fn unknown(what: &str, id: u64) -> FrameError {
    FrameError::InvalidState(format!("unknown {what} {id}"))
}

impl GpuBackend for HeadlessDevice {
    type Fence = HeadlessFence;
    type Semaphore = HeadlessSemaphore;
    type CommandBuffer = HeadlessCommandBuffer;
    type Swapchain = HeadlessSwapchain;
    type ImageView = HeadlessImageView;
    type Framebuffer = HeadlessFramebuffer;
    type RenderPass = HeadlessRenderPass;
    type Pipeline = HeadlessPipeline;
    type FrameResources = HeadlessFrameResources;

    fn create_fence(&self, signaled: bool) -> Result<HeadlessFence> {
        let mut state = self.state();
        let id = state.next_id();
        state.fences.insert(id, signaled);
        Ok(HeadlessFence(id))
    }

    fn wait_for_fence(&self, fence: HeadlessFence, timeout: Duration) -> Result<FenceStatus> {
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.state();
        loop {
            let signaled = *state.fences.get(&fence.0).ok_or_else(|| unknown("fence", fence.0))?;
            if signaled {
                state.events.push(DeviceEvent::FenceWaited { fence, signaled: true });
                return Ok(FenceStatus::Signaled);
            }
            match deadline {
                Some(deadline) => {
                    if self
                        .shared
                        .fence_signaled
                        .wait_until(&mut state, deadline)
                        .timed_out()
                    {
                        let signaled = state.fences.get(&fence.0).copied().unwrap_or(false);
                        state.events.push(DeviceEvent::FenceWaited { fence, signaled });
                        return Ok(if signaled {
                            FenceStatus::Signaled
                        } else {
                            FenceStatus::TimedOut
                        });
                    }
                }
                None => self.shared.fence_signaled.wait(&mut state),
            }
        }
    }

    fn reset_fence(&self, fence: HeadlessFence) -> Result<()> {
        let mut state = self.state();
        if state.pending.iter().any(|p| p.fence == fence.0) {
            state.violation(format!("fence {} reset while its submission executes", fence.0));
        }
        let signaled = state
            .fences
            .get_mut(&fence.0)
            .ok_or_else(|| unknown("fence", fence.0))?;
        *signaled = false;
        state.events.push(DeviceEvent::FenceReset(fence));
        Ok(())
    }

    fn destroy_fence(&self, fence: HeadlessFence) {
        let mut state = self.state();
        if state.pending.iter().any(|p| p.fence == fence.0) {
            state.violation(format!("fence {} destroyed while in use", fence.0));
        }
        if state.fences.remove(&fence.0).is_none() {
            state.violation(format!("destroyed unknown fence {}", fence.0));
        }
    }

    fn create_semaphore(&self) -> Result<HeadlessSemaphore> {
        let mut state = self.state();
        let id = state.next_id();
        state.semaphores.insert(id, false);
        Ok(HeadlessSemaphore(id))
    }

    fn destroy_semaphore(&self, semaphore: HeadlessSemaphore) {
        let mut state = self.state();
        if state.semaphores.remove(&semaphore.0).is_none() {
            state.violation(format!("destroyed unknown semaphore {}", semaphore.0));
        }
    }

    fn wait_idle(&self) -> Result<()> {
        {
            let mut state = self.state();
            state.events.push(DeviceEvent::WaitIdle);
            state.complete_all();
        }
        self.shared.fence_signaled.notify_all();
        Ok(())
    }

    fn allocate_command_buffer(&self) -> Result<HeadlessCommandBuffer> {
        let mut state = self.state();
        let id = state.next_id();
        state.command_buffers.insert(id, CommandBufferState::default());
        Ok(HeadlessCommandBuffer(id))
    }

    fn free_command_buffer(&self, cmd: HeadlessCommandBuffer) {
        let mut state = self.state();
        if state.pending.iter().any(|p| p.command_buffer == cmd.0) {
            state.violation(format!("command buffer {} freed while executing", cmd.0));
        }
        if state.command_buffers.remove(&cmd.0).is_none() {
            state.violation(format!("freed unknown command buffer {}", cmd.0));
        }
    }

    fn reset_command_buffer(&self, cmd: HeadlessCommandBuffer) -> Result<()> {
        let mut state = self.state();
        if state.pending.iter().any(|p| p.command_buffer == cmd.0) {
            state.violation(format!("command buffer {} reset while executing", cmd.0));
        }
        let buffer = state
            .command_buffers
            .get_mut(&cmd.0)
            .ok_or_else(|| unknown("command buffer", cmd.0))?;
        *buffer = CommandBufferState::default();
        state.events.push(DeviceEvent::CommandBufferReset(cmd));
        Ok(())
    }

    fn begin_command_buffer(&self, cmd: HeadlessCommandBuffer) -> Result<()> {
        let mut state = self.state();
        state.fault(FaultPoint::Record)?;
        let buffer = state
            .command_buffers
            .get_mut(&cmd.0)
            .ok_or_else(|| unknown("command buffer", cmd.0))?;
        buffer.recording = true;
        Ok(())
    }

    fn end_command_buffer(&self, cmd: HeadlessCommandBuffer) -> Result<()> {
        let mut state = self.state();
        let buffer = state
            .command_buffers
            .get_mut(&cmd.0)
            .ok_or_else(|| unknown("command buffer", cmd.0))?;
        if !buffer.recording {
            return Err(FrameError::InvalidState(format!(
                "command buffer {} ended without begin",
                cmd.0
            )));
        }
        buffer.recording = false;
        Ok(())
    }

    fn cmd_begin_render_pass(
        &self,
        cmd: HeadlessCommandBuffer,
        _render_pass: HeadlessRenderPass,
        framebuffer: HeadlessFramebuffer,
        extent: Extent2d,
        _clear_color: [f32; 4],
    ) {
        let mut state = self.state();
        if !state.framebuffers.contains(&framebuffer.0) {
            state.violation(format!("render pass begun on unknown framebuffer {}", framebuffer.0));
        }
        if let Some(buffer) = state.command_buffers.get_mut(&cmd.0) {
            buffer.framebuffer = Some(framebuffer.0);
        }
        state.events.push(DeviceEvent::RenderPassBegun { framebuffer, extent });
    }

    fn cmd_end_render_pass(&self, _cmd: HeadlessCommandBuffer) {}

    fn cmd_bind_pipeline(&self, _cmd: HeadlessCommandBuffer, _pipeline: &HeadlessPipeline, extent: Extent2d) {
        self.record(DeviceEvent::PipelineBound { extent });
    }

    fn cmd_bind_frame_resources(
        &self,
        cmd: HeadlessCommandBuffer,
        _pipeline: &HeadlessPipeline,
        resources: &HeadlessFrameResources,
    ) {
        if let Some(buffer) = self.state().command_buffers.get_mut(&cmd.0) {
            buffer.resources = Some(resources.id);
        }
    }

    fn cmd_bind_object(
        &self,
        _cmd: HeadlessCommandBuffer,
        _pipeline: &HeadlessPipeline,
        _resources: &HeadlessFrameResources,
        dynamic_offset: u32,
    ) {
        self.record(DeviceEvent::ObjectBound { dynamic_offset });
    }

    fn min_uniform_alignment(&self) -> u64 {
        self.state().config.uniform_alignment
    }

    fn create_frame_resources(
        &self,
        object_capacity: usize,
        object_stride: u64,
    ) -> Result<HeadlessFrameResources> {
        let mut state = self.state();
        state.fault(FaultPoint::FrameResources)?;
        let id = state.next_id();
        state.frame_resources.insert(id);
        Ok(HeadlessFrameResources {
            id,
            object_capacity,
            object_stride,
        })
    }

    fn write_frame_uniforms(
        &self,
        resources: &mut HeadlessFrameResources,
        _camera: &CameraUniforms,
        _lights: &LightUniforms,
    ) -> Result<()> {
        let mut state = self.state();
        state.check_resources_idle(resources.id);
        state
            .events
            .push(DeviceEvent::FrameUniformsWritten { resources: resources.id });
        Ok(())
    }

    fn write_object_uniforms(
        &self,
        resources: &mut HeadlessFrameResources,
        offset: u64,
        _object: &ObjectUniforms,
    ) -> Result<()> {
        let mut state = self.state();
        state.check_resources_idle(resources.id);
        let stride = resources.object_stride.max(1);
        if offset % stride != 0 || offset / stride >= resources.object_capacity as u64 {
            return Err(FrameError::InvalidState(format!(
                "object offset {offset} outside buffer of {} x {stride} bytes",
                resources.object_capacity
            )));
        }
        Ok(())
    }

    fn destroy_frame_resources(&self, resources: HeadlessFrameResources) {
        let mut state = self.state();
        state.check_resources_idle(resources.id);
        let DeviceState {
            frame_resources,
            violations,
            ..
        } = &mut *state;
        DeviceState::remove_live(frame_resources, resources.id, "frame resources", violations);
    }

    fn create_render_pass(&self, _format: SurfaceFormat) -> Result<HeadlessRenderPass> {
        let mut state = self.state();
        state.fault(FaultPoint::RenderPass)?;
        let id = state.next_id();
        state.render_passes.insert(id);
        Ok(HeadlessRenderPass(id))
    }

    fn destroy_render_pass(&self, render_pass: HeadlessRenderPass) {
        let mut state = self.state();
        state.check_idle("render pass");
        let DeviceState {
            render_passes,
            violations,
            ..
        } = &mut *state;
        DeviceState::remove_live(render_passes, render_pass.0, "render pass", violations);
    }

    fn create_pipeline(&self, render_pass: HeadlessRenderPass) -> Result<HeadlessPipeline> {
        let mut state = self.state();
        state.fault(FaultPoint::Pipeline)?;
        if !state.render_passes.contains(&render_pass.0) {
            return Err(unknown("render pass", render_pass.0));
        }
        let id = state.next_id();
        state.pipelines.insert(id);
        Ok(HeadlessPipeline(id))
    }

    fn destroy_pipeline(&self, pipeline: HeadlessPipeline) {
        let mut state = self.state();
        state.check_idle("pipeline");
        let DeviceState {
            pipelines,
            violations,
            ..
        } = &mut *state;
        DeviceState::remove_live(pipelines, pipeline.0, "pipeline", violations);
    }

    fn submit(&self, submission: &Submission<Self>) -> Result<()> {
        let immediate = {
            let mut state = self.state();
            let cmd = submission.command_buffer.0;
            let fence = submission.fence.0;

            let (recording, framebuffer, resources) = {
                let buffer = state
                    .command_buffers
                    .get(&cmd)
                    .ok_or_else(|| unknown("command buffer", cmd))?;
                (buffer.recording, buffer.framebuffer, buffer.resources)
            };
            if recording {
                state.violation(format!("command buffer {cmd} submitted while recording"));
            }
            if state.fences.get(&fence).copied().unwrap_or(true) {
                state.violation(format!("submitted with fence {fence} already signaled"));
            }
            if let Some(fb) = framebuffer {
                let other = state
                    .pending
                    .iter()
                    .find(|p| p.framebuffer == Some(fb))
                    .map(|p| p.fence);
                if let Some(other) = other {
                    state.violation(format!(
                        "framebuffer {fb} targeted by two in-flight submissions (fences {other} and {fence})"
                    ));
                }
            }

            state.consume_semaphore(submission.wait_semaphore.0, "submission");
            state.raise_semaphore(submission.signal_semaphore.0, "submission");

            state.pending.push(PendingSubmission {
                fence,
                command_buffer: cmd,
                framebuffer,
                resources,
            });
            state.submissions += 1;
            state.events.push(DeviceEvent::Submitted {
                command_buffer: submission.command_buffer,
                fence: submission.fence,
            });

            let immediate = state.config.completion == GpuCompletion::Immediate;
            if immediate {
                state.signal(fence);
            }
            immediate
        };
        if immediate {
            self.shared.fence_signaled.notify_all();
        }
        Ok(())
    }

    fn surface_support(&self) -> Result<SurfaceSupport> {
        let state = self.state();
        let config = &state.config;
        Ok(SurfaceSupport {
            formats: config.formats.clone(),
            present_modes: config.present_modes.clone(),
            min_image_count: config.min_image_count,
            max_image_count: config.max_image_count,
            current_extent: config.current_extent,
            min_extent: config.min_extent,
            max_extent: config.max_extent,
        })
    }

    fn create_swapchain(
        &self,
        desc: &SwapchainDesc,
        old: Option<&HeadlessSwapchain>,
    ) -> Result<HeadlessSwapchain> {
        let mut state = self.state();
        state.fault(FaultPoint::Swapchain)?;
        if let Some(old) = old {
            let record = state
                .swapchains
                .get_mut(&old.id)
                .ok_or_else(|| unknown("swapchain", old.id))?;
            record.retired = true;
        }

        let id = state.next_id();
        let image_count = desc.min_image_count.max(1);
        state.swapchains.insert(
            id,
            SwapchainRecord {
                image_count,
                next_image: 0,
                retired: false,
            },
        );
        let creation = SwapchainCreation {
            id,
            extent: desc.extent,
            image_count,
            present_mode: desc.present_mode,
            format: desc.format,
            retired: old.map(|o| o.id),
        };
        state.creations.push(creation);
        state.events.push(DeviceEvent::SwapchainCreated(creation));
        Ok(HeadlessSwapchain {
            id,
            extent: desc.extent,
            image_count,
        })
    }

    fn swapchain_image_count(&self, swapchain: &HeadlessSwapchain) -> usize {
        swapchain.image_count as usize
    }

    fn create_image_view(&self, swapchain: &HeadlessSwapchain, index: usize) -> Result<HeadlessImageView> {
        let mut state = self.state();
        state.fault(FaultPoint::ImageView)?;
        if index >= swapchain.image_count as usize {
            return Err(FrameError::InvalidState(format!(
                "swapchain {} has no image {index}",
                swapchain.id
            )));
        }
        let id = state.next_id();
        state.image_views.insert(id);
        Ok(HeadlessImageView(id))
    }

    fn destroy_image_view(&self, view: HeadlessImageView) {
        let mut state = self.state();
        state.check_idle("image view");
        let DeviceState {
            image_views,
            violations,
            ..
        } = &mut *state;
        DeviceState::remove_live(image_views, view.0, "image view", violations);
    }

    fn create_framebuffer(
        &self,
        render_pass: HeadlessRenderPass,
        view: HeadlessImageView,
        _extent: Extent2d,
    ) -> Result<HeadlessFramebuffer> {
        let mut state = self.state();
        state.fault(FaultPoint::Framebuffer)?;
        if !state.render_passes.contains(&render_pass.0) {
            return Err(unknown("render pass", render_pass.0));
        }
        if !state.image_views.contains(&view.0) {
            return Err(unknown("image view", view.0));
        }
        let id = state.next_id();
        state.framebuffers.insert(id);
        Ok(HeadlessFramebuffer(id))
    }

    fn destroy_framebuffer(&self, framebuffer: HeadlessFramebuffer) {
        let mut state = self.state();
        state.check_idle("framebuffer");
        let DeviceState {
            framebuffers,
            violations,
            ..
        } = &mut *state;
        DeviceState::remove_live(framebuffers, framebuffer.0, "framebuffer", violations);
    }

    fn destroy_swapchain(&self, swapchain: HeadlessSwapchain) {
        let mut state = self.state();
        state.check_idle("swapchain");
        if state.swapchains.remove(&swapchain.id).is_none() {
            state.violation(format!("destroyed unknown swapchain {}", swapchain.id));
        }
        state.events.push(DeviceEvent::SwapchainDestroyed(swapchain.id));
    }

    fn acquire_next_image(
        &self,
        swapchain: &HeadlessSwapchain,
        signal: HeadlessSemaphore,
        timeout: Option<Duration>,
    ) -> Result<AcquireOutcome> {
        let mut state = self.state();
        let scripted = state.acquire_script.pop_front();
        match scripted {
            Some(ScriptedAcquire::OutOfDate) => {
                state.events.push(DeviceEvent::AcquireOutOfDate);
                return Ok(AcquireOutcome::OutOfDate);
            }
            Some(ScriptedAcquire::Timeout) => {
                return Err(FrameError::AcquireTimeout(timeout.unwrap_or(Duration::ZERO)));
            }
            _ => {}
        }

        let record = state
            .swapchains
            .get_mut(&swapchain.id)
            .ok_or_else(|| unknown("swapchain", swapchain.id))?;
        let image_index = match scripted {
            Some(ScriptedAcquire::Image(index)) if index < record.image_count => index,
            _ => record.next_image,
        };
        let retired = record.retired;
        if !retired {
            record.next_image = (image_index + 1) % record.image_count.max(1);
        }
        if retired {
            state.events.push(DeviceEvent::AcquireOutOfDate);
            return Ok(AcquireOutcome::OutOfDate);
        }

        state.raise_semaphore(signal.0, "acquire");
        state.events.push(DeviceEvent::Acquired {
            swapchain: swapchain.id,
            image_index,
        });
        Ok(AcquireOutcome::Acquired {
            image_index,
            suboptimal: scripted == Some(ScriptedAcquire::Suboptimal),
        })
    }

    fn present(
        &self,
        swapchain: &HeadlessSwapchain,
        image_index: u32,
        wait: HeadlessSemaphore,
    ) -> Result<PresentOutcome> {
        let mut state = self.state();
        let retired = state
            .swapchains
            .get(&swapchain.id)
            .ok_or_else(|| unknown("swapchain", swapchain.id))?
            .retired;
        if image_index >= swapchain.image_count {
            return Err(FrameError::InvalidState(format!(
                "presented image {image_index} of a {}-image swapchain",
                swapchain.image_count
            )));
        }
        state.consume_semaphore(wait.0, "present");
        state.events.push(DeviceEvent::Presented {
            swapchain: swapchain.id,
            image_index,
        });
        if retired {
            return Ok(PresentOutcome::OutOfDate);
        }
        Ok(state.present_script.pop_front().unwrap_or(PresentOutcome::Presented))
    }
}

/// Fake window surface.
#[derive(Debug)]
pub struct HeadlessSurface {
    extent: Extent2d,
    resized: bool,
    restore_extent: Option<Extent2d>,
}

impl HeadlessSurface {
    pub const fn new(extent: Extent2d) -> Self {
        Self {
            extent,
            resized: false,
            restore_extent: None,
        }
    }

    /// Change the drawable size and raise the resize flag.
    pub fn resize(&mut self, extent: Extent2d) {
        self.extent = extent;
        self.resized = true;
    }

    /// Size the window is restored to while [`Surface::wait_for_non_zero_extent`]
    /// blocks on a minimized surface. Without one the wait gives up at once.
    pub fn set_restore_extent(&mut self, extent: Option<Extent2d>) {
        self.restore_extent = extent;
    }
}

impl Surface for HeadlessSurface {
    fn drawable_extent(&self) -> Extent2d {
        self.extent
    }

    fn was_resized(&self) -> bool {
        self.resized
    }

    fn reset_resize_flag(&mut self) {
        self.resized = false;
    }

    fn wait_for_non_zero_extent(&mut self) -> Extent2d {
        if self.extent.is_zero() {
            if let Some(restore) = self.restore_extent.take() {
                self.resize(restore);
            }
        }
        self.extent
    }
}

/// Mesh that records its binds and draws on the device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeadlessMesh {
    pub id: u32,
    pub index_count: u32,
}

impl HeadlessMesh {
    pub const fn new(id: u32, index_count: u32) -> Self {
        Self { id, index_count }
    }
}

impl DrawMesh<HeadlessDevice> for HeadlessMesh {
    fn bind(&self, backend: &HeadlessDevice, _cmd: HeadlessCommandBuffer) {
        backend.record(DeviceEvent::MeshBound(self.id));
    }

    fn draw(&self, backend: &HeadlessDevice, _cmd: HeadlessCommandBuffer) {
        backend.record(DeviceEvent::Draw {
            mesh: self.id,
            index_count: self.index_count,
        });
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeadlessMaterial {
    pub id: u32,
}

impl HeadlessMaterial {
    pub const fn new(id: u32) -> Self {
        Self { id }
    }
}

impl BindMaterial<HeadlessDevice> for HeadlessMaterial {
    fn bind(&self, backend: &HeadlessDevice, _cmd: HeadlessCommandBuffer, _pipeline: &HeadlessPipeline) {
        backend.record(DeviceEvent::MaterialBound(self.id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_fence_signals_from_another_thread() {
        let device = HeadlessDevice::new(HeadlessConfig::default());
        let fence = device.create_fence(false).unwrap();
        let signaller = device.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            signaller.signal_fence(fence);
        });
        assert_eq!(
            device.wait_for_fence(fence, Duration::from_secs(5)).unwrap(),
            FenceStatus::Signaled
        );
        handle.join().unwrap();
    }

    #[test]
    fn unsignaled_fence_times_out() {
        let device = HeadlessDevice::new(HeadlessConfig::default());
        let fence = device.create_fence(false).unwrap();
        assert_eq!(
            device.wait_for_fence(fence, Duration::from_millis(10)).unwrap(),
            FenceStatus::TimedOut
        );
    }

    #[test]
    fn faults_fire_once_after_skips() {
        let device = HeadlessDevice::new(HeadlessConfig::default());
        device.inject_fault(FaultPoint::RenderPass, 1);
        let first = device.create_render_pass(SurfaceFormat::BGRA8_SRGB);
        assert!(first.is_ok());
        assert!(device.create_render_pass(SurfaceFormat::BGRA8_SRGB).is_err());
        assert!(device.create_render_pass(SurfaceFormat::BGRA8_SRGB).is_ok());
    }

    #[test]
    fn double_destroy_is_a_violation() {
        let device = HeadlessDevice::new(HeadlessConfig::default());
        let semaphore = device.create_semaphore().unwrap();
        device.destroy_semaphore(semaphore);
        device.destroy_semaphore(semaphore);
        assert_eq!(device.violations().len(), 1);
    }

    #[test]
    fn image_count_config() {
        let config = HeadlessConfig::default().with_image_count(2);
        assert_eq!((config.min_image_count, config.max_image_count), (1, 2));
        let config = HeadlessConfig::default().with_image_count(1);
        assert_eq!((config.min_image_count, config.max_image_count), (1, 1));
    }

    #[test]
    fn surface_restores_from_minimized() {
        let mut surface = HeadlessSurface::new(Extent2d::new(100, 100));
        surface.resize(Extent2d::ZERO);
        assert!(surface.wait_for_non_zero_extent().is_zero());
        surface.set_restore_extent(Some(Extent2d::new(320, 240)));
        assert_eq!(surface.wait_for_non_zero_extent(), Extent2d::new(320, 240));
        assert!(surface.was_resized());
    }
}
