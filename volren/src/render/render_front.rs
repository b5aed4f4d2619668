use std::{sync::Arc, thread::JoinHandle};

use crossbeam::channel::{Receiver, Sender};
use log::{debug, error, info};
use parking_lot::{Mutex, RwLock};

use crate::{
    camera::PerspectiveCamera,
    error::{Result, VolrenError},
};

use super::{FrameOutcome, Pipeline, ViewId};

/// Messages to renderer
///
/// Messages queue up and one is read after frame is done
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererMessage {
    /// Start rendering
    StartRendering,
    /// Start rendering a lower quality image, used while the camera moves
    StartRenderingFast,
    /// Shut down, thread will get ready to be joined
    ShutDown,
}

/// Interface for renderers running in different thread
///
/// Must be implemented by renderers that wish to communicate using
/// [`RendererFront`].
pub trait RenderThread {
    /// Get reference to shared RGB framebuffer
    fn get_shared_buffer(&self) -> Arc<Mutex<Vec<u8>>>;

    /// Get reference to camera
    ///
    /// If you obtain write lock, you can change camera position
    fn get_camera(&self) -> Arc<RwLock<PerspectiveCamera>>;

    /// Spawn thread with renderer
    ///
    /// Renderer waits for messages, does _not_ start rendering.
    fn start(self) -> JoinHandle<()>;

    /// Communication setter
    fn set_communication(&mut self, communication: (Sender<Result<()>>, Receiver<RendererMessage>));
}

/// Renders one view of a [`Pipeline`] on its own thread
pub struct PipelineRenderer {
    pipeline: Pipeline,
    view: ViewId,
    shared_buffer: Arc<Mutex<Vec<u8>>>,
    camera: Arc<RwLock<PerspectiveCamera>>,
    communication: (Sender<Result<()>>, Receiver<RendererMessage>),
}

impl PipelineRenderer {
    /// Fails if `view` is not part of `pipeline`
    pub fn new(pipeline: Pipeline, view: ViewId) -> Result<PipelineRenderer> {
        let descriptor = pipeline.compositor().view(view)?;
        let (width, height) = descriptor.settings.resolution;
        let shared_buffer = Arc::new(Mutex::new(vec![0; width * height * 3]));
        let camera = Arc::new(RwLock::new(descriptor.camera.clone()));

        // Dummy channels
        // Replaced once started
        let (sender_void, _) = crossbeam::channel::unbounded();
        let never = crossbeam::channel::never();

        Ok(PipelineRenderer {
            pipeline,
            view,
            shared_buffer,
            camera,
            communication: (sender_void, never),
        })
    }

    fn render_frame(&mut self, fast: bool) -> Result<()> {
        let camera = self.camera.read().clone();
        self.pipeline.set_camera(self.view, camera)?;

        if fast {
            self.pipeline.begin_interaction(self.view)?;
        }
        let outcome = self.pipeline.render(self.view);
        if fast {
            self.pipeline.end_interaction(self.view)?;
        }

        match outcome? {
            FrameOutcome::Composited(frame) => {
                let mut buffer = self.shared_buffer.lock();
                buffer.clear();
                buffer.extend_from_slice(frame.pixels());
            }
            FrameOutcome::Cancelled => debug!("Frame of {:?} cancelled", self.view),
        }
        self.pipeline.present(self.view)
    }

    fn run(mut self) {
        info!("Renderer of {:?} started", self.view);
        // Master loop
        loop {
            let msg = match self.communication.1.recv() {
                Ok(msg) => msg,
                Err(_) => break,
            };
            let fast = match msg {
                RendererMessage::StartRendering => false,
                RendererMessage::StartRenderingFast => true,
                RendererMessage::ShutDown => break,
            };

            let result = self.render_frame(fast);
            if let Err(e) = &result {
                error!("Rendering {:?} failed: {e}", self.view);
            }
            if self.communication.0.send(result).is_err() {
                break;
            }
        }
        info!("Renderer of {:?} shut down", self.view);
    }
}

impl RenderThread for PipelineRenderer {
    fn get_shared_buffer(&self) -> Arc<Mutex<Vec<u8>>> {
        self.shared_buffer.clone()
    }

    fn get_camera(&self) -> Arc<RwLock<PerspectiveCamera>> {
        self.camera.clone()
    }

    fn start(self) -> JoinHandle<()> {
        std::thread::spawn(move || self.run())
    }

    fn set_communication(&mut self, communication: (Sender<Result<()>>, Receiver<RendererMessage>)) {
        self.communication = communication;
    }
}

/// Communicating with renderer
///
/// Can be active or inactive.
pub struct RendererFront {
    handle: Option<JoinHandle<()>>,
    buffer: Option<Arc<Mutex<Vec<u8>>>>,
    camera: Option<Arc<RwLock<PerspectiveCamera>>>,
    communication_in: (Sender<RendererMessage>, Receiver<RendererMessage>),
    communication_out: (Sender<Result<()>>, Receiver<Result<()>>),
}

impl RendererFront {
    /// Create inactive front
    pub fn new() -> Self {
        let communication_in = crossbeam::channel::bounded(100); // main -> renderer
        let communication_out = crossbeam::channel::bounded(100); // renderer -> main
        Self {
            handle: None,
            buffer: None,
            camera: None,
            communication_in,
            communication_out,
        }
    }

    /// Getter for sender
    /// Returned struct can be used to send commands to renderer
    pub fn get_sender(&self) -> Sender<RendererMessage> {
        self.communication_in.0.clone()
    }

    /// Send message to renderer
    pub fn send_message(&self, msg: RendererMessage) -> Result<()> {
        self.communication_in
            .0
            .send(msg)
            .map_err(|_| VolrenError::Disconnected)
    }

    /// Getter for message receiver
    ///
    /// One message per rendered frame, the shared buffer holds the frame
    /// if the message is `Ok`.
    pub fn get_receiver(&self) -> Receiver<Result<()>> {
        self.communication_out.1.clone()
    }

    /// Wait for the renderer to finish a frame
    pub fn receive_message(&self) -> Result<()> {
        self.communication_out
            .1
            .recv()
            .map_err(|_| VolrenError::Disconnected)?
    }

    /// Getter for shared framebuffer
    /// If front is inactive, return `None`
    pub fn get_buffer_handle(&self) -> Option<Arc<Mutex<Vec<u8>>>> {
        self.buffer.as_ref().cloned()
    }

    /// Getter for camera handle
    /// If front is inactive, return `None`
    pub fn get_camera_handle(&self) -> Option<Arc<RwLock<PerspectiveCamera>>> {
        self.camera.as_ref().cloned()
    }

    pub fn is_active(&self) -> bool {
        self.handle.is_some()
    }

    /// Start `renderer`
    ///
    /// Front goes into active state.
    /// If front was already active, previous renderer gets shutdown first.
    pub fn start_rendering<R: RenderThread>(&mut self, mut renderer: R) {
        if self.is_active() {
            info!("Shutting down current renderer");
            self.finish();
        }

        let communication = (
            self.communication_out.0.clone(),
            self.communication_in.1.clone(),
        );
        renderer.set_communication(communication);
        self.buffer = Some(renderer.get_shared_buffer());
        self.camera = Some(renderer.get_camera());
        self.handle = Some(renderer.start()); // waits for StartRendering
    }

    /// Shut the renderer down and join its thread
    ///
    /// Front goes into inactive state.
    pub fn finish(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.communication_in.0.send(RendererMessage::ShutDown);
            if handle.join().is_err() {
                error!("Renderer thread panicked");
            }
            // Drop results of the old renderer
            while self.communication_out.1.try_recv().is_ok() {}
        }
        self.buffer = None;
        self.camera = None;
    }
}

impl Default for RendererFront {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RendererFront {
    fn drop(&mut self) {
        self.finish();
    }
}
