//! Fakes shared by unit tests.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::config::Sound;
use crate::error::{Error, Result};
use crate::playback::audio_output::{AudioSink, Renderer};
use crate::playback::cast::{CastChannel, CastMessage};
use crate::playback::focus::{AudioFocus, FocusRequest};
use crate::playback::local::LocalPlaybackStrategyFactory;
use crate::playback::strategy::{AudioAttributes, PlaybackStrategyFactory};
use crate::scheduler::{ManualClock, Scheduler, Task};

pub(crate) fn manual_scheduler() -> (Rc<ManualClock>, Scheduler) {
    let clock = Rc::new(ManualClock::new());
    let scheduler = Scheduler::new(clock.clone());
    (clock, scheduler)
}

/// Dispatches due tasks until none are left at the current time.
pub(crate) fn run_due(scheduler: &Scheduler, mut handle: impl FnMut(&Task)) {
    loop {
        let due = scheduler.take_due();
        if due.is_empty() {
            break;
        }
        for task in &due {
            handle(task);
        }
    }
}

fn sound(id: &str, looping: bool) -> Sound {
    Sound {
        id: id.to_string(),
        name: None,
        group: "test".to_string(),
        is_loopable: looping,
        tags: Vec::new(),
        src: vec![format!("{id}.ogg")],
    }
}

pub(crate) fn loop_sound(id: &str) -> Sound {
    sound(id, true)
}

pub(crate) fn burst_sound(id: &str) -> Sound {
    sound(id, false)
}

pub(crate) fn local_factory(
    sink: &RecordingSink,
    scheduler: &Scheduler,
) -> Rc<dyn PlaybackStrategyFactory> {
    Rc::new(LocalPlaybackStrategyFactory::new(
        Rc::new(sink.clone()),
        scheduler.clone(),
        PathBuf::from("sounds"),
    ))
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RenderEvent {
    Load(PathBuf, bool),
    Start(f32),
    Pause,
    Resume,
    Volume(f32),
    Release,
}

/// Audio sink that records what its renderers were asked to do.
///
/// Loops never end. Bursts keep playing until [`RecordingSink::end_bursts`].
#[derive(Clone, Default)]
pub(crate) struct RecordingSink {
    events: Rc<RefCell<Vec<RenderEvent>>>,
    epoch: Rc<Cell<u64>>,
    fail_loads: bool,
}

impl RecordingSink {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing_loads() -> Self {
        Self {
            fail_loads: true,
            ..Self::default()
        }
    }

    /// Marks every burst started so far as played to its end.
    pub(crate) fn end_bursts(&self) {
        self.epoch.set(self.epoch.get() + 1);
    }

    pub(crate) fn events(&self) -> Vec<RenderEvent> {
        self.events.borrow().clone()
    }

    pub(crate) fn count(&self, pred: impl Fn(&RenderEvent) -> bool) -> usize {
        self.events.borrow().iter().filter(|e| pred(e)).count()
    }
}

impl AudioSink for RecordingSink {
    fn create_renderer(&self) -> Box<dyn Renderer> {
        Box::new(RecordingRenderer {
            events: Rc::clone(&self.events),
            epoch: Rc::clone(&self.epoch),
            fail_loads: self.fail_loads,
            loaded: false,
            looping: false,
            started_at: None,
        })
    }
}

struct RecordingRenderer {
    events: Rc<RefCell<Vec<RenderEvent>>>,
    epoch: Rc<Cell<u64>>,
    fail_loads: bool,
    loaded: bool,
    looping: bool,
    started_at: Option<u64>,
}

impl RecordingRenderer {
    fn record(&self, event: RenderEvent) {
        self.events.borrow_mut().push(event);
    }
}

impl Renderer for RecordingRenderer {
    fn load(&mut self, source: &Path, looping: bool) -> Result<()> {
        if self.fail_loads {
            return Err(Error::Decode(source.display().to_string(), "unsupported".into()));
        }
        self.loaded = true;
        self.looping = looping;
        self.started_at = None;
        self.record(RenderEvent::Load(source.to_path_buf(), looping));
        Ok(())
    }

    fn start(&mut self, volume: f32) -> Result<()> {
        if !self.loaded {
            return Err(Error::NothingLoaded);
        }
        self.started_at = Some(self.epoch.get());
        self.record(RenderEvent::Start(volume));
        Ok(())
    }

    fn pause(&mut self) {
        self.record(RenderEvent::Pause);
    }

    fn resume(&mut self) {
        self.record(RenderEvent::Resume);
    }

    fn set_volume(&mut self, volume: f32) {
        self.record(RenderEvent::Volume(volume));
    }

    fn has_ended(&self) -> bool {
        match self.started_at {
            None => true,
            Some(epoch) => !self.looping && self.epoch.get() > epoch,
        }
    }

    fn release(&mut self) {
        self.loaded = false;
        self.started_at = None;
        self.record(RenderEvent::Release);
    }
}

#[derive(Default)]
struct FocusLog {
    responses: VecDeque<FocusRequest>,
    requests: Vec<AudioAttributes>,
    abandons: usize,
}

/// Audio focus that answers with queued responses, then `Granted`.
#[derive(Clone, Default)]
pub(crate) struct ScriptedFocus {
    log: Rc<RefCell<FocusLog>>,
}

impl ScriptedFocus {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(&self, response: FocusRequest) {
        self.log.borrow_mut().responses.push_back(response);
    }

    pub(crate) fn requests(&self) -> usize {
        self.log.borrow().requests.len()
    }

    pub(crate) fn abandons(&self) -> usize {
        self.log.borrow().abandons
    }
}

impl AudioFocus for ScriptedFocus {
    fn request(&mut self, attributes: &AudioAttributes) -> FocusRequest {
        let mut log = self.log.borrow_mut();
        log.requests.push(*attributes);
        log.responses.pop_front().unwrap_or(FocusRequest::Granted)
    }

    fn abandon(&mut self) {
        self.log.borrow_mut().abandons += 1;
    }
}

#[derive(Default)]
struct CastLog {
    connected: bool,
    fail_sends: bool,
    sent: Vec<(String, String)>,
}

/// Cast channel that keeps every delivered message.
#[derive(Clone, Default)]
pub(crate) struct FakeCastChannel {
    log: Rc<RefCell<CastLog>>,
}

impl FakeCastChannel {
    pub(crate) fn connected() -> Self {
        let channel = Self::default();
        channel.set_connected(true);
        channel
    }

    pub(crate) fn disconnected() -> Self {
        Self::default()
    }

    pub(crate) fn set_connected(&self, connected: bool) {
        self.log.borrow_mut().connected = connected;
    }

    pub(crate) fn fail_sends(&self) {
        self.log.borrow_mut().fail_sends = true;
    }

    pub(crate) fn raw_messages(&self) -> Vec<String> {
        self.log.borrow().sent.iter().map(|(_, m)| m.clone()).collect()
    }

    pub(crate) fn namespaces(&self) -> Vec<String> {
        self.log.borrow().sent.iter().map(|(ns, _)| ns.clone()).collect()
    }

    pub(crate) fn messages(&self) -> Vec<CastMessage> {
        self.raw_messages()
            .iter()
            .map(|m| serde_json::from_str(m).unwrap())
            .collect()
    }
}

impl CastChannel for FakeCastChannel {
    fn is_connected(&self) -> bool {
        self.log.borrow().connected
    }

    fn send_message(&self, namespace: &str, message: &str) -> Result<()> {
        let mut log = self.log.borrow_mut();
        if log.fail_sends {
            return Err(Error::CastSend("session closed".into()));
        }
        log.sent.push((namespace.to_string(), message.to_string()));
        Ok(())
    }
}
