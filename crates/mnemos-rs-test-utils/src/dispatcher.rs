use async_trait::async_trait;
use mnemos_rs_memory::{BackendError, PublishRequest, ScheduleRequest, TaskDispatcher};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicBool, Ordering};

/// One call received by [`RecordingDispatcher`].
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchCall {
    Published(PublishRequest),
    Scheduled(ScheduleRequest),
    Cancelled(String),
}

#[derive(Default)]
struct DispatchState {
    calls: Vec<DispatchCall>,
    schedules: Vec<(String, ScheduleRequest)>,
    next_id: usize,
}

/// Dispatcher that records calls and hands out sequential ids.
#[derive(Default)]
pub struct RecordingDispatcher {
    state: Mutex<DispatchState>,
    fail: AtomicBool,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<DispatchCall> {
        self.state.lock().calls.clone()
    }

    fn check(&self) -> Result<(), BackendError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(BackendError::Status {
                status: 500,
                body: "dispatcher unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl TaskDispatcher for RecordingDispatcher {
    async fn publish(&self, request: PublishRequest) -> Result<String, BackendError> {
        self.check()?;
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = format!("msg-{}", state.next_id);
        state.calls.push(DispatchCall::Published(request));
        Ok(id)
    }

    async fn schedule(&self, request: ScheduleRequest) -> Result<String, BackendError> {
        self.check()?;
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = format!("sched-{}", state.next_id);
        state.schedules.push((id.clone(), request.clone()));
        state.calls.push(DispatchCall::Scheduled(request));
        Ok(id)
    }

    async fn cancel(&self, schedule_id: &str) -> Result<(), BackendError> {
        self.check()?;
        let mut state = self.state.lock();
        state.schedules.retain(|(id, _)| id != schedule_id);
        state.calls.push(DispatchCall::Cancelled(schedule_id.to_string()));
        Ok(())
    }

    async fn list_schedules(&self) -> Result<Vec<Value>, BackendError> {
        self.check()?;
        Ok(self
            .state
            .lock()
            .schedules
            .iter()
            .map(|(id, request)| {
                json!({
                    "scheduleId": id,
                    "destination": request.destination,
                    "cron": request.cron,
                })
            })
            .collect())
    }
}
