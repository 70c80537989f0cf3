use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use super::{AutosaveMachine, Refusal, SaveDecision, SaveOutcome, SaveRequest, SaveState};
use crate::client::NotesApi;
use crate::entity::{Note, NoteInput};
use crate::error::{NoteboxError, Result};

/// Something the autosave task reports back to its owner.
#[derive(Debug)]
pub enum AutosaveEvent {
    /// The server accepted the draft; carries its copy of the note
    Saved(Note),
    /// The server answered for a different note; nothing was applied
    Stale(Note),
    /// The save failed; the draft stays dirty until the next edit
    Failed(NoteboxError),
    /// A save was asked for but not attempted
    Refused(Refusal),
    /// A save was asked for while another was running
    Deferred,
}

enum Command {
    Edit(NoteInput),
    SaveNow,
}

type InFlight = Option<(SaveRequest, JoinHandle<Result<Note>>)>;

/// Owner side of a running autosave task.
///
/// The task stops when the handle is dropped or [`shutdown`](Self::shutdown)
/// is called. A pending debounced edit is discarded at that point.
pub struct AutosaveHandle {
    commands: mpsc::UnboundedSender<Command>,
    events: mpsc::UnboundedReceiver<AutosaveEvent>,
    state: watch::Receiver<SaveState>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl AutosaveHandle {
    /// Start autosaving `note`. Must be called from within a tokio runtime.
    pub fn spawn(api: Arc<dyn NotesApi>, note: &Note, debounce: Duration) -> Self {
        let machine = AutosaveMachine::new(note, debounce);
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(machine.state());
        let cancel = CancellationToken::new();

        let task = tokio::spawn(run(
            api,
            machine,
            command_rx,
            event_tx,
            state_tx,
            cancel.clone(),
        ));

        Self {
            commands: command_tx,
            events: event_rx,
            state: state_rx,
            cancel,
            task: Some(task),
        }
    }

    /// Replace the draft and restart the debounce timer.
    pub fn edit(&self, draft: NoteInput) -> Result<()> {
        self.send(Command::Edit(draft))
    }

    /// Save the current draft now, bypassing the timer.
    pub fn save_now(&self) -> Result<()> {
        self.send(Command::SaveNow)
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| NoteboxError::Internal("autosave task has stopped".to_string()))
    }

    pub fn state(&self) -> SaveState {
        *self.state.borrow()
    }

    /// Wait for the next event. `None` once the task has stopped.
    pub async fn next_event(&mut self) -> Option<AutosaveEvent> {
        self.events.recv().await
    }

    /// Stop the task and wait for it to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "autosave task ended abnormally");
            }
        }
    }
}

impl Drop for AutosaveHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run(
    api: Arc<dyn NotesApi>,
    mut machine: AutosaveMachine,
    mut commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<AutosaveEvent>,
    state: watch::Sender<SaveState>,
    cancel: CancellationToken,
) {
    let mut in_flight: InFlight = None;

    loop {
        let deadline = machine.deadline();

        let event = tokio::select! {
            _ = cancel.cancelled() => break,
            command = commands.recv() => match command {
                Some(Command::Edit(draft)) => {
                    machine.edit(draft, Instant::now());
                    None
                }
                Some(Command::SaveNow) => {
                    let decision = machine.request_save();
                    dispatch(&api, decision, &mut in_flight)
                }
                None => break,
            },
            _ = sleep_until(deadline) => {
                match machine.on_timer(Instant::now()) {
                    Some(decision) => dispatch(&api, decision, &mut in_flight),
                    None => None,
                }
            }
            result = join_save(&mut in_flight) => {
                match in_flight.take() {
                    Some((request, _)) => {
                        Some(outcome_event(machine.complete(&request, result, Instant::now())))
                    }
                    None => None,
                }
            }
        };

        state.send_replace(machine.state());
        if let Some(event) = event {
            // owner may have stopped listening
            let _ = events.send(event);
        }
    }

    // an in-flight save is left to finish on its own; its result is dropped
    drop(in_flight);
    tracing::debug!(note_id = %machine.note_id(), "autosave stopped");
}

fn dispatch(
    api: &Arc<dyn NotesApi>,
    decision: SaveDecision,
    in_flight: &mut InFlight,
) -> Option<AutosaveEvent> {
    match decision {
        SaveDecision::Start(request) => {
            tracing::debug!(note_id = %request.note_id, revision = request.revision, "autosaving");
            let api = Arc::clone(api);
            let id = request.note_id;
            let draft = request.draft.clone();
            let task = tokio::spawn(async move { api.update(id, draft).await });
            *in_flight = Some((request, task));
            None
        }
        SaveDecision::Deferred => Some(AutosaveEvent::Deferred),
        SaveDecision::Refused(refusal) => Some(AutosaveEvent::Refused(refusal)),
    }
}

fn outcome_event(outcome: SaveOutcome) -> AutosaveEvent {
    match outcome {
        SaveOutcome::Saved(note) => AutosaveEvent::Saved(note),
        SaveOutcome::Stale(note) => {
            tracing::debug!(note_id = %note.id, "discarding stale save response");
            AutosaveEvent::Stale(note)
        }
        SaveOutcome::Failed(e) => {
            tracing::warn!(error = %e, "autosave failed");
            AutosaveEvent::Failed(e)
        }
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn join_save(in_flight: &mut InFlight) -> Result<Note> {
    match in_flight {
        Some((_, task)) => match task.await {
            Ok(result) => result,
            Err(e) => Err(NoteboxError::Internal(format!("save task failed: {}", e))),
        },
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::autosave::DEFAULT_DEBOUNCE;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use uuid::Uuid;

    /// Records every update and answers after `delay`.
    struct RecordingApi {
        note: Note,
        delay: Duration,
        fail: bool,
        updates: Mutex<Vec<NoteInput>>,
    }

    impl RecordingApi {
        fn new(note: &Note) -> Self {
            Self {
                note: note.clone(),
                delay: Duration::ZERO,
                fail: false,
                updates: Mutex::new(Vec::new()),
            }
        }

        fn updates(&self) -> Vec<NoteInput> {
            self.updates.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl NotesApi for RecordingApi {
        async fn list(&self) -> Result<Vec<Note>> {
            Ok(vec![self.note.clone()])
        }
        async fn get(&self, _id: Uuid) -> Result<Note> {
            Ok(self.note.clone())
        }
        async fn create(&self, _input: NoteInput) -> Result<Note> {
            unreachable!("autosave never creates")
        }
        async fn update(&self, id: Uuid, input: NoteInput) -> Result<Note> {
            self.updates.lock().unwrap().push(input.clone());
            time::sleep(self.delay).await;
            if self.fail {
                return Err(NoteboxError::Internal("server error".into()));
            }
            let input = input.validate()?;
            let mut note = self.note.clone();
            note.id = id;
            note.title = input.title;
            note.content = input.content;
            note.group = input.group;
            Ok(note)
        }
        async fn delete(&self, _id: Uuid) -> Result<()> {
            unreachable!("autosave never deletes")
        }
    }

    fn note() -> Note {
        Note::new(NoteInput::new("Title", "Body"))
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_saves_once_after_quiet_period() {
        let note = note();
        let api = Arc::new(RecordingApi::new(&note));
        let mut handle = AutosaveHandle::spawn(api.clone(), &note, DEFAULT_DEBOUNCE);
        let started = Instant::now();

        handle.edit(NoteInput::new("Tit", "Body")).unwrap();
        time::sleep(Duration::from_millis(600)).await;
        handle.edit(NoteInput::new("Title 2", "Body")).unwrap();

        match handle.next_event().await {
            Some(AutosaveEvent::Saved(saved)) => assert_eq!(saved.title, "Title 2"),
            other => panic!("expected save, got {:?}", other),
        }
        assert!(started.elapsed() >= Duration::from_millis(1800));
        assert_eq!(api.updates().len(), 1);
        assert_eq!(handle.state(), SaveState::Clean);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_save_refusals() {
        let note = note();
        let api = Arc::new(RecordingApi::new(&note));
        let mut handle = AutosaveHandle::spawn(api.clone(), &note, DEFAULT_DEBOUNCE);

        handle.save_now().unwrap();
        assert!(matches!(
            handle.next_event().await,
            Some(AutosaveEvent::Refused(Refusal::Clean))
        ));

        handle.edit(NoteInput::new("", "Body")).unwrap();
        handle.save_now().unwrap();
        assert!(matches!(
            handle.next_event().await,
            Some(AutosaveEvent::Refused(Refusal::MissingFields))
        ));

        // the timer refuses the same draft without calling the server
        assert!(matches!(
            handle.next_event().await,
            Some(AutosaveEvent::Refused(Refusal::MissingFields))
        ));
        assert!(api.updates().is_empty());
        assert_eq!(handle.state(), SaveState::Dirty);
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_while_saving_is_deferred() {
        let note = note();
        let mut api = RecordingApi::new(&note);
        api.delay = Duration::from_millis(500);
        let api = Arc::new(api);
        let mut handle = AutosaveHandle::spawn(api.clone(), &note, DEFAULT_DEBOUNCE);

        handle.edit(NoteInput::new("First", "Body")).unwrap();
        handle.save_now().unwrap();
        handle.edit(NoteInput::new("Second", "Body")).unwrap();
        handle.save_now().unwrap();

        assert!(matches!(
            handle.next_event().await,
            Some(AutosaveEvent::Deferred)
        ));
        match handle.next_event().await {
            Some(AutosaveEvent::Saved(saved)) => assert_eq!(saved.title, "First"),
            other => panic!("expected first save, got {:?}", other),
        }
        match handle.next_event().await {
            Some(AutosaveEvent::Saved(saved)) => assert_eq!(saved.title, "Second"),
            other => panic!("expected deferred save, got {:?}", other),
        }

        let titles: Vec<String> = api.updates().into_iter().map(|u| u.title).collect();
        assert_eq!(titles, vec!["First", "Second"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_keeps_draft_dirty() {
        let note = note();
        let mut api = RecordingApi::new(&note);
        api.fail = true;
        let api = Arc::new(api);
        let mut handle = AutosaveHandle::spawn(api.clone(), &note, DEFAULT_DEBOUNCE);

        handle.edit(NoteInput::new("Changed", "Body")).unwrap();
        assert!(matches!(
            handle.next_event().await,
            Some(AutosaveEvent::Failed(NoteboxError::Internal(_)))
        ));
        assert_eq!(handle.state(), SaveState::Dirty);

        // no automatic retry
        time::sleep(DEFAULT_DEBOUNCE * 3).await;
        assert_eq!(api.updates().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_discards_pending_edit() {
        let note = note();
        let api = Arc::new(RecordingApi::new(&note));
        let handle = AutosaveHandle::spawn(api.clone(), &note, DEFAULT_DEBOUNCE);

        handle.edit(NoteInput::new("Unsaved", "Body")).unwrap();
        handle.shutdown().await;

        time::sleep(DEFAULT_DEBOUNCE * 2).await;
        assert!(api.updates().is_empty());
    }
}
