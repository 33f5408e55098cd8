use tracing::{info, warn};
use vidaudit_contracts::analysis::{AnalysisRequest, AnalysisResult};
use vidaudit_contracts::attachment::{Attachment, AttachmentId};
use vidaudit_contracts::checklist::{checklist_from_todos, ChecklistItem};
use vidaudit_contracts::errors::{AnalysisError, StateError};
use vidaudit_contracts::events::{EventLog, SessionEvent};
use vidaudit_contracts::view::ViewState;

use crate::attachments::AttachmentStore;
use crate::builder::RequestBuilder;
use crate::transport::AnalysisTransport;
use crate::validator::ResponseValidator;

/// Presentation-side collaborator, called after every state change.
pub trait ViewRenderer {
    fn render(&mut self, session: &AnalysisSession);
}

/// The whole mutable UI state. Only `AnalysisStateMachine` moves `view`,
/// `result` and `checklist`; input fields are free to edit at any time.
#[derive(Debug, Clone, Default)]
pub struct AnalysisSession {
    view: ViewState,
    video_reference: Option<String>,
    attachments: AttachmentStore,
    result: Option<AnalysisResult>,
    checklist: Vec<ChecklistItem>,
    error: Option<String>,
}

impl AnalysisSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> ViewState {
        self.view
    }

    pub fn video_reference(&self) -> Option<&str> {
        self.video_reference.as_deref()
    }

    pub fn set_video_reference(&mut self, reference: Option<String>) {
        self.video_reference = reference;
    }

    pub fn attachments(&self) -> &AttachmentStore {
        &self.attachments
    }

    pub fn add_attachment(
        &mut self,
        data: Vec<u8>,
        mime_type: &str,
        file_name: Option<&str>,
    ) -> Option<Attachment> {
        self.attachments.add_named(data, mime_type, file_name)
    }

    pub fn add_attachment_path(&mut self, path: &std::path::Path) -> Option<Attachment> {
        self.attachments.add_path(path)
    }

    pub fn remove_attachment(&mut self, id: AttachmentId) -> bool {
        self.attachments.remove(id)
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    pub fn checklist(&self) -> &[ChecklistItem] {
        &self.checklist
    }

    pub fn completed_count(&self) -> usize {
        self.checklist.iter().filter(|item| item.checked).count()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

pub struct AnalysisStateMachine<T> {
    builder: RequestBuilder,
    transport: T,
    validator: ResponseValidator,
    events: Option<EventLog>,
    renderer: Option<Box<dyn ViewRenderer>>,
}

impl<T: AnalysisTransport> AnalysisStateMachine<T> {
    pub fn new(transport: T) -> Self {
        Self {
            builder: RequestBuilder::new(),
            transport,
            validator: ResponseValidator::new(),
            events: None,
            renderer: None,
        }
    }

    pub fn with_events(mut self, events: EventLog) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_renderer(mut self, renderer: Box<dyn ViewRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Runs the whole pipeline. Whatever happens, the session ends up in
    /// either `Results` or back in `Input` with an error message.
    pub fn submit(&mut self, session: &mut AnalysisSession) -> Result<(), StateError> {
        require(session.view == ViewState::Input, "submit", session)?;

        let request = match self
            .builder
            .build(session.video_reference(), &session.attachments.list())
        {
            Ok(request) => request,
            Err(err) => {
                info!(error = %err, "analysis input rejected");
                session.error = Some(err.to_string());
                self.render(session);
                return Ok(());
            }
        };

        session.error = None;
        session.view = ViewState::Analyzing;
        self.emit(SessionEvent::AnalysisStarted {
            video_reference: request.video_reference().map(str::to_string),
            attachments: request.attachments().len(),
        });
        self.render(session);

        match self.run_pipeline(&request) {
            Ok(result) => {
                info!(
                    score = result.score,
                    categories = result.categories.len(),
                    todos = result.todo_list.len(),
                    "analysis completed"
                );
                let consumed = request
                    .attachments()
                    .iter()
                    .map(|attachment| attachment.id)
                    .collect::<Vec<AttachmentId>>();
                session.attachments.release(&consumed);
                session.checklist = checklist_from_todos(&result.todo_list);
                self.emit(SessionEvent::AnalysisCompleted {
                    score: result.score,
                    categories: result.categories.len(),
                    todos: result.todo_list.len(),
                });
                session.result = Some(result);
                session.view = ViewState::Results { export_mode: false };
            }
            Err(err) => {
                warn!(kind = err.kind(), error = %err, "analysis failed");
                self.emit(SessionEvent::AnalysisFailed {
                    kind: err.kind().to_string(),
                    message: err.to_string(),
                });
                session.result = None;
                session.checklist.clear();
                session.error = Some(failure_message(&err));
                session.view = ViewState::Input;
            }
        }
        self.render(session);
        Ok(())
    }

    pub fn toggle_export(
        &mut self,
        session: &mut AnalysisSession,
        export_mode: bool,
    ) -> Result<(), StateError> {
        require(session.view.is_results(), "toggle export", session)?;
        session.view = ViewState::Results { export_mode };
        self.emit(SessionEvent::ExportToggled { export_mode });
        self.render(session);
        Ok(())
    }

    /// Flips one item. Returns `false` when no item has that id.
    pub fn toggle_checklist_item(
        &mut self,
        session: &mut AnalysisSession,
        id: usize,
    ) -> Result<bool, StateError> {
        require(session.view.is_results(), "toggle a checklist item", session)?;
        let Some(item) = session.checklist.iter_mut().find(|item| item.id == id) else {
            return Ok(false);
        };
        item.checked = !item.checked;
        let checked = item.checked;
        self.emit(SessionEvent::ChecklistToggled { id, checked });
        self.render(session);
        Ok(true)
    }

    pub fn restart(&mut self, session: &mut AnalysisSession) -> Result<(), StateError> {
        require(session.view.is_results(), "restart", session)?;
        session.result = None;
        session.checklist.clear();
        session.error = None;
        session.attachments.clear();
        session.view = ViewState::Input;
        self.emit(SessionEvent::SessionRestarted);
        self.render(session);
        Ok(())
    }

    fn run_pipeline(&self, request: &AnalysisRequest) -> Result<AnalysisResult, AnalysisError> {
        let raw = self.transport.send(request)?;
        self.validator.validate(&raw)
    }

    fn render(&mut self, session: &AnalysisSession) {
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.render(session);
        }
    }

    fn emit(&self, event: SessionEvent) {
        let Some(events) = &self.events else {
            return;
        };
        if let Err(err) = events.record(event) {
            warn!(error = %err, "failed to record session event");
        }
    }
}

pub fn failure_message(err: &AnalysisError) -> String {
    let detail = err.to_string();
    format!(
        "Analysis failed: {}. Try sending fewer screenshots.",
        detail.trim_end_matches('.')
    )
}

fn require(
    allowed: bool,
    operation: &'static str,
    session: &AnalysisSession,
) -> Result<(), StateError> {
    if allowed {
        return Ok(());
    }
    Err(StateError::InvalidTransition {
        operation,
        state: session.view.name(),
    })
}
