//! Create/edit dialogs for users and container definitions.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::MutationError;
use crate::model::TableId;
use crate::scheduler::RefreshHandle;
use crate::source::{MutationBackend, Payload};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormKind {
    User,
    Container,
}

impl FormKind {
    fn noun(&self) -> &'static str {
        match self {
            FormKind::User => "User",
            FormKind::Container => "Container",
        }
    }

    /// Table whose contents change when this form is saved.
    fn refreshes(&self) -> TableId {
        match self {
            FormKind::User => TableId::Clients,
            FormKind::Container => TableId::Containers,
        }
    }

    fn fields(&self) -> Vec<FormField> {
        match self {
            FormKind::User => vec![
                FormField::text("uuid", "UUID").read_only(),
                FormField::text("username", "Username"),
            ],
            FormKind::Container => vec![
                FormField::text("name", "Name"),
                FormField::text("image", "Image"),
                FormField::checkbox("shared", "Shared"),
            ],
        }
    }

    /// Key pre-filled when editing an existing record.
    fn identity_key(&self) -> &'static str {
        match self {
            FormKind::User => "uuid",
            FormKind::Container => "name",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Checkbox(bool),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormField {
    pub key: &'static str,
    pub label: &'static str,
    pub value: FieldValue,
    pub read_only: bool,
}

impl FormField {
    fn text(key: &'static str, label: &'static str) -> Self {
        Self { key, label, value: FieldValue::Text(String::new()), read_only: false }
    }

    fn checkbox(key: &'static str, label: &'static str) -> Self {
        Self { key, label, value: FieldValue::Checkbox(false), read_only: false }
    }

    fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }
}

#[derive(Clone, Debug)]
pub struct FormState {
    pub kind: FormKind,
    pub title: String,
    pub fields: Vec<FormField>,
    pub focus: usize,
    pub error: Option<String>,
    /// A save is in flight; further submits are ignored until it settles.
    pub saving: bool,
}

impl FormState {
    fn new(kind: FormKind, title: String) -> Self {
        Self { kind, title, fields: kind.fields(), focus: 0, error: None, saving: false }
    }

    fn focused_mut(&mut self) -> Option<&mut FormField> {
        self.fields.get_mut(self.focus).filter(|f| !f.read_only)
    }

    /// Form contents as a payload. Checkboxes become booleans.
    pub fn payload(&self) -> Payload {
        self.fields
            .iter()
            .map(|f| {
                let value = match &f.value {
                    FieldValue::Text(s) => Value::String(s.trim().to_string()),
                    FieldValue::Checkbox(b) => Value::Bool(*b),
                };
                (f.key.to_string(), value)
            })
            .collect()
    }
}

/// Opens, edits and submits one modal form at a time.
pub struct ModalFormController {
    backend: Arc<dyn MutationBackend>,
    refresh: RefreshHandle,
    form: Option<FormState>,
}

impl ModalFormController {
    pub fn new(backend: Arc<dyn MutationBackend>, refresh: RefreshHandle) -> Self {
        Self { backend, refresh, form: None }
    }

    pub fn form(&self) -> Option<&FormState> {
        self.form.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.form.is_some()
    }

    /// Open an empty form for a new record.
    pub fn open_add(&mut self, kind: FormKind) {
        self.form = Some(FormState::new(kind, format!("Add {}", kind.noun())));
    }

    /// Open the form for an existing record. Only the identity is pre-filled;
    /// the other fields start empty.
    pub fn open_edit(&mut self, kind: FormKind, identity: &str) {
        let mut form = FormState::new(kind, format!("Edit {}", kind.noun()));
        if let Some(field) = form.fields.iter_mut().find(|f| f.key == kind.identity_key()) {
            field.value = FieldValue::Text(identity.to_string());
        }
        form.focus = form.fields.iter().position(|f| !f.read_only).unwrap_or(0);
        self.form = Some(form);
    }

    pub fn close(&mut self) {
        self.form = None;
    }

    pub fn focus_next(&mut self) {
        if let Some(form) = self.form.as_mut() {
            form.focus = (form.focus + 1) % form.fields.len();
        }
    }

    pub fn focus_prev(&mut self) {
        if let Some(form) = self.form.as_mut() {
            form.focus = (form.focus + form.fields.len() - 1) % form.fields.len();
        }
    }

    pub fn input_char(&mut self, c: char) {
        let Some(field) = self.form.as_mut().and_then(FormState::focused_mut) else { return };
        match &mut field.value {
            FieldValue::Text(s) => s.push(c),
            FieldValue::Checkbox(b) if c == ' ' => *b = !*b,
            FieldValue::Checkbox(_) => {}
        }
    }

    pub fn backspace(&mut self) {
        let Some(field) = self.form.as_mut().and_then(FormState::focused_mut) else { return };
        if let FieldValue::Text(s) = &mut field.value {
            s.pop();
        }
    }

    /// Save the open form. On success the form closes and the related table
    /// is refreshed; on failure it stays open showing the error.
    pub async fn submit(&mut self) -> Result<(), MutationError> {
        let Some((kind, save)) = self.begin_submit() else { return Ok(()) };
        let result = save.await;
        self.finish_submit(kind, result)
    }

    /// Mark the open form as saving and return the backend call, detached
    /// from the controller so it can run on another task. `None` when no form
    /// is open or a save is already in flight.
    pub fn begin_submit(&mut self) -> Option<(FormKind, BoxFuture<'static, Result<(), MutationError>>)> {
        let form = self.form.as_mut().filter(|f| !f.saving)?;
        form.saving = true;
        form.error = None;
        let kind = form.kind;
        let payload = form.payload();
        let backend = Arc::clone(&self.backend);

        let save: BoxFuture<'static, Result<(), MutationError>> = Box::pin(async move {
            match kind {
                FormKind::User => backend.create_or_update_user(payload).await,
                FormKind::Container => backend.create_or_update_container(payload).await,
            }
        });
        Some((kind, save))
    }

    /// Apply the result of a save started with [`Self::begin_submit`]. The
    /// table is refreshed even if the form was closed in the meantime.
    pub fn finish_submit(&mut self, kind: FormKind, result: Result<(), MutationError>) -> Result<(), MutationError> {
        let saving = self.form.as_mut().filter(|f| f.kind == kind && f.saving);
        match result {
            Ok(()) => {
                info!(form = kind.noun(), "form submitted");
                if saving.is_some() {
                    self.form = None;
                }
                self.refresh.request(kind.refreshes());
                Ok(())
            }
            Err(err) => {
                warn!(form = kind.noun(), error = %err, "form submit rejected");
                if let Some(form) = saving {
                    form.saving = false;
                    form.error = Some(err.to_string());
                }
                Err(err)
            }
        }
    }
}
