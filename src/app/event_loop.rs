use futures_util::FutureExt;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::error;

use crate::error::MutationError;
use crate::model::TableId;

use super::App;

impl App {
    /// Pick up the next confirmation request, and drop one the gate has
    /// already given up on.
    pub fn poll_prompts(&mut self) -> bool {
        if self.pending_prompt.as_ref().is_some_and(|p| p.is_expired()) {
            self.pending_prompt = None;
            return true;
        }
        if self.pending_prompt.is_some() {
            return false;
        }
        match self.prompts.try_recv() {
            Ok(prompt) => {
                self.pending_prompt = Some(prompt);
                true
            }
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => false,
        }
    }

    /// Apply the result of a form save once its task has finished.
    pub fn poll_save(&mut self) -> bool {
        let Some((kind, handle)) = self.pending_save.as_mut() else { return false };
        let kind = *kind;
        let Some(joined) = handle.now_or_never() else { return false };
        self.pending_save = None;

        let result = joined.unwrap_or_else(|err| {
            error!(error = %err, "form save task failed");
            Err(MutationError::Backend(format!("save task failed: {err}")))
        });
        // A rejected save stays on the form as its error.
        let _ = self.monitor.forms_mut().finish_submit(kind, result);
        true
    }

    /// Detect new snapshots or status messages since the last render.
    pub fn poll_view(&mut self) -> bool {
        let version = self.monitor.view().version();
        let status = self.monitor.status().current();
        if version == self.rendered_version && status == self.rendered_status {
            return false;
        }

        for table in TableId::ALL {
            let rows = self.monitor.view().table(table).body().entity_count();
            self.selection.clamp(table, rows);
        }
        self.rendered_version = version;
        self.rendered_status = status;
        true
    }
}
