use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::forms::FormKind;
use crate::model::{ActionKind, TableId};

use super::App;

/// Result of handling a key: Quit the app, or key was consumed (needs render).
/// None means the key was not handled.
pub enum InputResult {
    Quit,
    Consumed,
}

/// Handle a key event. Returns Some(Quit) to exit, Some(Consumed) if key was handled and
/// a render is needed, None if the key was not handled.
pub fn handle_key(app: &mut App, key_event: KeyEvent) -> Option<InputResult> {
    let KeyEvent { code, modifiers, .. } = key_event;

    if code == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL) {
        return Some(InputResult::Quit);
    }

    if let Some(prompt) = app.pending_prompt.take() {
        prompt.answer(matches!(code, KeyCode::Char('y') | KeyCode::Char('Y')));
        return Some(InputResult::Consumed);
    }

    if app.monitor.forms().is_open() {
        handle_form(app, code);
        return Some(InputResult::Consumed);
    }

    handle_tables(app, code)
}

fn handle_form(app: &mut App, code: KeyCode) {
    let forms = app.monitor.forms_mut();
    match code {
        KeyCode::Esc => forms.close(),
        KeyCode::Tab | KeyCode::Down => forms.focus_next(),
        KeyCode::BackTab | KeyCode::Up => forms.focus_prev(),
        KeyCode::Backspace => forms.backspace(),
        KeyCode::Enter => {
            // Settled by poll_save; the UI keeps drawing meanwhile.
            if let Some((kind, save)) = forms.begin_submit() {
                app.pending_save = Some((kind, app.rt.spawn(save)));
            }
        }
        KeyCode::Char(c) => forms.input_char(c),
        _ => {}
    }
}

fn handle_tables(app: &mut App, code: KeyCode) -> Option<InputResult> {
    let focus = app.selection.focus;
    match code {
        KeyCode::Char('q') | KeyCode::Esc => Some(InputResult::Quit),
        KeyCode::Tab | KeyCode::BackTab => {
            app.selection.toggle_focus();
            Some(InputResult::Consumed)
        }
        KeyCode::Up => app.selection.up().then_some(InputResult::Consumed),
        KeyCode::Down => {
            let rows = app.monitor.view().table(focus).body().entity_count();
            app.selection.down(rows).then_some(InputResult::Consumed)
        }
        KeyCode::Char('s') => activate(app, ActionKind::Stop),
        KeyCode::Char('d') => activate(app, ActionKind::Delete),
        KeyCode::Char('r') => activate(app, ActionKind::ResetToken),
        KeyCode::Char('u') => {
            app.monitor.forms_mut().open_add(FormKind::User);
            Some(InputResult::Consumed)
        }
        KeyCode::Char('c') => {
            app.monitor.forms_mut().open_add(FormKind::Container);
            Some(InputResult::Consumed)
        }
        KeyCode::Char('e') => {
            let name = selected_name(app)?;
            let kind = match focus {
                TableId::Clients => FormKind::User,
                TableId::Containers => FormKind::Container,
            };
            app.monitor.forms_mut().open_edit(kind, &name);
            Some(InputResult::Consumed)
        }
        KeyCode::F(5) => {
            app.monitor.refresh_handle().request(focus);
            None
        }
        _ => None,
    }
}

/// Name of the selected record: a user's uuid or a container definition's
/// name, which is what the edit forms are keyed by.
fn selected_name(app: &App) -> Option<String> {
    let focus = app.selection.focus;
    let table = app.monitor.view().table(focus);
    table.body().entity(app.selection.index(focus)).map(|row| row.content.name.clone())
}

/// Fire `action` on the selected row. The confirmation prompt arrives through
/// the gate, so nothing needs rendering yet.
fn activate(app: &App, action: ActionKind) -> Option<InputResult> {
    let focus = app.selection.focus;
    let table = app.monitor.view().table(focus);
    let row = table.body().entity(app.selection.index(focus))?;
    if row.activate(action) {
        None
    } else {
        app.monitor.status().error(format!("{} is not available for {}", action.label(), focus));
        Some(InputResult::Consumed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use serde_json::json;

    use super::*;
    use crate::config::DashboardConfig;

    fn demo_app() -> App {
        let rt = Arc::new(
            tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .worker_threads(1)
                .build()
                .unwrap(),
        );
        let config = DashboardConfig { demo: true, ..Default::default() };
        let app = App::new(rt, &config);
        let deadline = Instant::now() + Duration::from_secs(5);
        let loading = |app: &App| TableId::ALL.iter().any(|&t| app.monitor.view().table(t).is_loading());
        while loading(&app) && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        app
    }

    fn press(app: &mut App, code: KeyCode) -> Option<InputResult> {
        handle_key(app, KeyEvent::from(code))
    }

    #[test]
    fn edit_on_container_row_prefills_definition_name() {
        let mut app = demo_app();
        app.selection.toggle_focus();
        assert_eq!(app.selection.focus, TableId::Containers);

        press(&mut app, KeyCode::Char('e'));

        let form = app.monitor.forms().form().unwrap();
        assert_eq!(form.kind, FormKind::Container);
        assert_eq!(form.payload().get("name"), Some(&json!("lsl-ubuntu-123")));
    }

    #[test]
    fn edit_on_client_row_prefills_uuid() {
        let mut app = demo_app();
        press(&mut app, KeyCode::Char('e'));

        let form = app.monitor.forms().form().unwrap();
        assert_eq!(form.kind, FormKind::User);
        assert_eq!(form.payload().get("uuid"), Some(&json!("client-123-abc")));
    }

    #[test]
    fn enter_saves_in_background_and_closes_form() {
        let mut app = demo_app();
        app.selection.toggle_focus();
        press(&mut app, KeyCode::Char('e'));
        press(&mut app, KeyCode::Enter);
        assert!(app.pending_save.is_some());
        assert!(app.monitor.forms().form().unwrap().saving);

        let deadline = Instant::now() + Duration::from_secs(5);
        while !app.poll_save() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }

        assert!(app.pending_save.is_none());
        assert!(!app.monitor.forms().is_open());
    }

    #[test]
    fn delete_key_reaches_container_rows() {
        let mut app = demo_app();
        app.selection.toggle_focus();

        // The prompt arrives through the gate; nothing to draw yet.
        assert!(press(&mut app, KeyCode::Char('d')).is_none());
        assert!(app.monitor.status().current().is_none());
    }
}
