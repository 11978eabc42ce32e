use std::io::{self, Write};
use crossterm::{cursor::MoveTo, queue, style::{Attribute, Color, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor}};

use crate::forms::{FieldValue, FormState};
use super::shared::truncate_str;

const FORM_WIDTH: u16 = 60;

fn boxed_line(out: &mut impl Write, x: u16, y: &mut u16, text: &str) -> io::Result<()> {
    let inner = FORM_WIDTH as usize - 2;
    queue!(out, MoveTo(x, *y))?;
    write!(out, "│{:<inner$}│", truncate_str(text, inner), inner = inner)?;
    *y += 1;
    Ok(())
}

fn field_line(form: &FormState, idx: usize) -> String {
    let field = &form.fields[idx];
    let marker = if idx == form.focus { '>' } else { ' ' };
    let value = match &field.value {
        FieldValue::Text(s) if field.read_only && s.is_empty() => "(assigned on save)".to_string(),
        FieldValue::Text(s) => s.clone(),
        FieldValue::Checkbox(true) => "[x]".to_string(),
        FieldValue::Checkbox(false) => "[ ]".to_string(),
    };
    format!(" {} {:<10} {}", marker, field.label, value)
}

/// Draw the open form as a box centred on the screen.
pub fn render_form(out: &mut impl Write, form: &FormState, (cols, rows): (u16, u16)) -> io::Result<()> {
    let height = form.fields.len() as u16 + 6;
    let x = cols.saturating_sub(FORM_WIDTH) / 2;
    let mut y = rows.saturating_sub(height) / 2;
    let inner = FORM_WIDTH as usize - 2;

    queue!(out, MoveTo(x, y), SetBackgroundColor(Color::DarkBlue), SetForegroundColor(Color::White), SetAttribute(Attribute::Bold))?;
    write!(out, "┌{:─<inner$}┐", format!(" {} ", form.title), inner = inner)?;
    queue!(out, ResetColor, SetAttribute(Attribute::Reset))?;
    y += 1;

    boxed_line(out, x, &mut y, "")?;
    for idx in 0..form.fields.len() {
        boxed_line(out, x, &mut y, &field_line(form, idx))?;
    }
    boxed_line(out, x, &mut y, "")?;
    match &form.error {
        Some(err) => {
            queue!(out, SetForegroundColor(Color::Red))?;
            boxed_line(out, x, &mut y, &format!(" ! {}", err))?;
            queue!(out, ResetColor)?;
        }
        None if form.saving => boxed_line(out, x, &mut y, " Saving...")?,
        None => boxed_line(out, x, &mut y, "")?,
    }
    boxed_line(out, x, &mut y, " Enter: save | Tab: next | Space: toggle | Esc: cancel")?;

    queue!(out, MoveTo(x, y))?;
    write!(out, "└{}┘", "─".repeat(inner))?;
    Ok(())
}
