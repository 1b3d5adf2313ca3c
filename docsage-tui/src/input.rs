//! Single-line text input state.
//!
//! ratatui draws widgets from plain state, so the edit buffer and cursor
//! live here and the render side just reads them. The cursor is a char
//! index; byte offsets are derived on demand so multi-byte input behaves.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Editable single-line buffer with a cursor.
#[derive(Debug, Default)]
pub struct InputField {
    value: String,
    /// Cursor position in chars, 0..=len
    cursor: usize,
}

impl InputField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Cursor position in chars, for rendering.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }

    /// Apply a key event. Returns whether it was consumed; unhandled keys
    /// are left for the caller.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        // Keys with Control held are commands, never text
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return false;
        }

        match key.code {
            KeyCode::Char(c) => {
                self.insert(c);
                true
            }
            KeyCode::Backspace => {
                self.backspace();
                true
            }
            KeyCode::Delete => {
                self.delete();
                true
            }
            KeyCode::Left => {
                self.cursor = self.cursor.saturating_sub(1);
                true
            }
            KeyCode::Right => {
                if self.cursor < self.char_len() {
                    self.cursor += 1;
                }
                true
            }
            KeyCode::Home => {
                self.cursor = 0;
                true
            }
            KeyCode::End => {
                self.cursor = self.char_len();
                true
            }
            _ => false,
        }
    }

    fn insert(&mut self, c: char) {
        let at = self.byte_index(self.cursor);
        self.value.insert(at, c);
        self.cursor += 1;
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let at = self.byte_index(self.cursor - 1);
        self.value.remove(at);
        self.cursor -= 1;
    }

    fn delete(&mut self) {
        if self.cursor >= self.char_len() {
            return;
        }
        let at = self.byte_index(self.cursor);
        self.value.remove(at);
    }

    fn char_len(&self) -> usize {
        self.value.chars().count()
    }

    /// Byte offset of the given char position.
    fn byte_index(&self, char_pos: usize) -> usize {
        self.value
            .char_indices()
            .nth(char_pos)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_str(field: &mut InputField, text: &str) {
        for c in text.chars() {
            field.handle_key(key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn test_typing_appends_at_cursor() {
        let mut field = InputField::new();
        type_str(&mut field, "hello");
        assert_eq!(field.value(), "hello");
        assert_eq!(field.cursor(), 5);
    }

    #[test]
    fn test_insert_in_the_middle() {
        let mut field = InputField::new();
        type_str(&mut field, "hllo");
        field.handle_key(key(KeyCode::Home));
        field.handle_key(key(KeyCode::Right));
        field.handle_key(key(KeyCode::Char('e')));
        assert_eq!(field.value(), "hello");
        assert_eq!(field.cursor(), 2);
    }

    #[test]
    fn test_backspace_and_delete() {
        let mut field = InputField::new();
        type_str(&mut field, "abc");

        field.handle_key(key(KeyCode::Backspace));
        assert_eq!(field.value(), "ab");

        field.handle_key(key(KeyCode::Home));
        field.handle_key(key(KeyCode::Delete));
        assert_eq!(field.value(), "b");

        // At the boundaries both are no-ops
        field.handle_key(key(KeyCode::Backspace));
        assert_eq!(field.value(), "b");
        field.handle_key(key(KeyCode::End));
        field.handle_key(key(KeyCode::Delete));
        assert_eq!(field.value(), "b");
    }

    #[test]
    fn test_multibyte_input() {
        let mut field = InputField::new();
        type_str(&mut field, "café");
        assert_eq!(field.value(), "café");
        assert_eq!(field.cursor(), 4);

        field.handle_key(key(KeyCode::Backspace));
        assert_eq!(field.value(), "caf");

        field.handle_key(key(KeyCode::Left));
        field.handle_key(key(KeyCode::Char('é')));
        assert_eq!(field.value(), "caéf");
    }

    #[test]
    fn test_control_chords_are_not_text() {
        let mut field = InputField::new();
        let consumed = field.handle_key(KeyEvent::new(
            KeyCode::Char('l'),
            KeyModifiers::CONTROL,
        ));
        assert!(!consumed);
        assert_eq!(field.value(), "");
    }

    #[test]
    fn test_clear_resets_cursor() {
        let mut field = InputField::new();
        type_str(&mut field, "something");
        field.clear();
        assert!(field.is_empty());
        assert_eq!(field.cursor(), 0);
    }
}
