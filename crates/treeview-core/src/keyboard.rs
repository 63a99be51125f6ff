//! Keyboard Navigator
//!
//! Translates key presses into state mutations and focus moves over the displayed ordering
//! (depth-first, pruned at collapsed nodes, after any hidden/search filtering).
//!
//! | Key | Effect |
//! |-----|--------|
//! | Up / Down | focus previous / next row, clamped; with shift also toggles selection of the new row |
//! | Left | collapse an expanded node, else focus its parent |
//! | Right | expand a collapsed node, else focus its first child |
//! | Enter | select the focused node |
//! | Space | toggle expansion of the focused node, or select it when it is a leaf |
//! | Ctrl/Cmd + Home / End | focus the first / last row |
//! | Ctrl/Cmd + A | add every displayed row to the selection |
//! | Escape | clear the selection |
//! | `*` | expand every collapsed sibling of the focused child node; ignored on roots |
//!
//! Focus moves scroll the new row into view only when it is outside the viewport.

use crate::item::TreeItem;
use crate::view::TreeView;

/// Navigation keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreeKey {
    /// Arrow up.
    Up,
    /// Arrow down.
    Down,
    /// Arrow left.
    Left,
    /// Arrow right.
    Right,
    /// Enter / Return.
    Enter,
    /// Space bar.
    Space,
    /// Home.
    Home,
    /// End.
    End,
    /// Escape.
    Escape,
    /// Any printable character.
    Char(char),
}

/// Modifier keys held during a key press or click.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    /// Shift.
    pub shift: bool,
    /// Control.
    pub ctrl: bool,
    /// Command / Windows key.
    pub meta: bool,
    /// Alt / Option.
    pub alt: bool,
}

impl Modifiers {
    /// No modifiers.
    pub const NONE: Self = Self {
        shift: false,
        ctrl: false,
        meta: false,
        alt: false,
    };

    /// Only shift.
    pub const SHIFT: Self = Self {
        shift: true,
        ctrl: false,
        meta: false,
        alt: false,
    };

    /// Only control.
    pub const CTRL: Self = Self {
        shift: false,
        ctrl: true,
        meta: false,
        alt: false,
    };

    /// Returns `true` if the platform shortcut modifier (ctrl or cmd) is held.
    pub fn platform(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// A key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInput {
    /// The key.
    pub key: TreeKey,
    /// Held modifiers.
    pub modifiers: Modifiers,
}

impl KeyInput {
    /// A key without modifiers.
    pub fn new(key: TreeKey) -> Self {
        Self {
            key,
            modifiers: Modifiers::NONE,
        }
    }

    /// A key with modifiers.
    pub fn with_modifiers(key: TreeKey, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }
}

impl From<TreeKey> for KeyInput {
    fn from(key: TreeKey) -> Self {
        Self::new(key)
    }
}

/// What a key press did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// The key is not bound, navigation is disabled, or the binding had nothing to do.
    Ignored,
    /// The key was consumed.
    Handled {
        /// Focus moved to a different node.
        focus_changed: bool,
    },
}

impl KeyOutcome {
    /// Returns `true` unless the key was ignored.
    pub fn is_handled(&self) -> bool {
        matches!(self, Self::Handled { .. })
    }

    fn focus(changed: bool) -> Self {
        if changed {
            Self::Handled {
                focus_changed: true,
            }
        } else {
            Self::Ignored
        }
    }

    fn state(changed: bool) -> Self {
        if changed {
            Self::Handled {
                focus_changed: false,
            }
        } else {
            Self::Ignored
        }
    }
}

impl<R: TreeItem> TreeView<R> {
    /// Handle one key press.
    pub fn handle_key(&mut self, input: impl Into<KeyInput>) -> KeyOutcome {
        let KeyInput { key, modifiers } = input.into();
        if !self.config().enable_keyboard_navigation {
            return KeyOutcome::Ignored;
        }

        match key {
            TreeKey::Up => self.key_step(-1, modifiers.shift),
            TreeKey::Down => self.key_step(1, modifiers.shift),
            TreeKey::Left => self.key_left(),
            TreeKey::Right => self.key_right(),
            TreeKey::Enter => match self.focused_id() {
                Some(id) => KeyOutcome::state(self.select_node(&id)),
                None => KeyOutcome::Ignored,
            },
            TreeKey::Space => match self.focused_id() {
                Some(id) if self.node(&id).is_some_and(|n| !n.is_leaf) => {
                    KeyOutcome::state(self.toggle_expanded(&id))
                }
                Some(id) => KeyOutcome::state(self.select_node(&id)),
                None => KeyOutcome::Ignored,
            },
            TreeKey::Home if modifiers.platform() => {
                let first = self.displayed().first().map(|n| n.id.clone());
                self.key_focus(first)
            }
            TreeKey::End if modifiers.platform() => {
                let last = self.displayed().last().map(|n| n.id.clone());
                self.key_focus(last)
            }
            TreeKey::Char('a' | 'A') if modifiers.platform() => {
                KeyOutcome::state(self.select_all_visible())
            }
            TreeKey::Escape => KeyOutcome::state(self.clear_selection()),
            TreeKey::Char('*') => self.key_expand_siblings(),
            _ => KeyOutcome::Ignored,
        }
    }

    fn focused_id(&self) -> Option<String> {
        self.focused().map(str::to_string)
    }

    fn key_focus(&mut self, target: Option<String>) -> KeyOutcome {
        match target {
            Some(id) => KeyOutcome::focus(self.set_focus(&id)),
            None => KeyOutcome::Ignored,
        }
    }

    fn key_step(&mut self, delta: isize, extend: bool) -> KeyOutcome {
        let count = self.displayed_count();
        if count == 0 {
            return KeyOutcome::Ignored;
        }

        let current = self.focused().and_then(|id| self.position_of(id));
        let Some(current) = current else {
            let first = self.displayed().first().map(|n| n.id.clone());
            return self.key_focus(first);
        };

        let next = current.saturating_add_signed(delta).min(count - 1);
        if next == current {
            return KeyOutcome::Ignored;
        }
        let id = self.displayed()[next].id.clone();
        let outcome = KeyOutcome::focus(self.set_focus(&id));
        if extend {
            self.toggle_selection(&id);
        }
        outcome
    }

    fn key_left(&mut self) -> KeyOutcome {
        let Some(id) = self.focused_id() else {
            return KeyOutcome::Ignored;
        };
        let Some(node) = self.node(&id) else {
            return KeyOutcome::Ignored;
        };
        if !node.is_leaf && self.is_expanded(&id) {
            return KeyOutcome::state(self.toggle_expanded(&id));
        }
        let parent = node.parent_id.clone();
        self.key_focus(parent)
    }

    fn key_right(&mut self) -> KeyOutcome {
        let Some(id) = self.focused_id() else {
            return KeyOutcome::Ignored;
        };
        let Some(node) = self.node(&id) else {
            return KeyOutcome::Ignored;
        };
        if node.is_leaf {
            return KeyOutcome::Ignored;
        }
        if !self.is_expanded(&id) {
            return KeyOutcome::state(self.toggle_expanded(&id));
        }
        let first_child = node.children.first().cloned();
        self.key_focus(first_child)
    }

    fn key_expand_siblings(&mut self) -> KeyOutcome {
        let Some(id) = self.focused_id() else {
            return KeyOutcome::Ignored;
        };
        if self.node(&id).is_none_or(|n| n.parent_id.is_none()) {
            return KeyOutcome::Ignored;
        }
        let targets: Vec<String> = self
            .index()
            .siblings(&id)
            .iter()
            .filter(|sibling| {
                self.node(sibling).is_some_and(|n| !n.is_leaf) && !self.is_expanded(sibling)
            })
            .cloned()
            .collect();
        KeyOutcome::state(self.expand_many(targets))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TreeConfig;
    use crate::item::Record;

    fn view() -> TreeView<Record> {
        let items = vec![
            Record::new("a"),
            Record::new("a1").with_parent("a"),
            Record::new("a2").with_parent("a"),
            Record::new("b"),
        ];
        TreeView::new(items, TreeConfig::default()).unwrap()
    }

    #[test]
    fn test_down_without_focus_starts_at_top() {
        let mut view = view();
        assert_eq!(
            view.handle_key(TreeKey::Down),
            KeyOutcome::Handled {
                focus_changed: true
            }
        );
        assert_eq!(view.focused(), Some("a"));
    }

    #[test]
    fn test_home_requires_platform_modifier() {
        let mut view = view();
        view.set_focus("b");
        assert_eq!(view.handle_key(TreeKey::Home), KeyOutcome::Ignored);
        view.handle_key(KeyInput::with_modifiers(TreeKey::Home, Modifiers::CTRL));
        assert_eq!(view.focused(), Some("a"));
    }

    #[test]
    fn test_star_on_root_is_ignored() {
        let mut view = view();
        view.set_focus("b");
        assert_eq!(view.handle_key(TreeKey::Char('*')), KeyOutcome::Ignored);
        assert!(!view.is_expanded("a"));
        assert!(!view.can_undo());
    }

    #[test]
    fn test_disabled_navigation_ignores_keys() {
        let items = vec![Record::new("a")];
        let config = TreeConfig::default().with_keyboard_navigation(false);
        let mut view = TreeView::new(items, config).unwrap();
        assert_eq!(view.handle_key(TreeKey::Down), KeyOutcome::Ignored);
        assert_eq!(view.focused(), None);
    }
}
