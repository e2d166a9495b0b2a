use crate::models::task::Task;

/// Severity of a user-visible notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warning,
    Danger,
}

pub type ChangeHook = Box<dyn Fn(&[Task])>;
pub type RenderHook = Box<dyn Fn()>;
pub type NotifyHook = Box<dyn Fn(&str, Level)>;
pub type ConfirmHook = Box<dyn Fn(&str) -> bool>;

/// Callbacks injected into the store, decoupling it from any particular
/// presentation layer. All are optional; an absent confirm hook means
/// "confirmed".
#[derive(Default)]
pub struct Hooks {
    /// Invoked with the current collection after every state change
    pub on_change: Option<ChangeHook>,
    /// Invoked whenever the view should re-render
    pub on_render: Option<RenderHook>,
    /// Invoked for toast-style user notifications
    pub notify: Option<NotifyHook>,
    /// Invoked before destructive operations; returns the user's yes/no
    pub confirm: Option<ConfirmHook>,
}
