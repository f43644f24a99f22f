//! Blocking message dialogs shown to the user.
//!
//! The loader only raises a dialog when every catalog source failed. The
//! native implementation uses `rfd`; `ConsoleDialog` is for headless runs.

use futures::future::BoxFuture;
use futures::FutureExt;

/// Severity shown by the dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Error,
}

/// Presentation options for a message dialog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageOptions {
    pub title: String,
    pub kind: MessageKind,
    /// Label of the single acknowledgement button
    pub ok_label: String,
}

impl MessageOptions {
    pub fn error(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            kind: MessageKind::Error,
            ok_label: "OK".to_string(),
        }
    }
}

/// Shows a message and resolves once the user acknowledged it
pub trait Dialog: Send + Sync {
    fn message<'a>(&'a self, text: &'a str, options: MessageOptions) -> BoxFuture<'a, ()>;
}

/// Native message box via `rfd`
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeDialog;

impl Dialog for NativeDialog {
    fn message<'a>(&'a self, text: &'a str, options: MessageOptions) -> BoxFuture<'a, ()> {
        let text = text.to_string();
        async move {
            // rfd's message box blocks the calling thread until dismissed
            let shown = tokio::task::spawn_blocking(move || {
                let level = match options.kind {
                    MessageKind::Error => rfd::MessageLevel::Error,
                };
                let _ = rfd::MessageDialog::new()
                    .set_title(options.title)
                    .set_description(text)
                    .set_level(level)
                    .set_buttons(rfd::MessageButtons::OkCustom(options.ok_label))
                    .show();
            })
            .await;

            if let Err(e) = shown {
                tracing::warn!("Message dialog task failed: {}", e);
            }
        }
        .boxed()
    }
}

/// Prints the message to stderr instead of opening a window
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleDialog;

impl Dialog for ConsoleDialog {
    fn message<'a>(&'a self, text: &'a str, options: MessageOptions) -> BoxFuture<'a, ()> {
        async move {
            eprintln!("[{}] {}", options.title, text);
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_options() {
        let options = MessageOptions::error("Error fetching games");
        assert_eq!(options.title, "Error fetching games");
        assert_eq!(options.kind, MessageKind::Error);
        assert_eq!(options.ok_label, "OK");
    }

    #[tokio::test]
    async fn test_console_dialog_resolves() {
        ConsoleDialog
            .message("nothing to see", MessageOptions::error("Test"))
            .await;
    }
}
