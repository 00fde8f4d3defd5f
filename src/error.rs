//! Engine-level errors and the shared error-code contract.

use crate::host::HostError;
use crate::kind::WidgetKind;

/// Stable machine-readable codes for errors surfaced to callers.
///
/// Codes are `E_*` strings so a UI can branch on them without parsing messages.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

/// Errors from explicit user actions (insert, bind). Periodic ticks never
/// return these for a single page; per-page failures are logged and skipped.
#[derive(Debug, thiserror::Error)]
pub enum WidgetError {
    #[error("Select a slide before inserting a widget.")]
    NoSelectedPage,
    #[error("No {0} widget found on the selected slide.")]
    NoWidget(WidgetKind),
    #[error(transparent)]
    Host(#[from] HostError),
}

impl ErrorCode for WidgetError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NoSelectedPage => "E_NO_SELECTED_PAGE",
            Self::NoWidget(_) => "E_NO_WIDGET",
            Self::Host(err) => err.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Host(err) => err.retryable(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widget_error_codes() {
        assert_eq!(WidgetError::NoSelectedPage.error_code(), "E_NO_SELECTED_PAGE");
        assert_eq!(WidgetError::NoWidget(WidgetKind::Poll).error_code(), "E_NO_WIDGET");
        let host = WidgetError::from(HostError::Rejected("busy".into()));
        assert_eq!(host.error_code(), "E_HOST_REJECTED");
        assert!(host.retryable());
    }

    #[test]
    fn no_widget_message_names_kind() {
        let msg = WidgetError::NoWidget(WidgetKind::WordCloud).to_string();
        assert_eq!(msg, "No word cloud widget found on the selected slide.");
    }
}
