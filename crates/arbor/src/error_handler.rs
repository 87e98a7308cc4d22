//! Classification and reporting of unexpected UI failures.
//!
//! A failure is described as a [`UiError`], analyzed into an [`ErrorInfo`]
//! carrying a short error code, then logged and optionally shown to the user
//! or forwarded through an [`ErrorSink`].

use std::fmt;

use crate::{config::ErrorHandlerConfig, error::Error};

/// The class of a script runtime error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptErrorKind {
    /// Failure evaluating dynamic code.
    Eval,
    /// Failure inside the runtime itself.
    Internal,
    /// A value outside its permitted range.
    Range,
    /// A reference to something that does not exist.
    Reference,
    /// Malformed source.
    Syntax,
    /// A value of the wrong type.
    Type,
    /// A malformed URI.
    Uri,
    /// Any other named error class.
    Other(String),
}

impl ScriptErrorKind {
    /// Short error code for the kind.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Eval => "E1",
            Self::Internal => "I2",
            Self::Range => "A3",
            Self::Reference => "R4",
            Self::Syntax => "S5",
            Self::Type => "T6",
            Self::Uri => "U7",
            Self::Other(_) => "J0",
        }
    }
}

/// Where a script error was raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// Source file.
    pub file: String,
    /// Line, when known.
    pub line: Option<u32>,
    /// Column, when known.
    pub column: Option<u32>,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file)?;
        if let Some(line) = self.line {
            write!(f, ":{line}")?;
        }
        if let Some(column) = self.column {
            write!(f, ":{column}")?;
        }
        Ok(())
    }
}

/// A request that failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AjaxRequest {
    /// HTTP method.
    pub method: String,
    /// Request URL.
    pub url: String,
}

/// A failure reported to the error handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiError {
    /// A runtime error raised by UI code.
    Script {
        /// Error class.
        kind: ScriptErrorKind,
        /// Error message.
        message: String,
        /// Source location.
        location: Option<SourceLocation>,
        /// Stack trace.
        stack: Option<String>,
        /// Extra diagnostics attached by the thrower.
        debug_info: Option<String>,
    },
    /// A failed server round trip.
    Ajax {
        /// HTTP status, 0 when the connection failed.
        status: u16,
        /// Status text reported with the failure.
        error_thrown: String,
        /// The request, when known.
        request: Option<AjaxRequest>,
        /// Response body.
        response_text: Option<String>,
    },
    /// A failure reported by the host window without an error value.
    Window {
        /// Error message.
        message: String,
        /// Source file.
        file: String,
        /// Source line.
        line: u32,
    },
    /// A failure without any description.
    Unknown,
    /// Anything else, described by a string.
    Other(String),
}

impl UiError {
    /// A script error with only a kind and message.
    pub fn script(kind: ScriptErrorKind, message: impl Into<String>) -> Self {
        Self::Script {
            kind,
            message: message.into(),
            location: None,
            stack: None,
            debug_info: None,
        }
    }
}

impl From<Error> for UiError {
    fn from(e: Error) -> Self {
        Self::script(ScriptErrorKind::Internal, e.to_string())
    }
}

/// The analyzed form of a [`UiError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    /// Short error code.
    pub code: String,
    /// User facing message.
    pub message: String,
    /// Source location, for script errors.
    pub location: Option<String>,
    /// Stack trace, for script errors.
    pub stack: Option<String>,
    /// Extra diagnostics.
    pub debug_info: Option<String>,
    /// Full log text.
    pub log: String,
}

/// The message box shown for a fatal error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FatalMessage {
    /// Title.
    pub header: String,
    /// Body text including the error code.
    pub body: String,
    /// Label of the confirming action, which reloads the UI.
    pub yes_button_text: String,
    /// Label of the dismissing action.
    pub no_button_text: String,
    /// Details shown on demand.
    pub hidden_text: String,
}

/// Receives errors the handler surfaces or forwards.
pub trait ErrorSink {
    /// Present a fatal error to the user.
    fn show_fatal_message(&mut self, message: &FatalMessage, code: &str);

    /// Forward an error log to the server.
    fn send_log_request(&mut self, log: &str);
}

/// Join the non-empty parts with `sep`.
fn join(sep: &str, parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(sep)
}

/// Wrap `s` in `prefix` and `suffix`, or return an empty string if `s` is
/// empty.
fn boxed(prefix: &str, s: &str, suffix: &str) -> String {
    if s.is_empty() {
        String::new()
    } else {
        format!("{prefix}{s}{suffix}")
    }
}

/// Classifies, logs and reports UI failures.
#[derive(Debug, Clone, Default)]
pub struct ErrorHandler {
    /// Reporting flags.
    config: ErrorHandlerConfig,
}

impl ErrorHandler {
    /// Create a handler with the given flags.
    pub fn new(config: ErrorHandlerConfig) -> Self {
        Self { config }
    }

    /// Reporting flags.
    pub fn config(&self) -> &ErrorHandlerConfig {
        &self.config
    }

    /// Analyze `error` and handle the result. Returns the analysis.
    pub fn handle(&self, error: &UiError, sink: Option<&mut dyn ErrorSink>) -> ErrorInfo {
        let info = self.analyze_error(error);
        self.handle_error_info(&info, sink);
        info
    }

    /// Turn a failure into an [`ErrorInfo`].
    pub fn analyze_error(&self, error: &UiError) -> ErrorInfo {
        match error {
            UiError::Script {
                kind,
                message,
                location,
                stack,
                debug_info,
            } => {
                let location = location.as_ref().map(SourceLocation::to_string);
                let mut log = format!("Unexpected error: {message}");
                if let Some(location) = &location {
                    log.push_str(&format!(" at {location}"));
                }
                if let Some(stack) = stack {
                    log.push('\n');
                    log.push_str(stack);
                }
                if let Some(debug_info) = debug_info {
                    log.push_str("\n----- Additional debug information: -----\n");
                    log.push_str(debug_info);
                }
                ErrorInfo {
                    code: kind.code().to_string(),
                    message: message.clone(),
                    location,
                    stack: stack.clone(),
                    debug_info: debug_info.clone(),
                    log,
                }
            }
            UiError::Ajax {
                status,
                error_thrown,
                request,
                response_text,
            } => {
                let request = request
                    .as_ref()
                    .map(|r| join(" ", &[r.method.as_str(), r.url.as_str()]))
                    .unwrap_or_default();
                let status_text = if *status == 0 {
                    "Connection error".to_string()
                } else {
                    join(" ", &[status.to_string().as_str(), error_thrown.as_str()])
                };
                let message = format!(
                    "AJAX call{} failed{}",
                    boxed(" \"", &request, "\""),
                    boxed(" [", &status_text, "]")
                );
                let debug_info = response_text
                    .as_ref()
                    .filter(|t| !t.is_empty())
                    .map(|t| format!("Response Text:\n{t}"));
                let log = match &debug_info {
                    Some(d) => format!("{message}\n{d}"),
                    None => message.clone(),
                };
                ErrorInfo {
                    code: format!("X{status}"),
                    message,
                    location: None,
                    stack: None,
                    debug_info,
                    log,
                }
            }
            UiError::Window {
                message,
                file,
                line,
            } => {
                let code = "J00";
                ErrorInfo {
                    code: code.to_string(),
                    message: message.clone(),
                    location: None,
                    stack: None,
                    debug_info: None,
                    log: format!("{message} at {file}:{line}\n(Code {code})"),
                }
            }
            UiError::Unknown => ErrorInfo {
                code: "P3".to_string(),
                message: "Unknown error".to_string(),
                location: None,
                stack: None,
                debug_info: None,
                log: "Unexpected error (no reason provided)".to_string(),
            },
            UiError::Other(s) => {
                let message = if s.is_empty() {
                    "Unexpected error".to_string()
                } else {
                    s.clone()
                };
                ErrorInfo {
                    code: "P4".to_string(),
                    log: format!("Unexpected error: {message}"),
                    message,
                    location: None,
                    stack: None,
                    debug_info: None,
                }
            }
        }
    }

    /// Log the analysis and pass it to the sink as the flags direct.
    pub fn handle_error_info(&self, info: &ErrorInfo, sink: Option<&mut dyn ErrorSink>) {
        if self.config.log_error && !info.log.is_empty() {
            tracing::error!(code = %info.code, "{}", info.log);
        }
        let Some(sink) = sink else {
            return;
        };
        if self.config.display_error {
            sink.show_fatal_message(&Self::fatal_message(info), &info.code);
        }
        if self.config.send_error {
            sink.send_log_request(&info.log);
        }
    }

    /// The message box content for an analyzed error.
    pub fn fatal_message(info: &ErrorInfo) -> FatalMessage {
        FatalMessage {
            header: "Internal UI Error".to_string(),
            body: format!("{} (Code {})", info.message, info.code),
            yes_button_text: "Reload".to_string(),
            no_button_text: "Ignore".to_string(),
            hidden_text: info.log.clone(),
        }
    }
}
