//! Classified API errors with user-facing messages.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// User-facing message per error class.
///
/// Missing entries in the config file fall back to the defaults below.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ErrorMessages {
  pub unauthorized: String,
  pub forbidden: String,
  pub not_found: String,
  pub rate_limited: String,
  pub server: String,
  pub connectivity: String,
  /// Used when the backend gives no message of its own
  pub generic: String,
  pub invalid_response: String,
}

impl Default for ErrorMessages {
  fn default() -> Self {
    Self {
      unauthorized: "انتهت صلاحية الجلسة، يرجى تسجيل الدخول مرة أخرى".to_string(),
      forbidden: "ليس لديك صلاحية للقيام بهذا الإجراء".to_string(),
      not_found: "العنصر المطلوب غير موجود".to_string(),
      rate_limited: "تم تجاوز عدد الطلبات المسموح، يرجى المحاولة لاحقاً".to_string(),
      server: "حدث خطأ في الخادم، يرجى المحاولة لاحقاً".to_string(),
      connectivity: "تعذر الاتصال بالخادم، يرجى التحقق من اتصالك بالإنترنت".to_string(),
      generic: "حدث خطأ غير متوقع".to_string(),
      invalid_response: "استجابة غير صالحة من الخادم".to_string(),
    }
  }
}

/// Error class, for callers that branch on the kind of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  Auth,
  Permission,
  NotFound,
  RateLimited,
  Server,
  Connectivity,
  Rejected,
  Decode,
}

/// A failed API call. `Display` is the user-facing message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
  /// 401 - session missing or expired, caller should send the user to login
  #[error("{message}")]
  Unauthorized { message: String },

  /// 403
  #[error("{message}")]
  Forbidden { message: String },

  /// 404
  #[error("{message}")]
  NotFound { message: String },

  /// 429
  #[error("{message}")]
  RateLimited { message: String },

  /// 5xx
  #[error("{message}")]
  Server { status: u16, message: String },

  /// No response received, including timeouts
  #[error("{message}")]
  Connectivity { message: String },

  /// Any other failure status, or a success status carrying an error envelope
  #[error("{message}")]
  Rejected { status: u16, message: String },

  /// Response body could not be understood
  #[error("{message}")]
  Decode { message: String },
}

impl ApiError {
  /// Classify a failed response by status code.
  ///
  /// `backend_message` is only used for statuses without a dedicated message.
  pub fn from_status(
    status: StatusCode,
    backend_message: Option<String>,
    messages: &ErrorMessages,
  ) -> Self {
    match status.as_u16() {
      401 => Self::Unauthorized {
        message: messages.unauthorized.clone(),
      },
      403 => Self::Forbidden {
        message: messages.forbidden.clone(),
      },
      404 => Self::NotFound {
        message: messages.not_found.clone(),
      },
      429 => Self::RateLimited {
        message: messages.rate_limited.clone(),
      },
      code @ 500..=599 => Self::Server {
        status: code,
        message: messages.server.clone(),
      },
      code => Self::Rejected {
        status: code,
        message: backend_message
          .filter(|m| !m.trim().is_empty())
          .unwrap_or_else(|| messages.generic.clone()),
      },
    }
  }

  pub fn connectivity(messages: &ErrorMessages) -> Self {
    Self::Connectivity {
      message: messages.connectivity.clone(),
    }
  }

  pub fn decode(messages: &ErrorMessages) -> Self {
    Self::Decode {
      message: messages.invalid_response.clone(),
    }
  }

  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::Unauthorized { .. } => ErrorKind::Auth,
      Self::Forbidden { .. } => ErrorKind::Permission,
      Self::NotFound { .. } => ErrorKind::NotFound,
      Self::RateLimited { .. } => ErrorKind::RateLimited,
      Self::Server { .. } => ErrorKind::Server,
      Self::Connectivity { .. } => ErrorKind::Connectivity,
      Self::Rejected { .. } => ErrorKind::Rejected,
      Self::Decode { .. } => ErrorKind::Decode,
    }
  }

  pub fn message(&self) -> &str {
    match self {
      Self::Unauthorized { message }
      | Self::Forbidden { message }
      | Self::NotFound { message }
      | Self::RateLimited { message }
      | Self::Server { message, .. }
      | Self::Connectivity { message }
      | Self::Rejected { message, .. }
      | Self::Decode { message } => message,
    }
  }

  /// Whether the caller should redirect to login.
  pub fn requires_login(&self) -> bool {
    self.kind() == ErrorKind::Auth
  }
}
