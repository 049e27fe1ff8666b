#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]

pub mod app;
pub mod capabilities;
pub mod draft;
pub mod event;
pub mod fetch;
pub mod image_processing;
pub mod listing;
pub mod model;
pub mod progress;
pub mod screens;
pub mod services;
pub mod view;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

pub use app::App;
pub use capabilities::{Capabilities, Effect};
pub use crux_core::{render::Render, App as CruxApp};
pub use event::{Event, Screen};
pub use model::Model;
pub use view::ViewModel;

pub const DEFAULT_API_BASE_URL: &str = "https://api.example.com/v1";
pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const LEADERBOARD_PAGE_SIZE: u32 = 10;
pub const TRAINER_PACKAGES_PAGE_SIZE: u32 = 10;
pub const XP_PER_CHECK_IN: u64 = 25;
pub const BASE_LEVEL_XP: f64 = 100.0;
pub const LEVEL_XP_GROWTH: f64 = 1.2;
pub const DEFAULT_DAILY_CALORIE_TARGET: f64 = 2000.0;
pub const MAX_UPLOAD_IMAGE_BYTES: usize = 10 * 1024 * 1024;
pub const MAX_IMAGE_DIMENSION: u32 = 8192;
pub const MAX_UPLOAD_DIMENSION: u32 = 1920;
pub const MAX_IMAGE_ALLOC: u64 = 256 * 1024 * 1024;
pub const JPEG_QUALITY: u8 = 85;
pub const MAX_POST_LENGTH: usize = 2000;
pub const MAX_MEAL_ITEMS: usize = 30;
pub const TOAST_DURATION_MS: u64 = 3000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Transient,
    Permanent,
    Fatal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Network,
    Timeout,
    Authentication,
    Authorization,
    Validation,
    NotFound,
    Conflict,
    RateLimited,
    Storage,
    Serialization,
    ImageProcessing,
    ImageTooLarge,
    ImageDimensionsTooLarge,
    ImageFormatUnsupported,
    InvalidState,
    Internal,
    Unknown,
}

impl ErrorKind {
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Network => "NETWORK_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::Authentication => "AUTH_ERROR",
            Self::Authorization => "FORBIDDEN",
            Self::Validation => "VALIDATION_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::RateLimited => "RATE_LIMITED",
            Self::Storage => "STORAGE_ERROR",
            Self::Serialization => "SERIALIZATION_ERROR",
            Self::ImageProcessing => "IMAGE_PROCESSING_ERROR",
            Self::ImageTooLarge => "IMAGE_TOO_LARGE",
            Self::ImageDimensionsTooLarge => "IMAGE_DIMENSIONS_TOO_LARGE",
            Self::ImageFormatUnsupported => "IMAGE_FORMAT_UNSUPPORTED",
            Self::InvalidState => "INVALID_STATE",
            Self::Internal => "INTERNAL_ERROR",
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    #[must_use]
    pub const fn default_severity(self) -> ErrorSeverity {
        match self {
            Self::Network | Self::Timeout | Self::Conflict | Self::RateLimited | Self::Storage => {
                ErrorSeverity::Transient
            }

            Self::Serialization | Self::Internal | Self::InvalidState => ErrorSeverity::Fatal,

            Self::Authentication
            | Self::Authorization
            | Self::Validation
            | Self::NotFound
            | Self::ImageProcessing
            | Self::ImageTooLarge
            | Self::ImageDimensionsTooLarge
            | Self::ImageFormatUnsupported
            | Self::Unknown => ErrorSeverity::Permanent,
        }
    }

    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::Network | Self::Timeout | Self::RateLimited | Self::Storage | Self::Conflict
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppError {
    pub kind: ErrorKind,
    pub severity: ErrorSeverity,
    pub message: String,
    pub internal_message: Option<String>,
    pub context: HashMap<String, String>,
}

impl AppError {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            message: message.into(),
            internal_message: None,
            context: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_internal(mut self, internal: impl Into<String>) -> Self {
        self.internal_message = Some(internal.into());
        self
    }

    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self.severity {
            ErrorSeverity::Transient => true,
            ErrorSeverity::Fatal => false,
            ErrorSeverity::Permanent => self.kind.is_retryable(),
        }
    }

    #[must_use]
    pub fn user_facing_message(&self) -> String {
        match self.kind {
            ErrorKind::Network => {
                "Unable to connect. Check your internet connection and pull to refresh.".into()
            }
            ErrorKind::Timeout => "The request timed out. Pull to refresh to try again.".into(),
            ErrorKind::Authentication => "Your session has expired. Please sign in again.".into(),
            ErrorKind::Authorization => "You don't have permission to do that.".into(),
            ErrorKind::Validation => self.message.clone(),
            ErrorKind::NotFound => "That item could not be found.".into(),
            ErrorKind::Conflict => {
                "This conflicts with a recent change. Refresh and try again.".into()
            }
            ErrorKind::RateLimited => "Too many requests. Wait a moment and try again.".into(),
            ErrorKind::Storage => "Unable to save data on this device.".into(),
            ErrorKind::Serialization => {
                "Something went wrong reading the server's response.".into()
            }
            ErrorKind::ImageProcessing => {
                "Unable to process the photo. Try a different one.".into()
            }
            ErrorKind::ImageTooLarge => format!(
                "The photo is too large. Use one smaller than {} MB.",
                MAX_UPLOAD_IMAGE_BYTES / 1_000_000
            ),
            ErrorKind::ImageDimensionsTooLarge => format!(
                "The photo dimensions are too large. Maximum is {MAX_IMAGE_DIMENSION}x{MAX_IMAGE_DIMENSION} pixels."
            ),
            ErrorKind::ImageFormatUnsupported => {
                "This photo format is not supported. Use JPEG, PNG or WebP.".into()
            }
            ErrorKind::InvalidState => "The app is in an unexpected state. Please restart.".into(),
            ErrorKind::Internal | ErrorKind::Unknown => {
                "An unexpected error occurred. Please try again.".into()
            }
        }
    }

    #[must_use]
    pub fn from_http_status(status: u16, message: Option<&str>) -> Self {
        let kind = match status {
            400 | 422 => ErrorKind::Validation,
            401 => ErrorKind::Authentication,
            403 => ErrorKind::Authorization,
            404 => ErrorKind::NotFound,
            408 => ErrorKind::Timeout,
            409 => ErrorKind::Conflict,
            429 => ErrorKind::RateLimited,
            500..=599 => ErrorKind::Internal,
            _ => ErrorKind::Unknown,
        };

        let message = message
            .filter(|m| !m.trim().is_empty())
            .map_or_else(|| format!("HTTP error: {status}"), str::to_string);

        let mut error = Self::new(kind, message).with_context("http_status", status.to_string());
        // 5xx is the service's problem, not a broken client: worth a manual retry.
        if (500..=599).contains(&status) {
            error.severity = ErrorSeverity::Transient;
        }
        error
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message)?;
        if let Some(internal) = &self.internal_message {
            write!(f, " (internal: {internal})")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

/// User input the core refuses before anything leaves the device.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum ValidationError {
    #[error("time must be HH:MM in 24-hour format, got '{0}'")]
    InvalidTime(String),
    #[error("pick at least one day for an enabled reminder")]
    NoDaysSelected,
    #[error("write something or add a photo before posting")]
    EmptyPost,
    #[error("post is too long ({len} > {max} characters)")]
    PostTooLong { len: usize, max: usize },
    #[error("{field} must be a positive number")]
    NotPositive { field: &'static str },
    #[error("{field} cannot be negative")]
    Negative { field: &'static str },
    #[error("add at least one item to the meal")]
    EmptyMeal,
    #[error("a meal can hold at most {max} items")]
    TooManyMealItems { max: usize },
    #[error("{field} cannot be empty")]
    Blank { field: &'static str },
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        AppError::new(ErrorKind::Validation, e.to_string())
    }
}

impl From<capabilities::ApiError> for AppError {
    fn from(e: capabilities::ApiError) -> Self {
        use capabilities::ApiError;
        match e {
            ApiError::InvalidUrl { ref url, .. } => {
                AppError::new(ErrorKind::Internal, "Service address is misconfigured")
                    .with_internal(e.to_string())
                    .with_context("url", url.clone())
            }
            ApiError::Transport { message } => {
                AppError::new(ErrorKind::Network, "Network request failed").with_internal(message)
            }
            ApiError::Status { code, message } => Self::from_http_status(code, Some(&message)),
            ApiError::MissingData => AppError::new(
                ErrorKind::Serialization,
                "The server response was missing its data",
            ),
            ApiError::Decode { message } => AppError::new(
                ErrorKind::Serialization,
                "The server response could not be read",
            )
            .with_internal(message),
            ApiError::Encode { message } => {
                AppError::new(ErrorKind::Serialization, "Could not prepare the request")
                    .with_internal(message)
            }
            ApiError::NotReady => AppError::new(ErrorKind::Authentication, "Not signed in"),
        }
    }
}

impl From<capabilities::KvError> for AppError {
    fn from(e: capabilities::KvError) -> Self {
        use capabilities::KvError;
        match e {
            KvError::Serialization { message } => {
                AppError::new(ErrorKind::Serialization, "Stored data is unreadable")
                    .with_internal(message)
            }
            other => AppError::new(ErrorKind::Storage, other.to_string()),
        }
    }
}

impl From<image_processing::ImagePrepError> for AppError {
    fn from(e: image_processing::ImagePrepError) -> Self {
        use image_processing::ImagePrepError;
        let kind = match &e {
            ImagePrepError::TooLarge { .. } => ErrorKind::ImageTooLarge,
            ImagePrepError::DimensionsTooLarge { .. } => ErrorKind::ImageDimensionsTooLarge,
            ImagePrepError::UnsupportedFormat => ErrorKind::ImageFormatUnsupported,
            ImagePrepError::Empty | ImagePrepError::Decode(_) | ImagePrepError::Encode(_) => {
                ErrorKind::ImageProcessing
            }
        };
        AppError::new(kind, e.to_string())
    }
}
