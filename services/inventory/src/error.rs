use std::fmt::{Debug, Display};

pub use erp_common::error::AppErrorCode;
use erp_common::error::{AppCfgError, AppConfidentialityError};

#[derive(Debug, Clone)]
pub struct AppError {
    pub code: AppErrorCode,
    pub detail: Option<String>,
}

impl Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let default_detail = "none";
        let dp = if let Some(s) = &self.detail {
            s.as_str()
        } else {
            default_detail
        };
        write!(f, "code:{:?}, detail:{}", self.code, dp)
    }
}

impl AppError {
    /// errors caused by content of client request, the detail is safe
    /// to be sent back in http response body
    pub fn is_client_fault(&self) -> bool {
        matches!(
            self.code,
            AppErrorCode::InvalidInput
                | AppErrorCode::InvalidFileType
                | AppErrorCode::EmptySheet
                | AppErrorCode::MissingColumn
                | AppErrorCode::InvalidNumber
                | AppErrorCode::UnresolvedBarcodes
                | AppErrorCode::BarcodeNotFound
                | AppErrorCode::InvalidJsonFormat
                | AppErrorCode::ExceedingMaxLimit
        )
    }
}

impl From<AppCfgError> for AppError {
    fn from(value: AppCfgError) -> Self {
        AppError {
            code: value.code,
            detail: value.detail,
        }
    }
}
impl From<AppConfidentialityError> for AppError {
    fn from(value: AppConfidentialityError) -> Self {
        AppError {
            code: value.code,
            detail: Some(value.detail),
        }
    }
}
impl From<(AppErrorCode, String)> for AppError {
    fn from(value: (AppErrorCode, String)) -> Self {
        AppError {
            code: value.0,
            detail: Some(value.1),
        }
    }
}
