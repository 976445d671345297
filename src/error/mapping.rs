//! Mapping from envelope result codes to error categories.

/// Category of a non-zero result code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    /// 701 - authentication error.
    Authentication,
    /// 801 - job number limit.
    JobLimit,
    /// 102000 - service invocation failure.
    ServiceInvocation,
    /// 102001 - parameter error.
    InvalidParameter,
    /// 102002 - can not find resource.
    ResourceNotFound,
    /// 102003 - invalid operation.
    InvalidOperation,
    /// 102114 - job does not exist.
    JobNotFound,
    /// 102116 - billing failure.
    Billing,
    /// Any other code.
    Other,
}

/// Map an envelope result code to its category.
pub fn map_result_code(code: i64) -> RemoteErrorKind {
    match code {
        701 => RemoteErrorKind::Authentication,
        801 => RemoteErrorKind::JobLimit,
        102000 => RemoteErrorKind::ServiceInvocation,
        102001 => RemoteErrorKind::InvalidParameter,
        102002 => RemoteErrorKind::ResourceNotFound,
        102003 => RemoteErrorKind::InvalidOperation,
        102114 => RemoteErrorKind::JobNotFound,
        102116 => RemoteErrorKind::Billing,
        _ => RemoteErrorKind::Other,
    }
}
