use brew_orders::{StockPlanError, TransitionError, ValidationError};
use brew_schemas::OrderStatus;

/// Failure of a service operation.
///
/// Every variant except `Unexpected` carries a message that is safe to show to
/// an HTTP caller. `Unexpected` wraps infrastructure failures (query errors,
/// corrupt rows) whose detail belongs in logs only.
#[derive(Debug)]
pub enum ServiceError {
    Validation(String),
    NotFound(String),
    InsufficientStock {
        menu_id: i32,
        name: String,
        stock: i32,
        requested: i32,
    },
    InvalidTransition {
        from: OrderStatus,
        to: OrderStatus,
    },
    Auth(String),
    Unexpected(anyhow::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::NotFound(message.into())
    }

    /// Stable machine-readable kind, used in logs and the CLI.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "validation_error",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::InsufficientStock { .. } => "insufficient_stock",
            ServiceError::InvalidTransition { .. } => "invalid_transition",
            ServiceError::Auth(_) => "auth_error",
            ServiceError::Unexpected(_) => "unexpected_error",
        }
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceError::Validation(m) | ServiceError::NotFound(m) | ServiceError::Auth(m) => {
                f.write_str(m)
            }
            ServiceError::InsufficientStock {
                name,
                stock,
                requested,
                ..
            } => write!(
                f,
                "insufficient stock: {name} (stock: {stock}, requested: {requested})"
            ),
            ServiceError::InvalidTransition { from, to } => write!(
                f,
                "{}",
                TransitionError {
                    from: *from,
                    to: *to
                }
            ),
            ServiceError::Unexpected(e) => write!(f, "unexpected error: {e:#}"),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServiceError::Unexpected(e) => {
                let src: &(dyn std::error::Error + 'static) = e.as_ref();
                Some(src)
            }
            _ => None,
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(e: ValidationError) -> Self {
        ServiceError::Validation(e.message)
    }
}

impl From<TransitionError> for ServiceError {
    fn from(e: TransitionError) -> Self {
        ServiceError::InvalidTransition {
            from: e.from,
            to: e.to,
        }
    }
}

impl From<StockPlanError> for ServiceError {
    fn from(e: StockPlanError) -> Self {
        match e {
            StockPlanError::MissingMenu { .. } => ServiceError::NotFound(e.to_string()),
            StockPlanError::Insufficient(s) => ServiceError::InsufficientStock {
                menu_id: s.menu_id,
                name: s.name,
                stock: s.stock,
                requested: s.requested,
            },
        }
    }
}

impl From<anyhow::Error> for ServiceError {
    fn from(e: anyhow::Error) -> Self {
        ServiceError::Unexpected(e)
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(e: sqlx::Error) -> Self {
        ServiceError::Unexpected(anyhow::Error::new(e))
    }
}
