use brew_schemas::OrderStatus;

// ---------------------------------------------------------------------------
// ValidationError
// ---------------------------------------------------------------------------

/// Bad input shape or range. The message is operator-facing and safe to
/// return to HTTP callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}

// ---------------------------------------------------------------------------
// TransitionError
// ---------------------------------------------------------------------------

/// Returned when a status change is not one of the two legal forward steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionError {
    /// Status the order was in when the change was requested.
    pub from: OrderStatus,
    /// Requested target status.
    pub to: OrderStatus,
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.from {
            OrderStatus::Completed => write!(
                f,
                "order is already completed; cannot change status to {}",
                self.to
            ),
            from => write!(
                f,
                "illegal status transition: {} -> {} (only {} -> {} is allowed)",
                from,
                self.to,
                from,
                crate::next_status(from).map(|s| s.as_str()).unwrap_or("none"),
            ),
        }
    }
}

impl std::error::Error for TransitionError {}

// ---------------------------------------------------------------------------
// StockPlanError
// ---------------------------------------------------------------------------

/// Not enough stock for one line, as seen after earlier lines of the same
/// order were applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockShortfall {
    pub menu_id: i32,
    pub name: String,
    /// Stock available to this line.
    pub stock: i32,
    pub requested: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StockPlanError {
    /// A line references a menu id that does not exist.
    MissingMenu { menu_id: i32 },
    Insufficient(StockShortfall),
}

impl std::fmt::Display for StockPlanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StockPlanError::MissingMenu { menu_id } => {
                write!(f, "menu not found: menu_id {menu_id}")
            }
            StockPlanError::Insufficient(s) => write!(
                f,
                "insufficient stock: {} (stock: {}, requested: {})",
                s.name, s.stock, s.requested
            ),
        }
    }
}

impl std::error::Error for StockPlanError {}
