//! Typed structural errors raised while reading text runs.

use thiserror::Error;

/// Shapes of `<text>` content that positional alignment cannot handle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SvgTextError {
    /// A `<tspan>` contains another `<tspan>`.
    #[error("nested tspans are not supported (element id: {})", .element.as_deref().unwrap_or("-"))]
    NestedTspans { element: Option<String> },
}
