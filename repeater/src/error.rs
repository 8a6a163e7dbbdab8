use thiserror::Error;

use crate::ElementId;

pub type Result<T, E = RepeaterError> = core::result::Result<T, E>;

/// Contract violations surfaced to the caller.
///
/// Internal consistency problems (such as a half-set realized range) are not reported here:
/// they assert in debug builds and are logged and repaired in release builds.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RepeaterError {
    #[error("element {0:?} has no virtualization record")]
    UnknownElement(ElementId),

    #[error("layout cannot be changed during layout")]
    LayoutChangeDuringLayout,

    #[error("changes in the data source are not allowed during layout")]
    ItemsChangedDuringLayout,

    #[error("get_or_create_element is not allowed during layout")]
    GetOrCreateDuringLayout,

    #[error("reentrancy detected during layout")]
    LayoutReentrancy,

    #[error("index {index} is out of range (count={count})")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("element factory produced no element for index {index}")]
    ElementFactoryFailed { index: usize },

    #[error("cannot make an anchor when there is no attached layout")]
    NoLayout,
}
