use crate::time::Duration;

/// The current dataset of an instance (IEEE1588-2019 section 8.2.2)
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub(crate) struct InternalCurrentDS {
    pub(crate) steps_removed: u16,
    pub(crate) offset_from_master: Duration,
    pub(crate) mean_path_delay: Duration,
}
