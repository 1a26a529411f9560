use super::InternalDefaultDS;
use crate::datastructures::common::{ClockIdentity, ClockQuality, PortIdentity};

/// The parent dataset of an instance (IEEE1588-2019 section 8.2.3)
///
/// While not synchronized to another clock, the instance is its own
/// grandmaster and the dataset mirrors the default dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct InternalParentDS {
    pub(crate) parent_port_identity: PortIdentity,
    pub(crate) grandmaster_identity: ClockIdentity,
    pub(crate) grandmaster_clock_quality: ClockQuality,
    pub(crate) grandmaster_priority_1: u8,
    pub(crate) grandmaster_priority_2: u8,
}

impl InternalParentDS {
    pub(crate) fn new(default_ds: &InternalDefaultDS) -> Self {
        InternalParentDS {
            parent_port_identity: PortIdentity {
                clock_identity: default_ds.clock_identity,
                port_number: 0,
            },
            grandmaster_identity: default_ds.clock_identity,
            grandmaster_clock_quality: default_ds.clock_quality,
            grandmaster_priority_1: default_ds.priority_1,
            grandmaster_priority_2: default_ds.priority_2,
        }
    }
}
