use crate::{
    config::InstanceConfig,
    datastructures::{
        common::{ClockIdentity, ClockQuality},
        messages::SdoId,
    },
};

/// The default dataset of an instance, static over the lifetime of the
/// instance (IEEE1588-2019 section 8.2.1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct InternalDefaultDS {
    pub(crate) clock_identity: ClockIdentity,
    pub(crate) number_ports: u16,
    pub(crate) clock_quality: ClockQuality,
    pub(crate) priority_1: u8,
    pub(crate) priority_2: u8,
    pub(crate) domain_number: u8,
    pub(crate) slave_only: bool,
    pub(crate) sdo_id: SdoId,
}

impl InternalDefaultDS {
    pub(crate) fn new(config: InstanceConfig) -> Self {
        Self {
            clock_identity: config.clock_identity,
            number_ports: 0,
            clock_quality: config.clock_quality,
            priority_1: config.priority_1,
            priority_2: config.priority_2,
            domain_number: config.domain_number,
            slave_only: config.slave_only,
            sdo_id: config.sdo_id,
        }
    }
}
