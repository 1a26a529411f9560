//! Configuration of the ptp instance and its ports
//!
//! # Instance
//! * [`InstanceConfig`]
//! * [`TimePropertiesDS`]
//!
//! # Port
//! * [`PortConfig`]
//! * [`ServoConfig`]

mod instance;
mod port;

pub use instance::InstanceConfig;
pub use port::{DelayMechanism, PortConfig};

pub use crate::{
    datastructures::{
        common::{ClockIdentity, ClockQuality, TimeSource},
        datasets::TimePropertiesDS,
        messages::SdoId,
    },
    servo::ServoConfig,
};
