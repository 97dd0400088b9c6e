use crate::{channels::ChannelHost, data_class::DataClassRegistry, types::TimeTick};

/// Lets a member in clock-following mode set the pace of the local scheduler
pub trait ClockSteering {
    /// Move the local clock to `target`; `correction` is the remaining
    /// sub-tick offset estimate
    fn steer(&mut self, target: TimeTick, correction: f64);
}

/// What a role needs from its surroundings, constructed once and handed over
/// at role creation
pub struct ReplicationContext {
    pub channels: Box<dyn ChannelHost>,
    pub data_classes: DataClassRegistry,
    pub clock: Option<Box<dyn ClockSteering>>,
}

impl ReplicationContext {
    pub fn new(channels: Box<dyn ChannelHost>, data_classes: DataClassRegistry) -> Self {
        Self {
            channels,
            data_classes,
            clock: None,
        }
    }

    pub fn with_clock(mut self, clock: Box<dyn ClockSteering>) -> Self {
        self.clock = Some(clock);
        self
    }
}
