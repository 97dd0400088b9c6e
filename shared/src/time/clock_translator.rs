use log::debug;

use crate::{
    config::ClockConfig,
    time::error::TranslateError,
    types::{TimeSpan, TimeTick},
};

/// From remote tick `boundary` onwards, local time is remote time plus
/// `transition`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Breakpoint {
    pub boundary: i64,
    pub transition: i64,
}

/// What a timing sample did to the translator
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ClockUpdate {
    /// First sample from this peer, the initial breakpoint was placed
    Seeded,
    /// The offset estimate moved, the breakpoints did not
    Tracked,
    /// Drift crossed the threshold and a breakpoint was pushed
    BreakpointAdded(Breakpoint),
    /// The local clock should be set to `target`, with `correction` the
    /// residual offset estimate in ticks
    Follow { target: TimeTick, correction: f64 },
}

/// Maps one remote peer's ticks onto the local time base.
///
/// Transitions are kept in whole multiples of the wrap period `J`; the
/// filtered offset holds the remaining difference. When drift pushes the
/// offset past `0.75 J` either way, a new breakpoint shifts the transition by
/// `J` for remote ticks from `r + J` onwards. Earlier breakpoints are kept, so
/// data stamped before the shift still translates the way it did.
pub struct ClockTranslator {
    gain: f64,
    wrap_period: i64,
    follow_remote: bool,
    offset: f64,
    breakpoints: Vec<Breakpoint>,
}

impl ClockTranslator {
    pub fn new(config: &ClockConfig) -> Self {
        Self {
            gain: config.gain,
            wrap_period: config.wrap_period.max(1),
            follow_remote: config.follow_remote,
            offset: 0.0,
            breakpoints: Vec::new(),
        }
    }

    pub fn is_seeded(&self) -> bool {
        !self.breakpoints.is_empty()
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn wrap_period(&self) -> i64 {
        self.wrap_period
    }

    /// Oldest first
    pub fn breakpoints(&self) -> &[Breakpoint] {
        &self.breakpoints
    }

    pub fn follows_remote(&self) -> bool {
        self.follow_remote
    }

    /// Feed one timing sample: the local tick at which a payload arrived and
    /// the remote tick it was stamped with
    pub fn update(&mut self, local_tick: TimeTick, remote_tick: TimeTick) -> ClockUpdate {
        let local = i64::from(local_tick);
        let remote = i64::from(remote_tick);

        let Some(latest) = self.breakpoints.last().copied() else {
            let transition = self.fold(local - remote);
            self.breakpoints.push(Breakpoint {
                boundary: 0,
                transition,
            });
            self.offset = (local - (remote + transition)) as f64;
            debug!(
                "clock translator seeded, transition {} offset {}",
                transition, self.offset
            );
            return self.follow_or(remote, transition, ClockUpdate::Seeded);
        };

        let raw = (local - (remote + latest.transition)) as f64;
        self.offset += self.gain * (raw - self.offset);

        if self.follow_remote {
            return self.follow_or(remote, latest.transition, ClockUpdate::Tracked);
        }

        let threshold = 0.75 * self.wrap_period as f64;
        let step = if self.offset > threshold {
            self.wrap_period
        } else if self.offset < -threshold {
            -self.wrap_period
        } else {
            return ClockUpdate::Tracked;
        };

        let breakpoint = Breakpoint {
            boundary: remote + self.wrap_period,
            transition: latest.transition + step,
        };
        self.breakpoints.push(breakpoint);
        self.offset -= step as f64;
        debug!(
            "clock translator pushed breakpoint at remote tick {}, transition {}",
            breakpoint.boundary, breakpoint.transition
        );
        ClockUpdate::BreakpointAdded(breakpoint)
    }

    /// Map a remote span onto the local time base. A single-tick span
    /// translates the tick; a longer span must come out strictly forward.
    pub fn translate(&self, span: TimeSpan) -> Result<TimeSpan, TranslateError> {
        if self.breakpoints.is_empty() {
            return Err(TranslateError::NotSeeded);
        }

        let start = self.translate_tick(span.start)?;
        if span.is_tick() {
            return Ok(TimeSpan::tick(start));
        }
        let end = self.translate_tick(span.end)?;
        if end <= start {
            return Err(TranslateError::Inconsistent {
                start: span.start,
                end: span.end,
            });
        }
        Ok(TimeSpan::new(start, end))
    }

    fn translate_tick(&self, tick: TimeTick) -> Result<TimeTick, TranslateError> {
        let remote = i64::from(tick);
        let breakpoint = self
            .breakpoints
            .iter()
            .rev()
            .find(|breakpoint| remote >= breakpoint.boundary)
            .ok_or(TranslateError::Uncovered { tick })?;
        TimeTick::try_from(remote + breakpoint.transition)
            .map_err(|_| TranslateError::OutOfRange { tick })
    }

    /// The multiple of the wrap period nearest to `difference`
    fn fold(&self, difference: i64) -> i64 {
        let half = self.wrap_period / 2;
        (difference + half).div_euclid(self.wrap_period) * self.wrap_period
    }

    fn follow_or(&self, remote: i64, transition: i64, otherwise: ClockUpdate) -> ClockUpdate {
        if !self.follow_remote {
            return otherwise;
        }
        match TimeTick::try_from(remote + transition) {
            Ok(target) => ClockUpdate::Follow {
                target,
                correction: self.offset,
            },
            Err(_) => otherwise,
        }
    }
}
