//! Event registration types

use std::fmt;
use std::sync::Arc;

use super::EventList;
use crate::error::Result;

/// Signature of an event callback
///
/// Callbacks receive the subject, the seconds this update covers, and the
/// list that is firing them so they can add or remove registrations
/// (including their own) while the list is being walked.
pub type EventFn<S> = dyn Fn(&mut S, f32, &mut EventList<S>) -> Result<()> + Send + Sync;

/// A shareable event callback
///
/// Clones refer to the same callback; equality is identity, which is what
/// "remove every registration of this callback" compares against.
pub struct EventCallback<S>(Arc<EventFn<S>>);

impl<S> EventCallback<S> {
    /// Wrap a closure
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&mut S, f32, &mut EventList<S>) -> Result<()> + Send + Sync + 'static,
    {
        Self(Arc::new(callback))
    }

    /// Invoke the callback
    #[inline]
    pub fn call(&self, subject: &mut S, seconds: f32, list: &mut EventList<S>) -> Result<()> {
        (self.0)(subject, seconds, list)
    }

    /// Whether both handles refer to the same callback
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<S> Clone for EventCallback<S> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<S> PartialEq for EventCallback<S> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl<S> Eq for EventCallback<S> {}

impl<S> fmt::Debug for EventCallback<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventCallback({:p})", Arc::as_ptr(&self.0).cast::<()>())
    }
}

/// The four ways an event can be scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub enum EventKind {
    /// Fires on every update
    EveryFrame,
    /// Fires on the next update only
    OneShot,
    /// Fires when the subject's elapsed time passes a threshold
    Timed,
    /// Fires when the subject's normalized elapsed time passes a threshold
    NormalizedTimed,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::EveryFrame => "every-frame",
            Self::OneShot => "one-shot",
            Self::Timed => "timed",
            Self::NormalizedTimed => "normalized-timed",
        };
        f.write_str(name)
    }
}

/// When a registration fires
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Trigger {
    /// Every update
    EveryFrame,
    /// The next update, then the registration is purged
    OneShot,
    /// When elapsed seconds pass the given value
    Timed(f32),
    /// When normalized elapsed time passes the given fraction
    NormalizedTimed(f32),
}

impl Trigger {
    /// The kind tag of this trigger
    pub fn kind(&self) -> EventKind {
        match self {
            Self::EveryFrame => EventKind::EveryFrame,
            Self::OneShot => EventKind::OneShot,
            Self::Timed(_) => EventKind::Timed,
            Self::NormalizedTimed(_) => EventKind::NormalizedTimed,
        }
    }

    /// The threshold for timed triggers
    pub fn fire_at(&self) -> Option<f32> {
        match *self {
            Self::Timed(at) | Self::NormalizedTimed(at) => Some(at),
            Self::EveryFrame | Self::OneShot => None,
        }
    }

    /// Clamp thresholds into their valid ranges
    pub(crate) fn clamped(self) -> Self {
        match self {
            Self::Timed(at) => {
                if at < 0.0 {
                    log::warn!("Timed event threshold {at} clamped to 0.0");
                }
                Self::Timed(at.max(0.0))
            }
            Self::NormalizedTimed(at) => Self::NormalizedTimed(at.clamp(0.0, 1.0)),
            other => other,
        }
    }
}

/// One scheduled callback
///
/// Two registrations are equal when callback, trigger (kind and threshold),
/// execution order and group all match.
pub struct Registration<S> {
    pub(crate) id: u64,
    /// Callback to invoke
    pub callback: EventCallback<S>,
    /// Firing rule
    pub trigger: Trigger,
    /// Ascending order of execution within one update
    pub order: i32,
    /// Tag used for bulk removal
    pub group: i32,
}

impl<S> Registration<S> {
    /// Create a registration with order and group 0
    pub fn new(trigger: Trigger, callback: EventCallback<S>) -> Self {
        Self {
            id: 0,
            callback,
            trigger: trigger.clamped(),
            order: 0,
            group: 0,
        }
    }

    /// Set the execution order
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Set the group tag
    pub fn with_group(mut self, group: i32) -> Self {
        self.group = group;
        self
    }

    /// The kind of this registration
    pub fn kind(&self) -> EventKind {
        self.trigger.kind()
    }
}

impl<S> Clone for Registration<S> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            callback: self.callback.clone(),
            trigger: self.trigger,
            order: self.order,
            group: self.group,
        }
    }
}

impl<S> PartialEq for Registration<S> {
    fn eq(&self, other: &Self) -> bool {
        self.callback == other.callback
            && self.trigger == other.trigger
            && self.order == other.order
            && self.group == other.group
    }
}

impl<S> fmt::Debug for Registration<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("callback", &self.callback)
            .field("trigger", &self.trigger)
            .field("order", &self.order)
            .field("group", &self.group)
            .finish()
    }
}
