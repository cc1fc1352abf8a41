//! Ordered event registrations and the firing algorithm

use std::mem;

use super::registration::{EventCallback, EventKind, Registration, Trigger};
use crate::error::Result;
use crate::lifetime::Aging;
use crate::settings::EndOfLife;

/// What happened to the subject's lifetime during an effect-level update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LifetimeOutcome {
    /// Number of lifetime boundaries crossed
    pub wraps: u32,
    /// The lifetime boundary was reached with [`EndOfLife::Destroy`]
    pub expired: bool,
}

/// An ordered collection of event registrations
///
/// Registrations are kept sorted by ascending `order`. Registrations that
/// share an order fire in the order they were added.
pub struct EventList<S> {
    registrations: Vec<Registration<S>>,
    next_id: u64,
    frame_marker: Option<u64>,
    scratch: Vec<u64>,
}

impl<S> Default for EventList<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> std::fmt::Debug for EventList<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventList")
            .field("registrations", &self.registrations)
            .finish_non_exhaustive()
    }
}

impl<S> EventList<S> {
    /// Create an empty list
    pub fn new() -> Self {
        Self {
            registrations: Vec::new(),
            next_id: 1,
            frame_marker: None,
            scratch: Vec::new(),
        }
    }

    /// Number of registrations
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Whether the list has no registrations
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    /// Registrations in firing order
    pub fn iter(&self) -> impl Iterator<Item = &Registration<S>> {
        self.registrations.iter()
    }

    /// Insert a registration, keeping the list sorted by execution order
    pub fn add(&mut self, mut registration: Registration<S>) {
        registration.id = self.next_id;
        registration.trigger = registration.trigger.clamped();
        self.next_id += 1;

        let index = self
            .registrations
            .partition_point(|existing| existing.order <= registration.order);
        self.registrations.insert(index, registration);
    }

    /// Register a callback that fires on every update
    pub fn add_every_frame(&mut self, callback: EventCallback<S>, order: i32, group: i32) {
        self.add_with(Trigger::EveryFrame, callback, order, group);
    }

    /// Register a callback that fires on the next update only
    pub fn add_one_shot(&mut self, callback: EventCallback<S>, order: i32, group: i32) {
        self.add_with(Trigger::OneShot, callback, order, group);
    }

    /// Register a callback that fires when elapsed time passes `fire_at` seconds
    pub fn add_timed(&mut self, fire_at: f32, callback: EventCallback<S>, order: i32, group: i32) {
        self.add_with(Trigger::Timed(fire_at), callback, order, group);
    }

    /// Register a callback that fires when normalized elapsed time passes `fire_at`
    pub fn add_normalized_timed(
        &mut self,
        fire_at: f32,
        callback: EventCallback<S>,
        order: i32,
        group: i32,
    ) {
        self.add_with(Trigger::NormalizedTimed(fire_at), callback, order, group);
    }

    fn add_with(&mut self, trigger: Trigger, callback: EventCallback<S>, order: i32, group: i32) {
        self.add(
            Registration::new(trigger, callback)
                .with_order(order)
                .with_group(group),
        );
    }

    /// Remove every registration of `callback`, returning how many were removed
    pub fn remove_callback(&mut self, callback: &EventCallback<S>) -> usize {
        self.remove_where(|r| r.callback == *callback)
    }

    /// Remove every registration of `callback` with the given kind
    pub fn remove_callback_of_kind(&mut self, kind: EventKind, callback: &EventCallback<S>) -> usize {
        self.remove_where(|r| r.kind() == kind && r.callback == *callback)
    }

    /// Remove every registration tagged with `group`
    pub fn remove_group(&mut self, group: i32) -> usize {
        self.remove_where(|r| r.group == group)
    }

    /// Remove the first registration equal to `registration`
    pub fn remove(&mut self, registration: &Registration<S>) -> bool {
        match self.registrations.iter().position(|r| r == registration) {
            Some(index) => {
                self.registrations.remove(index);
                true
            }
            None => false,
        }
    }

    /// Remove every registration
    pub fn remove_all(&mut self) -> usize {
        let count = self.registrations.len();
        self.registrations.clear();
        count
    }

    /// Remove every registration of the given kind
    pub fn remove_all_of_kind(&mut self, kind: EventKind) -> usize {
        self.remove_where(|r| r.kind() == kind)
    }

    /// Remove every registration of the given kind tagged with `group`
    pub fn remove_all_of_kind_in_group(&mut self, kind: EventKind, group: i32) -> usize {
        self.remove_where(|r| r.kind() == kind && r.group == group)
    }

    /// Whether `callback` is registered
    pub fn contains_callback(&self, callback: &EventCallback<S>) -> bool {
        self.registrations.iter().any(|r| r.callback == *callback)
    }

    /// Whether `callback` is registered with the given kind
    pub fn contains_callback_of_kind(&self, kind: EventKind, callback: &EventCallback<S>) -> bool {
        self.registrations
            .iter()
            .any(|r| r.kind() == kind && r.callback == *callback)
    }

    /// Whether any registration is tagged with `group`
    pub fn contains_group(&self, group: i32) -> bool {
        self.registrations.iter().any(|r| r.group == group)
    }

    /// Whether a registration equal to `registration` exists
    pub fn contains(&self, registration: &Registration<S>) -> bool {
        self.registrations.iter().any(|r| r == registration)
    }

    /// Whether any registration has the given kind
    pub fn contains_kind(&self, kind: EventKind) -> bool {
        self.registrations.iter().any(|r| r.kind() == kind)
    }

    /// Whether any registration of the given kind is tagged with `group`
    pub fn contains_kind_in_group(&self, kind: EventKind, group: i32) -> bool {
        self.registrations
            .iter()
            .any(|r| r.kind() == kind && r.group == group)
    }

    /// Number of registrations of the given kind
    pub fn count_of_kind(&self, kind: EventKind) -> usize {
        self.registrations.iter().filter(|r| r.kind() == kind).count()
    }

    /// Mark the start of a frame
    ///
    /// One-shots registered after this call survive the next
    /// [`EventList::purge_one_shots`], so a one-shot added by a callback
    /// mid-frame still gets its turn on the following frame.
    pub fn begin_frame(&mut self) {
        self.frame_marker = Some(self.next_id);
    }

    /// Remove the one-shots that had their chance to fire this frame
    pub fn purge_one_shots(&mut self) -> usize {
        let marker = self.frame_marker.take().unwrap_or(u64::MAX);
        self.remove_where(|r| r.kind() == EventKind::OneShot && r.id < marker)
    }

    fn remove_where(&mut self, mut predicate: impl FnMut(&Registration<S>) -> bool) -> usize {
        let before = self.registrations.len();
        self.registrations.retain(|r| !predicate(r));
        before - self.registrations.len()
    }
}

impl<S: Aging> EventList<S> {
    /// Fire the registrations due for `subject` this update
    ///
    /// The subject's age must already have been advanced by `seconds`.
    /// One-shots fire but are not removed here; call
    /// [`EventList::purge_one_shots`] once the frame is complete.
    pub fn update(&mut self, subject: &mut S, seconds: f32) -> Result<()> {
        if self.registrations.is_empty() {
            return Ok(());
        }
        self.fire(subject, seconds, Some(seconds))
    }

    /// Advance an effect's lifetime and fire its registrations
    ///
    /// With [`EndOfLife::Repeat`], reaching the lifetime splits the update:
    /// registrations see time up to the boundary, the age restarts at zero,
    /// and the remainder of the step is replayed. When the step overshoots
    /// the boundary by a whole lifetime or more, the tail of the current
    /// cycle is dropped along with every skipped cycle, and only the final
    /// partial cycle fires.
    /// One-shots fire exactly once, on the final segment, with the full
    /// step as their argument, and are purged before returning.
    pub fn update_with_lifetime(
        &mut self,
        subject: &mut S,
        seconds: f32,
        end_of_life: EndOfLife,
    ) -> Result<LifetimeOutcome> {
        self.begin_frame();
        let mut outcome = LifetimeOutcome::default();
        let mut segment = seconds;
        subject.age_mut().advance(seconds);

        loop {
            let age = *subject.age();
            let boundary_reached = !age.is_infinite() && age.elapsed >= age.lifetime;

            if boundary_reached && end_of_life == EndOfLife::Repeat {
                let overshoot = age.elapsed - age.lifetime;
                let residual = overshoot % age.lifetime;

                if overshoot < age.lifetime && !self.registrations.is_empty() {
                    subject.age_mut().set_elapsed(age.lifetime);
                    let until_boundary = (age.lifetime - age.last_elapsed).max(0.0);
                    self.fire(subject, until_boundary, None)?;
                }

                let restarted = subject.age_mut();
                restarted.reset();
                restarted.advance(residual);
                segment = residual;
                outcome.wraps += 1 + (overshoot / age.lifetime) as u32;
                continue;
            }

            outcome.expired = boundary_reached && end_of_life == EndOfLife::Destroy;
            break;
        }

        if !self.registrations.is_empty() {
            self.fire(subject, segment, Some(seconds))?;
        }
        self.purge_one_shots();

        Ok(outcome)
    }

    fn fire(&mut self, subject: &mut S, seconds: f32, one_shot: Option<f32>) -> Result<()> {
        let mut pending = mem::take(&mut self.scratch);
        pending.clear();
        pending.extend(self.registrations.iter().map(|r| r.id));

        let result = self.fire_pending(&pending, subject, seconds, one_shot);

        self.scratch = pending;
        result
    }

    // Walks a snapshot of ids against the live list. Callbacks may remove
    // or add registrations; removed ones are skipped, added ones wait for
    // the next update.
    fn fire_pending(
        &mut self,
        pending: &[u64],
        subject: &mut S,
        seconds: f32,
        one_shot: Option<f32>,
    ) -> Result<()> {
        let mut cursor = 0;

        for &id in pending {
            let index = match self.registrations.get(cursor) {
                Some(r) if r.id == id => cursor,
                _ => match self.registrations.iter().position(|r| r.id == id) {
                    Some(index) => index,
                    None => continue,
                },
            };
            cursor = index + 1;

            let registration = &self.registrations[index];
            let argument = match registration.trigger {
                Trigger::EveryFrame => Some(seconds),
                Trigger::OneShot => one_shot,
                Trigger::Timed(at) => subject.age().crossed(at).then_some(seconds),
                Trigger::NormalizedTimed(at) => {
                    subject.age().crossed_normalized(at).then_some(seconds)
                }
            };

            if let Some(argument) = argument {
                let callback = registration.callback.clone();
                callback.call(subject, argument, self)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FxError;
    use crate::lifetime::Lifetime;
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<&'static str>>>;

    fn recorder(log: &Log, name: &'static str) -> EventCallback<Lifetime> {
        let log = Arc::clone(log);
        EventCallback::new(move |_, _, _| {
            log.lock().map_err(FxError::callback)?.push(name);
            Ok(())
        })
    }

    fn fired(log: &Log) -> Vec<&'static str> {
        log.lock().map(|l| l.clone()).unwrap_or_default()
    }

    fn step(list: &mut EventList<Lifetime>, age: &mut Lifetime, seconds: f32) {
        age.advance(seconds);
        list.update(age, seconds).unwrap();
        list.purge_one_shots();
    }

    #[test]
    fn test_sorted_by_order_then_insertion() {
        let log = Log::default();
        let mut list = EventList::new();
        list.add_every_frame(recorder(&log, "late"), 10, 0);
        list.add_every_frame(recorder(&log, "first-zero"), 0, 0);
        list.add_every_frame(recorder(&log, "early"), -5, 0);
        list.add_every_frame(recorder(&log, "second-zero"), 0, 0);

        let mut age = Lifetime::new(1.0);
        step(&mut list, &mut age, 0.1);
        assert_eq!(
            fired(&log),
            vec!["early", "first-zero", "second-zero", "late"]
        );
    }

    #[test]
    fn test_empty_list_is_a_no_op() {
        let mut list: EventList<Lifetime> = EventList::new();
        let mut age = Lifetime::new(1.0);
        let before = age;
        list.update(&mut age, 0.5).unwrap();
        assert_eq!(age, before);
    }

    #[test]
    fn test_one_shot_fires_once() {
        let log = Log::default();
        let mut list = EventList::new();
        list.add_one_shot(recorder(&log, "once"), 0, 0);

        let mut age = Lifetime::new(1.0);
        step(&mut list, &mut age, 0.1);
        step(&mut list, &mut age, 0.1);
        assert_eq!(fired(&log), vec!["once"]);
        assert!(list.is_empty());
    }

    #[test]
    fn test_timed_fires_on_crossing() {
        let log = Log::default();
        let mut list = EventList::new();
        list.add_timed(0.25, recorder(&log, "quarter"), 0, 0);
        list.add_normalized_timed(0.5, recorder(&log, "half"), 0, 0);

        let mut age = Lifetime::new(2.0);
        step(&mut list, &mut age, 0.2);
        assert!(fired(&log).is_empty());

        step(&mut list, &mut age, 0.2);
        assert_eq!(fired(&log), vec!["quarter"]);

        step(&mut list, &mut age, 0.8);
        assert_eq!(fired(&log), vec!["quarter", "half"]);

        step(&mut list, &mut age, 0.5);
        assert_eq!(fired(&log), vec!["quarter", "half"]);
    }

    #[test]
    fn test_timed_at_zero_fires_on_first_update() {
        let log = Log::default();
        let mut list = EventList::new();
        list.add_timed(0.0, recorder(&log, "zero"), 0, 0);

        let mut age = Lifetime::new(1.0);
        step(&mut list, &mut age, 0.0);
        step(&mut list, &mut age, 0.0);
        step(&mut list, &mut age, 0.3);
        assert_eq!(fired(&log), vec!["zero"]);
    }

    #[test]
    fn test_remove_family() {
        let log = Log::default();
        let shared = recorder(&log, "shared");
        let mut list = EventList::new();
        list.add_every_frame(shared.clone(), 0, 1);
        list.add_timed(1.0, shared.clone(), 0, 2);
        list.add_one_shot(recorder(&log, "other"), 0, 2);
        list.add_every_frame(recorder(&log, "third"), 0, 3);

        assert!(list.contains_callback(&shared));
        assert!(list.contains_kind_in_group(EventKind::OneShot, 2));
        assert_eq!(list.remove_callback_of_kind(EventKind::Timed, &shared), 1);
        assert_eq!(list.remove_callback(&shared), 1);
        assert!(!list.contains_callback(&shared));
        assert_eq!(list.remove_all_of_kind_in_group(EventKind::EveryFrame, 2), 0);
        assert_eq!(list.remove_group(2), 1);
        assert_eq!(list.remove_all_of_kind(EventKind::EveryFrame), 1);
        assert!(list.is_empty());
    }

    #[test]
    fn test_remove_exact_match() {
        let log = Log::default();
        let callback = recorder(&log, "a");
        let mut list = EventList::new();
        list.add_timed(1.0, callback.clone(), 4, 0);
        list.add_timed(1.0, callback.clone(), 4, 0);

        let target = Registration::new(Trigger::Timed(1.0), callback.clone()).with_order(4);
        let missing = Registration::new(Trigger::Timed(2.0), callback).with_order(4);

        assert!(list.contains(&target));
        assert!(!list.remove(&missing));
        assert!(list.remove(&target));
        assert_eq!(list.len(), 1);
        assert_eq!(list.remove_all(), 1);
    }

    #[test]
    fn test_callback_removing_itself() {
        let log = Log::default();
        let mut list = EventList::new();
        list.add_every_frame(recorder(&log, "before"), 0, 0);

        let inner = Arc::clone(&log);
        list.add_every_frame(
            EventCallback::new(move |_, _, list: &mut EventList<Lifetime>| {
                inner.lock().map_err(FxError::callback)?.push("self-removing");
                list.remove_group(7);
                Ok(())
            }),
            1,
            7,
        );
        list.add_every_frame(recorder(&log, "after"), 2, 0);

        let mut age = Lifetime::new(1.0);
        step(&mut list, &mut age, 0.1);
        step(&mut list, &mut age, 0.1);

        assert_eq!(
            fired(&log),
            vec!["before", "self-removing", "after", "before", "after"]
        );
    }

    #[test]
    fn test_callback_removing_later_registration() {
        let log = Log::default();
        let mut list = EventList::new();
        let victim = recorder(&log, "victim");

        let target = victim.clone();
        list.add_every_frame(
            EventCallback::new(move |_, _, list: &mut EventList<Lifetime>| {
                list.remove_callback(&target);
                Ok(())
            }),
            0,
            0,
        );
        list.add_every_frame(victim, 1, 0);
        list.add_every_frame(recorder(&log, "survivor"), 2, 0);

        let mut age = Lifetime::new(1.0);
        step(&mut list, &mut age, 0.1);
        assert_eq!(fired(&log), vec!["survivor"]);
    }

    #[test]
    fn test_callback_adding_registration_fires_next_update() {
        let log = Log::default();
        let mut list = EventList::new();
        let added = recorder(&log, "added");

        list.add_one_shot(
            EventCallback::new(move |_, _, list: &mut EventList<Lifetime>| {
                list.add_every_frame(added.clone(), -1, 0);
                Ok(())
            }),
            0,
            0,
        );

        let mut age = Lifetime::new(1.0);
        step(&mut list, &mut age, 0.1);
        assert!(fired(&log).is_empty());

        step(&mut list, &mut age, 0.1);
        assert_eq!(fired(&log), vec!["added"]);
    }

    #[test]
    fn test_callback_error_propagates() {
        let mut list = EventList::new();
        list.add_every_frame(
            EventCallback::new(|_, _, _| Err(FxError::callback("boom"))),
            0,
            0,
        );

        let mut age = Lifetime::new(1.0);
        age.advance(0.1);
        let error = list.update(&mut age, 0.1).unwrap_err();
        assert_eq!(error, FxError::Callback("boom".to_string()));
    }

    #[test]
    fn test_repeat_wrap_fires_once_per_frame() {
        let log = Log::default();
        let mut list = EventList::new();
        list.add_one_shot(recorder(&log, "one-shot"), 0, 0);
        list.add_timed(0.5, recorder(&log, "half-second"), 0, 0);

        let mut age = Lifetime::new(1.0);
        let outcome = list
            .update_with_lifetime(&mut age, 2.5, EndOfLife::Repeat)
            .unwrap();

        assert_eq!(fired(&log), vec!["one-shot", "half-second"]);
        assert_eq!(outcome.wraps, 2);
        assert!(!outcome.expired);
        assert!((age.elapsed - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_repeat_single_wrap_fires_both_segments() {
        let log = Log::default();
        let mut list = EventList::new();
        list.add_timed(0.5, recorder(&log, "half-second"), 0, 0);
        list.add_timed(1.0, recorder(&log, "boundary"), 0, 0);

        let mut age = Lifetime::new(1.0);
        list.update_with_lifetime(&mut age, 0.75, EndOfLife::Repeat)
            .unwrap();
        list.update_with_lifetime(&mut age, 0.5, EndOfLife::Repeat)
            .unwrap();

        assert_eq!(fired(&log), vec!["half-second", "boundary"]);
        assert!((age.elapsed - 0.25).abs() < 1e-6);

        list.update_with_lifetime(&mut age, 0.5, EndOfLife::Repeat)
            .unwrap();
        assert_eq!(fired(&log), vec!["half-second", "boundary", "half-second"]);
    }

    #[test]
    fn test_one_shot_receives_total_step() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let inner = Arc::clone(&seen);
        let mut list = EventList::new();
        list.add_one_shot(
            EventCallback::new(move |_, seconds, _| {
                inner.lock().map_err(FxError::callback)?.push(seconds);
                Ok(())
            }),
            0,
            0,
        );

        let mut age = Lifetime::new(1.0);
        list.update_with_lifetime(&mut age, 1.25, EndOfLife::Repeat)
            .unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![1.25]);
    }

    #[test]
    fn test_destroy_reports_expiry() {
        let mut list: EventList<Lifetime> = EventList::new();
        let mut age = Lifetime::new(1.0);

        let outcome = list
            .update_with_lifetime(&mut age, 0.5, EndOfLife::Destroy)
            .unwrap();
        assert!(!outcome.expired);

        let outcome = list
            .update_with_lifetime(&mut age, 0.5, EndOfLife::Destroy)
            .unwrap();
        assert!(outcome.expired);
        assert_eq!(outcome.wraps, 0);
    }

    #[test]
    fn test_one_shot_added_mid_frame_survives_purge() {
        let log = Log::default();
        let mut list = EventList::new();
        let late = recorder(&log, "late");
        list.add_one_shot(
            EventCallback::new(move |_, _, list: &mut EventList<Lifetime>| {
                list.add_one_shot(late.clone(), 0, 0);
                Ok(())
            }),
            0,
            0,
        );

        let mut age = Lifetime::new(0.0);
        list.update_with_lifetime(&mut age, 0.1, EndOfLife::Nothing)
            .unwrap();
        assert_eq!(list.count_of_kind(EventKind::OneShot), 1);

        list.update_with_lifetime(&mut age, 0.1, EndOfLife::Nothing)
            .unwrap();
        assert_eq!(fired(&log), vec!["late"]);
        assert!(list.is_empty());
    }
}
