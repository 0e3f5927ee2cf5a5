//! Realm-local timer queue backing `setTimeout` and `setInterval`.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::value::Value;

const MIN_INTERVAL: Duration = Duration::from_millis(1);

struct Timer {
    due: Instant,
    callback: Value,
    args: Vec<Value>,
    interval: Option<Duration>,
}

/// A timer that is due to fire.
pub(crate) struct DueTimer {
    pub callback: Value,
    pub args: Vec<Value>,
}

#[derive(Default)]
pub(crate) struct TimerQueue {
    next_id: u32,
    timers: BTreeMap<u32, Timer>,
}

impl TimerQueue {
    pub fn schedule(&mut self, callback: Value, args: Vec<Value>, delay_ms: f64, repeat: bool) -> u32 {
        let delay = if delay_ms.is_finite() && delay_ms > 0.0 {
            Duration::from_secs_f64(delay_ms / 1000.0)
        } else {
            Duration::ZERO
        };
        self.next_id += 1;
        let id = self.next_id;
        self.timers.insert(
            id,
            Timer {
                due: Instant::now() + delay,
                callback,
                args,
                interval: repeat.then_some(delay.max(MIN_INTERVAL)),
            },
        );
        id
    }

    pub fn clear(&mut self, id: u32) {
        self.timers.remove(&id);
    }

    pub fn clear_all(&mut self) {
        self.timers.clear();
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.values().map(|t| t.due).min()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Take the earliest timer due at `now`, ties broken by creation order.
    /// Intervals are rescheduled before their callback runs.
    pub fn pop_due(&mut self, now: Instant) -> Option<DueTimer> {
        let (&id, _) = self
            .timers
            .iter()
            .filter(|(_, t)| t.due <= now)
            .min_by_key(|(id, t)| (t.due, **id))?;
        let timer = self.timers.get_mut(&id)?;
        match timer.interval {
            Some(interval) => {
                timer.due += interval;
                Some(DueTimer {
                    callback: timer.callback.clone(),
                    args: timer.args.clone(),
                })
            }
            None => {
                let timer = self.timers.remove(&id)?;
                Some(DueTimer {
                    callback: timer.callback,
                    args: timer.args,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_fires_once_in_order() {
        let mut queue = TimerQueue::default();
        queue.schedule(Value::string("late"), vec![], 10.0, false);
        queue.schedule(Value::string("early"), vec![], 0.0, false);
        let later = Instant::now() + Duration::from_millis(50);

        let first = queue.pop_due(later).unwrap();
        assert_eq!(first.callback.to_js_string(), "early");
        let second = queue.pop_due(later).unwrap();
        assert_eq!(second.callback.to_js_string(), "late");
        assert!(queue.pop_due(later).is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_interval_reschedules_until_cleared() {
        let mut queue = TimerQueue::default();
        let id = queue.schedule(Value::Null, vec![], 5.0, true);
        let later = Instant::now() + Duration::from_millis(6);
        assert!(queue.pop_due(later).is_some());
        assert!(!queue.is_empty());
        queue.clear(id);
        assert!(queue.next_deadline().is_none());
    }

    #[test]
    fn test_not_due_yet() {
        let mut queue = TimerQueue::default();
        queue.schedule(Value::Null, vec![], 1000.0, false);
        assert!(queue.pop_due(Instant::now()).is_none());
        assert!(queue.next_deadline().is_some());
    }
}
