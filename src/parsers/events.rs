//! Event-table parsing helpers: coalesce events sharing `(reason, involvedObject)`
//! by taking the latest `lastTimestamp` and summing `count` (spec §4.3).

use std::collections::HashMap;

use crate::model::EventRecord;

pub fn coalesce(events: Vec<EventRecord>) -> Vec<EventRecord> {
    let mut by_key: HashMap<(String, String), EventRecord> = HashMap::new();
    for ev in events {
        let key = (ev.reason.clone(), ev.involved_object.clone());
        by_key
            .entry(key)
            .and_modify(|existing| {
                existing.count += ev.count;
                if ev.last_timestamp > existing.last_timestamp {
                    existing.last_timestamp = ev.last_timestamp;
                    existing.message = ev.message.clone();
                }
                if ev.first_timestamp < existing.first_timestamp {
                    existing.first_timestamp = ev.first_timestamp;
                }
            })
            .or_insert(ev);
    }
    let mut out: Vec<_> = by_key.into_values().collect();
    out.sort_by(|a, b| a.reason.cmp(&b.reason).then(a.involved_object.cmp(&b.involved_object)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EventKind;
    use chrono::{Duration, Utc};

    fn ev(reason: &str, obj: &str, count: i32, minutes_ago: i64) -> EventRecord {
        let ts = Utc::now() - Duration::minutes(minutes_ago);
        EventRecord {
            type_: EventKind::Warning,
            reason: reason.to_string(),
            message: format!("{reason} message"),
            count,
            first_timestamp: ts,
            last_timestamp: ts,
            involved_object: obj.to_string(),
        }
    }

    #[test]
    fn coalesces_by_reason_and_object_summing_count() {
        let events = vec![ev("BackOff", "app-1", 5, 10), ev("BackOff", "app-1", 15, 2)];
        let coalesced = coalesce(events);
        assert_eq!(coalesced.len(), 1);
        assert_eq!(coalesced[0].count, 20);
    }

    #[test]
    fn keeps_distinct_objects_separate() {
        let events = vec![ev("BackOff", "app-1", 5, 10), ev("BackOff", "app-2", 3, 10)];
        let coalesced = coalesce(events);
        assert_eq!(coalesced.len(), 2);
    }
}
