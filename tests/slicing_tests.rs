use std::sync::{Arc, Mutex};
use std::time::Duration;

use dvaccum::error::SliceError;
use dvaccum::slicing::SlicePolicy;
use dvaccum::{Event, EventSlice, FnSink, Slicer};

type Collected = Arc<Mutex<Vec<EventSlice>>>;

fn collector() -> (Collected, FnSink<impl FnMut(EventSlice) + Send + 'static>) {
    let slices: Collected = Arc::new(Mutex::new(Vec::new()));
    let sink_slices = Arc::clone(&slices);
    let sink = FnSink(move |slice| sink_slices.lock().unwrap().push(slice));
    (slices, sink)
}

fn ev(timestamp: i64) -> Event {
    Event::new(1, 1, timestamp, timestamp % 2 == 0)
}

#[test]
fn count_policy_emits_exact_sizes() {
    let (slices, sink) = collector();
    let mut slicer = Slicer::new();
    slicer.do_every_number_of_events(4, sink).unwrap();

    for t in 0..18 {
        slicer.accept(ev(t)).unwrap();
    }

    let slices = slices.lock().unwrap();
    assert_eq!(slices.len(), 4, "18 events / 4 per slice -> 4 full slices");
    assert!(slices.iter().all(|s| s.len() == 4));
    assert_eq!(slicer.pending(), 2, "remainder stays buffered");
    assert_eq!(slices[0].end_timestamp(), 3);
    assert_eq!(slicer.slices_emitted(), 4);
}

#[test]
fn time_policy_spans_stay_inside_window() {
    let (slices, sink) = collector();
    let mut slicer = Slicer::new();
    slicer.do_every_time_interval(Duration::from_micros(100), sink).unwrap();

    let timestamps = [1000, 1010, 1050, 1099, 1100, 1150, 1203, 1299, 1300];
    for t in timestamps {
        slicer.accept(ev(t)).unwrap();
    }

    let slices = slices.lock().unwrap();
    let sizes: Vec<usize> = slices.iter().map(|s| s.len()).collect();
    assert_eq!(sizes, vec![4, 2, 2]);
    for slice in slices.iter() {
        let span = slice.last_timestamp().unwrap() - slice.first_timestamp().unwrap();
        assert!(span < 100, "span {span} must be below the window");
    }
    let ends: Vec<i64> = slices.iter().map(|s| s.end_timestamp()).collect();
    assert_eq!(ends, vec![1100, 1200, 1300]);
}

#[test]
fn boundary_event_starts_next_slice() {
    let (slices, sink) = collector();
    let mut slicer = Slicer::new();
    slicer.do_every_time_interval(Duration::from_micros(10), sink).unwrap();

    slicer.accept(ev(0)).unwrap();
    slicer.accept(ev(10)).unwrap();

    let slices = slices.lock().unwrap();
    assert_eq!(slices.len(), 1);
    assert_eq!(slices[0].events(), &[ev(0)]);
    assert_eq!(slicer.pending(), 1);
}

#[test]
fn time_policy_catches_up_across_gap() {
    let (slices, sink) = collector();
    let mut slicer = Slicer::new();
    slicer.do_every_time_interval(Duration::from_micros(100), sink).unwrap();

    slicer.accept(ev(0)).unwrap();
    slicer.accept(ev(50)).unwrap();
    // Skips the windows ending at 200, 300 and 400.
    slicer.accept(ev(420)).unwrap();
    slicer.accept(ev(499)).unwrap();
    slicer.accept(ev(500)).unwrap();

    let slices = slices.lock().unwrap();
    let ends: Vec<i64> = slices.iter().map(|s| s.end_timestamp()).collect();
    assert_eq!(ends, vec![100, 500]);
    for pair in ends.windows(2) {
        assert_eq!((pair[1] - pair[0]) % 100, 0, "boundaries stay on the 100us grid");
    }
    assert_eq!(slices[1].events(), &[ev(420), ev(499)]);
}

#[test]
fn time_policy_handles_gaps_across_the_whole_timestamp_range() {
    let (slices, sink) = collector();
    let mut slicer = Slicer::new();
    slicer.do_every_time_interval(Duration::from_micros(1_000), sink).unwrap();

    let start = -9_000_000_000_000_000_000;
    let late = 9_000_000_000_000_000_000;
    slicer.accept(ev(start)).unwrap();
    slicer.accept(ev(late)).unwrap();
    slicer.accept(ev(late + 500)).unwrap();
    slicer.accept(ev(late + 1_000)).unwrap();

    {
        let slices = slices.lock().unwrap();
        let ends: Vec<i64> = slices.iter().map(|s| s.end_timestamp()).collect();
        assert_eq!(ends, vec![start + 1_000, late + 1_000]);
        assert_eq!(slices[1].events(), &[ev(late), ev(late + 500)]);
    }

    // Boundaries saturate at the top of the range.
    slicer.accept(ev(i64::MAX - 10)).unwrap();
    slicer.accept(ev(i64::MAX)).unwrap();
    slicer.accept(ev(i64::MAX)).unwrap();
    assert!(slicer.pending() >= 1);
    assert_eq!(slices.lock().unwrap().len() as u64, slicer.slices_emitted());
}

#[test]
fn slices_partition_the_accepted_stream() {
    let (slices, sink) = collector();
    let mut slicer = Slicer::new();
    slicer.do_every_time_interval(Duration::from_micros(37), sink).unwrap();

    let mut accepted = Vec::new();
    let mut t = 0;
    for i in 0..500i64 {
        t += (i * 7919) % 23;
        let event = Event::new((i % 16) as u16, (i % 9) as u16, t, i % 3 == 0);
        slicer.accept(event).unwrap();
        accepted.push(event);
    }

    let slices = slices.lock().unwrap();
    let mut replayed: Vec<Event> = slices.iter().flat_map(|s| s.events().to_vec()).collect();
    let flushed = replayed.len();
    assert_eq!(flushed + slicer.pending(), accepted.len());
    assert_eq!(replayed[..], accepted[..flushed]);

    replayed.dedup();
    assert_eq!(replayed.len(), flushed, "no event appears twice");
}

#[test]
fn out_of_order_event_is_rejected_and_stream_continues() {
    let (slices, sink) = collector();
    let mut slicer = Slicer::new();
    slicer.do_every_number_of_events(2, sink).unwrap();

    slicer.accept(ev(10)).unwrap();
    slicer.accept(ev(20)).unwrap();
    let err = slicer.accept(ev(15)).unwrap_err();
    assert_eq!(err, SliceError::OutOfOrder { timestamp: 15, last: 20 });

    slicer.accept(ev(20)).unwrap();
    slicer.accept(ev(30)).unwrap();

    let slices = slices.lock().unwrap();
    assert_eq!(slices.len(), 2);
    assert!(slices.iter().flat_map(|s| s.iter()).all(|e| e.timestamp != 15));
}

#[test]
fn accept_all_counts_rejections() {
    let (_slices, sink) = collector();
    let mut slicer = Slicer::new();
    slicer.do_every_number_of_events(100, sink).unwrap();

    let rejected = slicer.accept_all([ev(5), ev(3), ev(6), ev(1), ev(6)]);
    assert_eq!(rejected, 2);
    assert_eq!(slicer.pending(), 3);
}

#[test]
fn last_configured_policy_wins() {
    let (time_slices, time_sink) = collector();
    let (count_slices, count_sink) = collector();
    let mut slicer = Slicer::new();
    slicer.do_every_time_interval(Duration::from_micros(1_000), time_sink).unwrap();
    slicer.accept(ev(0)).unwrap();
    slicer.accept(ev(1)).unwrap();

    slicer.do_every_number_of_events(3, count_sink).unwrap();
    assert_eq!(slicer.policy(), Some(SlicePolicy::EventCount(3)));
    slicer.accept(ev(2)).unwrap();

    assert!(time_slices.lock().unwrap().is_empty());
    let count_slices = count_slices.lock().unwrap();
    assert_eq!(count_slices.len(), 1, "pending events carry over to the new policy");
    assert_eq!(count_slices[0].events(), &[ev(0), ev(1), ev(2)]);
}

#[test]
fn zero_sized_policies_are_rejected() {
    let (_slices, sink) = collector();
    let mut slicer = Slicer::new();
    assert_eq!(
        slicer.do_every_time_interval(Duration::ZERO, FnSink(|_: EventSlice| {})),
        Err(SliceError::EmptyWindow)
    );
    assert_eq!(slicer.do_every_number_of_events(0, sink), Err(SliceError::EmptyCount));
    assert_eq!(slicer.policy(), None);
}
