//! Integration tests for the roulette cycle across simulated power cycles.

use core::cell::Cell;
use core::task::Poll;

use embassy_futures::{block_on, poll_once};
use embedded_hal_async::delay::DelayNs;
use roulette::chamber::Header;
use roulette::config::{HEADER_MAGIC, TOTAL_CHAMBERS};
use roulette::indicator::Indicator;
use roulette::payload::{KeySink, PayloadDispatcher, ScriptDispatcher, CHAMBER_SCRIPTS};
use roulette::store::MemoryStore;
use roulette::{run_cycle, ArmingWindow, Chamber, ChamberSequencer, Clock, Error};

/// Virtual clock. Once `now` reaches `power_cut_at`, delays never finish,
/// which is what unplugging looks like from inside the firmware.
struct SimClock<'a> {
    now: &'a Cell<u64>,
    power_cut_at: Option<u64>,
}

impl Clock for SimClock<'_> {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

impl DelayNs for SimClock<'_> {
    async fn delay_ns(&mut self, ns: u32) {
        self.delay_ms(ns / 1_000_000).await
    }

    async fn delay_ms(&mut self, ms: u32) {
        if let Some(cut) = self.power_cut_at {
            if self.now.get() >= cut {
                core::future::pending::<()>().await;
            }
        }
        self.now.set(self.now.get() + u64::from(ms));
    }
}

struct Dark;

impl Indicator for Dark {
    fn safe(&mut self) {}
    fn armed(&mut self) {}
    fn off(&mut self) {}
}

#[derive(Default)]
struct Fired(Vec<u8>);

impl PayloadDispatcher for Fired {
    async fn fire(&mut self, chamber: Chamber) {
        self.0.push(chamber.index());
    }
}

/// One power cycle that runs to completion. Returns the medium for the next.
fn boot(medium: MemoryStore, total: u8, fired: &mut Fired) -> MemoryStore {
    let now = Cell::new(0);
    let mut seq = ChamberSequencer::new(medium, total);
    let mut clock = SimClock {
        now: &now,
        power_cut_at: None,
    };
    block_on(run_cycle(
        &mut seq,
        &ArmingWindow::DEFAULT,
        &mut Dark,
        &mut clock,
        fired,
    ));
    seq.into_medium()
}

/// One power cycle that loses power `cut_at` ms into the window.
fn boot_and_unplug(medium: MemoryStore, cut_at: u64, fired: &mut Fired) -> MemoryStore {
    let now = Cell::new(0);
    let mut seq = ChamberSequencer::new(medium, TOTAL_CHAMBERS);
    let mut dark = Dark;
    let mut clock = SimClock {
        now: &now,
        power_cut_at: Some(cut_at),
    };
    {
        let cycle = run_cycle(&mut seq, &ArmingWindow::DEFAULT, &mut dark, &mut clock, fired);
        assert!(matches!(poll_once(cycle), Poll::Pending));
    }
    seq.into_medium()
}

fn persisted_chamber(medium: &MemoryStore) -> Option<u8> {
    medium
        .contents()
        .and_then(|bytes| Header::from_bytes(&bytes))
        .map(|h| h.chamber)
}

#[test]
fn three_chambers_fire_in_order_and_wrap() {
    let mut fired = Fired::default();
    let mut medium = MemoryStore::erased();

    for expected_next in [1, 2, 0, 1] {
        medium = boot(medium, 3, &mut fired);
        assert_eq!(persisted_chamber(&medium), Some(expected_next));
    }
    assert_eq!(fired.0, vec![0, 1, 2, 0]);
}

#[test]
fn wrap_invariant_holds_for_any_chamber_count() {
    for total in [1u8, 2, 3, 5, 8] {
        let mut fired = Fired::default();
        let mut medium = MemoryStore::erased();

        for cycle in 1..=(3 * usize::from(total) + 1) {
            medium = boot(medium, total, &mut fired);
            let expected = (cycle % usize::from(total)) as u8;
            assert_eq!(persisted_chamber(&medium), Some(expected), "total={}", total);
        }

        let expected: Vec<u8> = (0..fired.0.len()).map(|i| (i % usize::from(total)) as u8).collect();
        assert_eq!(fired.0, expected);
    }
}

#[test]
fn unplugging_during_the_window_changes_nothing() {
    let mut fired = Fired::default();
    let medium = boot(MemoryStore::erased(), TOTAL_CHAMBERS, &mut fired);
    let before = medium.contents();
    let writes = medium.write_count();

    // Once in the grace period, once while armed, once on the last tick.
    let mut medium = medium;
    for cut_at in [0, 500, 1500, 2900] {
        medium = boot_and_unplug(medium, cut_at, &mut fired);
        assert_eq!(medium.contents(), before);
        assert_eq!(medium.write_count(), writes);
    }
    assert_eq!(fired.0, vec![0]);

    // The same chamber is live when the user finally lets it run.
    let _ = boot(medium, TOTAL_CHAMBERS, &mut fired);
    assert_eq!(fired.0, vec![0, 1]);
}

#[test]
fn each_completed_cycle_writes_exactly_once() {
    let mut fired = Fired::default();
    let mut medium = MemoryStore::with_header(Header::new(Chamber::FIRST));

    for n in 1..=6 {
        medium = boot(medium, TOTAL_CHAMBERS, &mut fired);
        assert_eq!(medium.write_count(), n);
    }
}

#[test]
fn first_boot_initialises_then_commits() {
    let mut fired = Fired::default();
    let medium = boot(MemoryStore::erased(), TOTAL_CHAMBERS, &mut fired);
    let zero = Header::new(Chamber::FIRST).to_bytes();
    let one = Header::new(Chamber::new(1, TOTAL_CHAMBERS).unwrap()).to_bytes();
    assert_eq!(medium.writes(), &[zero, one]);
}

#[test]
fn out_of_range_index_restarts_at_chamber_zero() {
    let mut fired = Fired::default();
    let corrupt = MemoryStore::with_header(Header {
        magic: HEADER_MAGIC,
        chamber: 7,
    });

    let medium = boot(corrupt, 3, &mut fired);
    assert_eq!(fired.0, vec![0]);
    assert_eq!(persisted_chamber(&medium), Some(1));
}

#[test]
fn unreadable_storage_behaves_like_fresh() {
    let mut fired = Fired::default();
    let medium = boot(
        MemoryStore::with_header(Header::new(Chamber::new(2, 3).unwrap())).failing_reads(),
        3,
        &mut fired,
    );
    assert_eq!(fired.0, vec![0]);
    assert!(medium.write_count() >= 1);
}

#[test]
fn foreign_data_in_storage_is_wiped_and_rotation_resumes() {
    let mut fired = Fired::default();
    let mut medium = MemoryStore::erased().corrupted();

    for _ in 0..4 {
        medium = boot(medium, 3, &mut fired);
    }
    assert_eq!(fired.0, vec![0, 1, 2, 0]);
    assert_eq!(medium.erase_count(), 1);
    assert_eq!(persisted_chamber(&medium), Some(1));
}

#[test]
fn idempotent_initialisation_across_boots() {
    let mut fired = Fired::default();
    let medium = boot(MemoryStore::erased(), 3, &mut fired);
    let after_first = medium.contents();

    let mut seq = ChamberSequencer::new(medium, 3);
    for _ in 0..4 {
        assert_eq!(block_on(seq.begin()), Chamber::new(1, 3).unwrap());
    }
    assert_eq!(seq.store().medium().contents(), after_first);
}

// Full stack: bundled scripts through the dispatcher.

#[derive(Default)]
struct Keys(Vec<roulette::hid::KeyboardReport>);

impl KeySink for Keys {
    async fn send(&mut self, report: &roulette::hid::KeyboardReport) -> Result<(), Error> {
        self.0.push(*report);
        Ok(())
    }
}

#[test]
fn bundled_chambers_type_something_and_end_released() {
    for i in 0..TOTAL_CHAMBERS {
        let now = Cell::new(0);
        let mut dispatcher = ScriptDispatcher::new(
            &CHAMBER_SCRIPTS,
            Keys::default(),
            SimClock {
                now: &now,
                power_cut_at: None,
            },
        );
        block_on(dispatcher.fire(Chamber::new(i, TOTAL_CHAMBERS).unwrap()));

        let reports = &dispatcher.keys().0;
        assert!(reports.len() > 2, "chamber {} typed nothing", i);
        assert!(reports.first().unwrap().is_empty());
        assert!(reports.last().unwrap().is_empty());
        // Presses and releases alternate after the wake report.
        for pair in reports[1..].chunks(2) {
            assert!(!pair[0].is_empty());
            assert!(pair[1].is_empty());
        }
    }
}
