//! One power cycle: read the chamber, sit out the window, commit, fire.

use crate::chamber::Chamber;
use crate::indicator::Indicator;
use crate::payload::PayloadDispatcher;
use crate::sequencer::{ArmingWindow, ChamberSequencer, Clock, Outcome};
use crate::store::HeaderStore;

/// Run the boot cycle once. Returns the chamber that fired.
///
/// Only returns if the window ran out. Power loss during the window simply
/// stops the future, so nothing after `run_window` happens.
///
/// The commit always lands before dispatch, and the indicator is dark by the
/// time the payload starts. A failed commit is logged and the chamber still
/// fires; at worst the same chamber comes round again next boot.
pub async fn run_cycle<S, I, C, D>(
    sequencer: &mut ChamberSequencer<S>,
    window: &ArmingWindow,
    indicator: &mut I,
    clock: &mut C,
    dispatcher: &mut D,
) -> Chamber
where
    S: HeaderStore,
    I: Indicator,
    C: Clock,
    D: PayloadDispatcher,
{
    let chamber = sequencer.begin().await;

    #[cfg(feature = "defmt")]
    defmt::info!("Chamber {} loaded", chamber.index());

    let outcome = sequencer.run_window(window, indicator, clock).await;
    debug_assert_eq!(outcome, Outcome::Fired);

    if let Err(_e) = sequencer.commit_and_advance(chamber).await {
        #[cfg(feature = "defmt")]
        defmt::error!("Commit failed: {}", _e);
    }

    dispatcher.fire(chamber).await;
    chamber
}
