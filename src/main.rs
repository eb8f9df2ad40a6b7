//! USB roulette - nRF52840 firmware entry point.
//!
//! One cycle per power-up:
//!   1. Bring up USB so the host can enumerate the keyboard meanwhile.
//!   2. Read the live chamber from flash.
//!   3. Grace period (safe), then armed warning, on the LEDs.
//!   4. Window elapsed: commit the next chamber, then type the payload.
//!   5. Idle until unplugged.
//!
//! Unplugging during step 3 commits nothing; the same chamber is live on
//! the next plug-in.

#![no_std]
#![no_main]

use defmt::info;
use embassy_embedded_hal::adapter::BlockingAsync;
use embassy_executor::Spawner;
use embassy_nrf::gpio::{Level, Output, OutputDrive};
use embassy_nrf::nvmc::Nvmc;
use embassy_usb::UsbDevice;
use roulette::clock::EmbassyClock;
use roulette::config::TOTAL_CHAMBERS;
use roulette::indicator::pins::ActiveLow;
use roulette::payload::{ScriptDispatcher, CHAMBER_SCRIPTS};
use roulette::store::flash::FlashStore;
use roulette::usb::{self, UsbDriver, UsbKeySink};
use roulette::{run_cycle, ArmingWindow, ChamberSequencer};
use {defmt_rtt as _, panic_probe as _};

#[cfg(feature = "dual-led")]
use roulette::indicator::DualLed;
#[cfg(not(feature = "dual-led"))]
use roulette::indicator::{pins::Mirrored, SingleLed};

#[embassy_executor::task]
async fn usb_task(device: UsbDevice<'static, UsbDriver>) -> ! {
    usb::run_usb_device(device).await
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_nrf::init(Default::default());
    info!("usb-roulette starting ({} chambers)", TOTAL_CHAMBERS);

    let usb = usb::init(p.USBD);
    spawner.must_spawn(usb_task(usb.device));

    // DK LEDs sink current: start high (dark).
    let led1 = ActiveLow(Output::new(p.P0_13, Level::High, OutputDrive::Standard));
    let led2 = ActiveLow(Output::new(p.P0_14, Level::High, OutputDrive::Standard));

    #[cfg(feature = "dual-led")]
    let mut indicator = DualLed::new(led1, led2);
    #[cfg(not(feature = "dual-led"))]
    let mut indicator = SingleLed::new(Mirrored::new(led1, led2));

    let flash = BlockingAsync::new(Nvmc::new(p.NVMC));
    let mut sequencer = ChamberSequencer::new(FlashStore::new(flash), TOTAL_CHAMBERS);
    let mut dispatcher = ScriptDispatcher::new(
        &CHAMBER_SCRIPTS,
        UsbKeySink::new(usb.keyboard_writer),
        EmbassyClock,
    );

    let chamber = run_cycle(
        &mut sequencer,
        &ArmingWindow::DEFAULT,
        &mut indicator,
        &mut EmbassyClock,
        &mut dispatcher,
    )
    .await;
    info!("Chamber {} spent; idling until unplugged", chamber.index());

    core::future::pending::<()>().await;
}
