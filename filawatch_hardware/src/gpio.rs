//! Real encoder input via rppal GPIO (Linux only, `hardware` feature).

use crate::error::{HwError, Result};
use rppal::gpio::{Gpio, InputPin, Level, Trigger};
use std::time::Instant;

/// Encoder switch wired to a BCM pin with the internal pull-up enabled.
/// Both flanks are delivered to the callback; level mapping is high = true.
pub struct EncoderPin {
    _pin: InputPin,
}

impl EncoderPin {
    pub fn open<F>(bcm_pin: u8, mut on_edge: F) -> Result<Self>
    where
        F: FnMut(Instant, bool) + Send + 'static,
    {
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
        let mut pin = gpio
            .get(bcm_pin)
            .map_err(|e| HwError::Gpio(format!("open encoder pin {bcm_pin}: {e}")))?
            .into_input_pullup();
        pin.set_async_interrupt(Trigger::Both, move |level| {
            on_edge(Instant::now(), level == Level::High);
        })
        .map_err(|e| HwError::Gpio(format!("register edge interrupt: {e}")))?;
        tracing::info!(bcm_pin, "encoder input armed");
        Ok(Self { _pin: pin })
    }
}
