//! Lights controller: the RGB LED state machine.

use thunderboard_domain::error::ThunderboardError;
use thunderboard_domain::key::LightKey;
use thunderboard_domain::lights::{self, ALL_ON, LightsState, Rgb};
use thunderboard_domain::registry;

use crate::ports::Connection;

/// Holds the last known [`LightsState`] and writes new ones.
///
/// The stored state only changes once the peripheral acknowledged a write,
/// so it never claims a command that did not reach the board.
#[derive(Debug, Default)]
pub struct LightsController {
    state: LightsState,
}

impl LightsController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Last known state.
    #[must_use]
    pub fn state(&self) -> LightsState {
        self.state
    }

    /// Replace the known state with one observed elsewhere (e.g. a full read).
    pub fn observe(&mut self, state: LightsState) {
        self.state = state;
    }

    /// Read the current LED state from the peripheral.
    ///
    /// # Errors
    ///
    /// Returns [`ThunderboardError::Transport`] when the read fails, or
    /// [`ThunderboardError::Payload`] when the payload is not a valid
    /// `(mode, r, g, b)` tuple.
    pub async fn read_state<C: Connection>(
        &mut self,
        connection: &C,
    ) -> Result<LightsState, ThunderboardError> {
        let descriptor = registry::light(LightKey::RgbLeds1)?;
        let raw = connection.read(descriptor.id).await?;
        self.state = LightsState::from_payload(&raw)?;
        Ok(self.state)
    }

    /// Light all four LEDs with `rgb` at `brightness`.
    ///
    /// # Errors
    ///
    /// Returns [`ThunderboardError::WriteFailed`] when the write fails; the
    /// known state is left unchanged.
    pub async fn turn_all_on<C: Connection>(
        &mut self,
        connection: &C,
        rgb: Rgb,
        brightness: u8,
    ) -> Result<LightsState, ThunderboardError> {
        self.set_leds(connection, &ALL_ON, rgb, brightness).await
    }

    /// Switch every LED off, keeping colour and brightness for the next
    /// `turn_all_on`.
    ///
    /// # Errors
    ///
    /// Returns [`ThunderboardError::WriteFailed`] when the write fails; the
    /// known state is left unchanged.
    pub async fn turn_all_off<C: Connection>(
        &mut self,
        connection: &C,
    ) -> Result<LightsState, ThunderboardError> {
        let next = LightsState {
            mode: lights::get_mode(&[])?,
            ..self.state
        };
        self.apply(connection, next).await
    }

    /// Light exactly the LEDs in `leds` (numbered 1 to 4).
    ///
    /// # Errors
    ///
    /// Returns [`ThunderboardError::Registry`] for LEDs outside `1..=4`, or
    /// [`ThunderboardError::WriteFailed`] when the write fails; the known
    /// state is left unchanged in both cases.
    pub async fn set_leds<C: Connection>(
        &mut self,
        connection: &C,
        leds: &[u8],
        rgb: Rgb,
        brightness: u8,
    ) -> Result<LightsState, ThunderboardError> {
        let next = LightsState {
            rgb,
            mode: lights::get_mode(leds)?,
            brightness,
        };
        self.apply(connection, next).await
    }

    async fn apply<C: Connection>(
        &mut self,
        connection: &C,
        next: LightsState,
    ) -> Result<LightsState, ThunderboardError> {
        let descriptor = registry::light(LightKey::RgbLeds1)?;
        let payload = next.to_payload();

        if let Err(err) = connection.write(descriptor.id, &payload).await {
            tracing::error!(
                %err,
                address = %connection.address(),
                mode = next.mode,
                "failed to write light state"
            );
            return Err(ThunderboardError::WriteFailed(err));
        }

        tracing::debug!(mode = next.mode, ?payload, "light state written");
        self.state = next;
        Ok(next)
    }
}
