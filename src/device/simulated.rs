//! In-memory robot for tests and demos.
//!
//! Parses inbound frames with the same [`FrameBuffer`] the session uses,
//! tracks LED state for the LED commands and replies to every command with
//! `IS_RESPONSE | IS_ACTIVITY`, the echoed ids and a status byte.

use bytes::Bytes;

use super::{commands, PRIMARY_PROCESSOR, SECONDARY_PROCESSOR};
use crate::protocol::{flags, seal, FrameBuffer, HexBytes, Response, STATUS_SUCCESS};

/// Last LED values a [`SimulatedDevice`] was told to show.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedState {
    /// Main LED colour from `set_main_led`.
    pub main: Option<[u8; 3]>,
    /// Mask byte of the last `set_led_mask`.
    pub mask: u8,
    /// Colour bytes of the last `set_led_mask`, in mask order.
    pub mask_values: Vec<u8>,
    /// Processor the last `set_led_mask` was addressed to.
    pub mask_target: Option<u8>,
    /// Matrix colour from `set_matrix_color`.
    pub matrix: Option<[u8; 3]>,
}

/// Fake robot on the far side of a [`SimulatedTransport`](crate::transport::SimulatedTransport).
#[derive(Debug)]
pub struct SimulatedDevice {
    buffer: FrameBuffer,
    leds: LedState,
    status: u8,
    reply_data: Bytes,
    received: Vec<Response>,
    silent: bool,
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedDevice {
    /// Create a device that answers every command with success.
    pub fn new() -> Self {
        Self {
            buffer: FrameBuffer::new(),
            leds: LedState::default(),
            status: STATUS_SUCCESS,
            reply_data: Bytes::new(),
            received: Vec::new(),
            silent: false,
        }
    }

    /// Status byte to put in subsequent replies.
    pub fn set_status(&mut self, status: u8) {
        self.status = status;
    }

    /// Data bytes to append to subsequent replies.
    pub fn set_reply_data(&mut self, data: &[u8]) {
        self.reply_data = Bytes::copy_from_slice(data);
    }

    /// Stop (or resume) replying. Commands are still recorded.
    pub fn set_silent(&mut self, silent: bool) {
        self.silent = silent;
    }

    /// Current LED state.
    pub fn leds(&self) -> &LedState {
        &self.leds
    }

    /// Every command decoded so far.
    pub fn received(&self) -> &[Response] {
        &self.received
    }

    /// Feed one inbound chunk; returns complete reply frames.
    pub fn receive(&mut self, chunk: &[u8]) -> Vec<Bytes> {
        let mut replies = Vec::new();

        for body in self.buffer.push(chunk) {
            let Some(command) = Response::decode(&body) else {
                tracing::debug!("[SIM DEVICE] Undecodable body: {}", HexBytes(&body));
                continue;
            };

            tracing::debug!(
                "[SIM DEVICE] Command {:#04x}/{:#04x} SEQ={} data={}",
                command.device_id,
                command.command_id,
                command.sequence,
                HexBytes(command.data())
            );

            self.apply(&command);

            if !self.silent {
                replies.push(self.reply_to(&command));
            }
            self.received.push(command);
        }

        replies
    }

    fn apply(&mut self, command: &Response) {
        let data = command.data();
        match command.key() {
            commands::SET_MAIN_LED => {
                if let Some(rgb) = rgb(data) {
                    self.leds.main = Some(rgb);
                }
            }
            commands::SET_LED_MASK => {
                if let Some((&mask, values)) = data.split_first() {
                    self.leds.mask = mask;
                    self.leds.mask_values = values.to_vec();
                    self.leds.mask_target = Some(command.target_id.unwrap_or(PRIMARY_PROCESSOR));
                }
            }
            commands::SET_MATRIX_COLOR => {
                if command.target_id.is_some_and(|t| t != SECONDARY_PROCESSOR) {
                    tracing::warn!(
                        "[SIM DEVICE] Matrix command addressed to {:#04x}",
                        command.target_id.unwrap_or_default()
                    );
                }
                if let Some(rgb) = rgb(data) {
                    self.leds.matrix = Some(rgb);
                }
            }
            _ => {}
        }
    }

    fn reply_to(&self, command: &Response) -> Bytes {
        let mut body = Vec::with_capacity(5 + self.reply_data.len());
        body.push(flags::ACTIVITY_RESPONSE);
        body.push(command.device_id);
        body.push(command.command_id);
        body.push(command.sequence);
        body.push(self.status);
        body.extend_from_slice(&self.reply_data);
        seal(&body)
    }
}

fn rgb(data: &[u8]) -> Option<[u8; 3]> {
    match data {
        [r, g, b, ..] => Some([*r, *g, *b]),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Command, FrameBuffer};

    fn decode_all(frames: &[Bytes]) -> Vec<Response> {
        let mut buffer = FrameBuffer::new();
        frames
            .iter()
            .flat_map(|f| buffer.push(f))
            .filter_map(|body| Response::decode(&body))
            .collect()
    }

    #[test]
    fn test_replies_with_echoed_ids() {
        let mut device = SimulatedDevice::new();
        let frame = Command::new(0x02, 0x20).payload(&[10, 20, 30]).encode(7);

        let replies = device.receive(&frame);
        let decoded = decode_all(&replies);

        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].flags, flags::ACTIVITY_RESPONSE);
        assert_eq!(decoded[0].key(), (0x02, 0x20));
        assert_eq!(decoded[0].sequence, 7);
        assert_eq!(decoded[0].status, Some(STATUS_SUCCESS));
        assert_eq!(device.leds().main, Some([10, 20, 30]));
    }

    #[test]
    fn test_fragmented_command() {
        let mut device = SimulatedDevice::new();
        let frame = Command::new(0x1A, 0x2F)
            .target(SECONDARY_PROCESSOR)
            .source(0x01)
            .payload(&[0, 255, 0])
            .encode(1);

        let mut replies = Vec::new();
        for chunk in frame.chunks(3) {
            replies.extend(device.receive(chunk));
        }

        assert_eq!(replies.len(), 1);
        assert_eq!(device.leds().matrix, Some([0, 255, 0]));
        assert_eq!(device.received()[0].target_id, Some(SECONDARY_PROCESSOR));
    }

    #[test]
    fn test_led_mask_partial() {
        let mut device = SimulatedDevice::new();
        let frame = Command::new(0x1A, 0x1C)
            .target(PRIMARY_PROCESSOR)
            .source(0x01)
            .payload(&[0x07, 0, 0, 255])
            .encode(2);

        device.receive(&frame);

        let leds = device.leds();
        assert_eq!(leds.mask, 0x07);
        assert_eq!(leds.mask_values, vec![0, 0, 255]);
        assert_eq!(leds.mask_target, Some(PRIMARY_PROCESSOR));
    }

    #[test]
    fn test_status_and_reply_data() {
        let mut device = SimulatedDevice::new();
        device.set_status(0x03);
        device.set_reply_data(&[0xAB, 0x01]);

        let replies = device.receive(&Command::new(0x13, 0x0D).encode(0));
        let decoded = decode_all(&replies);

        assert!(decoded[0].is_error());
        assert_eq!(decoded[0].data(), &[0xAB, 0x01]);
    }

    #[test]
    fn test_silent_device_records_but_does_not_reply() {
        let mut device = SimulatedDevice::new();
        device.set_silent(true);

        let replies = device.receive(&Command::new(0x02, 0x20).payload(&[1, 2, 3]).encode(0));

        assert!(replies.is_empty());
        assert_eq!(device.received().len(), 1);
        assert_eq!(device.leds().main, Some([1, 2, 3]));
    }

    #[test]
    fn test_noise_ignored() {
        let mut device = SimulatedDevice::new();

        assert!(device.receive(&[0x00, 0x8D, 0x01, 0xD8, 0x42]).is_empty());
        assert!(device.received().is_empty());
    }
}
