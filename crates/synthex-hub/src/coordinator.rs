use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use synthex_codec::{
    decode, encode_all_dump_request, encode_parameter_change, encode_program_dump,
    encode_program_request, parameter_for, CodecConfig, ParameterId, Program,
};
use synthex_frame::{RawFrame, StreamAssembler};
use synthex_transport::{DeviceId, MidiOutput, TransportError};
use tracing::{debug, info, warn};

use crate::config::CoordinatorConfig;
use crate::error::{HubError, Result};
use crate::event::{Event, EventKind, NoteEvent, ParameterChange};
use crate::hub::ChannelHub;
use crate::queue::QueueConfig;
use crate::realtime::{VoiceMessage, VoiceParser};
use crate::subscription::Subscription;

/// Everything that belongs to one connected device.
struct DeviceSession {
    codec: CodecConfig,
    assembler: StreamAssembler,
    voice: VoiceParser,
    hub: ChannelHub,
}

impl DeviceSession {
    fn new(codec: CodecConfig, config: &CoordinatorConfig) -> Self {
        Self {
            codec,
            assembler: StreamAssembler::with_config(config.frame.clone()),
            voice: VoiceParser::new(),
            hub: ChannelHub::with_config(codec.device_id, config.hub.clone()),
        }
    }

    /// Feed bytes in arrival order. Returns the number of completed frames.
    fn ingest(&mut self, bytes: &[u8]) -> usize {
        let mut frames = 0usize;
        for &byte in bytes {
            if let Some(frame) = self.assembler.push_byte(byte) {
                frames += 1;
                self.dispatch_frame(frame);
            }
            if let Some(message) = self.voice.push(byte) {
                self.dispatch_voice(message);
            }
        }
        frames
    }

    fn dispatch_frame(&self, frame: RawFrame) {
        let device = self.codec.device_id;
        if self.hub.has_subscribers(EventKind::Raw) {
            self.hub.publish(&Event::Raw(frame.clone()));
        }
        if !self.hub.has_subscribers(EventKind::Message) {
            return;
        }
        let event = match decode(&frame, &self.codec) {
            Ok(message) => {
                debug!(%device, command = %message.command(), "decoded message");
                Event::Message(Arc::new(message))
            }
            Err(error) => {
                warn!(%device, len = frame.len(), %error, "frame failed to decode");
                Event::DecodeFailed { frame, error }
            }
        };
        self.hub.publish(&event);
    }

    fn dispatch_voice(&self, message: VoiceMessage) {
        let event = match message {
            VoiceMessage::NoteOn {
                channel,
                note,
                velocity,
            } => Event::Note(NoteEvent {
                channel,
                note,
                velocity,
                on: true,
            }),
            VoiceMessage::NoteOff {
                channel,
                note,
                velocity,
            } => Event::Note(NoteEvent {
                channel,
                note,
                velocity,
                on: false,
            }),
            VoiceMessage::ControlChange {
                channel,
                controller,
                value,
            } => {
                let Some(parameter) = parameter_for(controller) else {
                    debug!(controller, "control change not mapped to a parameter");
                    return;
                };
                if !parameter.spec().contains(value) {
                    debug!(%parameter, value, "control change value out of range");
                    return;
                }
                Event::ParameterChange(ParameterChange {
                    channel,
                    parameter,
                    value,
                })
            }
        };
        self.hub.publish(&event);
    }
}

type SharedSession = Arc<Mutex<DeviceSession>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Owns one assembler and hub per device and serializes all work on them.
///
/// Each device session sits behind its own mutex: bytes for one device are
/// processed strictly in arrival order, while different devices proceed
/// independently. Sessions are created on first use.
pub struct ConnectionCoordinator {
    sessions: Mutex<HashMap<DeviceId, SharedSession>>,
    output: Option<Arc<dyn MidiOutput>>,
    config: CoordinatorConfig,
}

impl ConnectionCoordinator {
    pub fn new() -> Self {
        Self::with_config(CoordinatorConfig::default())
    }

    pub fn with_config(config: CoordinatorConfig) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            output: None,
            config,
        }
    }

    /// Attach the outbound side of the transport.
    pub fn with_output(mut self, output: Arc<dyn MidiOutput>) -> Self {
        self.output = Some(output);
        self
    }

    /// Create or reconfigure the session for `codec.device_id`.
    ///
    /// Reconfiguring keeps existing subscribers and buffered bytes.
    pub fn connect(&self, codec: CodecConfig) {
        let device = codec.device_id;
        let mut sessions = lock(&self.sessions);
        match sessions.get(&device) {
            Some(session) => lock(session).codec = codec,
            None => {
                sessions.insert(
                    device,
                    Arc::new(Mutex::new(DeviceSession::new(codec, &self.config))),
                );
            }
        }
        info!(%device, checksum = %codec.checksum_mode, "device connected");
    }

    /// Drop the session and close every subscription for `device`.
    pub fn disconnect(&self, device: DeviceId) -> bool {
        let removed = lock(&self.sessions).remove(&device);
        match removed {
            Some(session) => {
                lock(&session).hub.close_all();
                info!(%device, "device disconnected");
                true
            }
            None => false,
        }
    }

    pub fn is_connected(&self, device: DeviceId) -> bool {
        lock(&self.sessions).contains_key(&device)
    }

    pub fn devices(&self) -> Vec<DeviceId> {
        let mut devices: Vec<DeviceId> = lock(&self.sessions).keys().copied().collect();
        devices.sort();
        devices
    }

    fn session(&self, device: DeviceId) -> SharedSession {
        let mut sessions = lock(&self.sessions);
        let session = sessions.entry(device).or_insert_with(|| {
            debug!(%device, "creating device session");
            Arc::new(Mutex::new(DeviceSession::new(
                CodecConfig::new(device),
                &self.config,
            )))
        });
        Arc::clone(session)
    }

    fn existing(&self, device: DeviceId) -> Option<SharedSession> {
        lock(&self.sessions).get(&device).cloned()
    }

    /// Inbound bytes from the transport. Never blocks on consumers.
    ///
    /// Returns the number of SysEx frames completed by this chunk.
    pub fn push_bytes(&self, device: DeviceId, bytes: &[u8]) -> usize {
        let session = self.session(device);
        let frames = lock(&session).ingest(bytes);
        frames
    }

    /// Observe `kind` events for `device`, creating the session if needed.
    pub fn subscribe(&self, device: DeviceId, kind: EventKind) -> Subscription {
        let session = self.session(device);
        let subscription = lock(&session).hub.subscribe(kind);
        subscription
    }

    /// Observe several kinds for `device` through one queue in wire order.
    pub fn subscribe_many(
        &self,
        device: DeviceId,
        kinds: &[EventKind],
        queue: QueueConfig,
    ) -> Subscription {
        let session = self.session(device);
        let subscription = lock(&session).hub.subscribe_many(kinds, queue);
        subscription
    }

    pub fn subscriber_count(&self, device: DeviceId, kind: EventKind) -> usize {
        self.existing(device)
            .map(|session| lock(&session).hub.subscriber_count(kind))
            .unwrap_or(0)
    }

    /// Codec settings in effect for `device`.
    pub fn codec_config(&self, device: DeviceId) -> CodecConfig {
        self.existing(device)
            .map(|session| lock(&session).codec)
            .unwrap_or_else(|| CodecConfig::new(device))
    }

    /// Send pre-encoded bytes to `device`.
    pub fn send(&self, device: DeviceId, bytes: &[u8]) -> Result<()> {
        let output = self
            .output
            .as_ref()
            .ok_or(HubError::Transport(TransportError::NoOutput(device)))?;
        output.send(device, bytes)?;
        debug!(%device, len = bytes.len(), "sent");
        Ok(())
    }

    pub fn send_program_dump(
        &self,
        device: DeviceId,
        program: &Program,
        program_number: u8,
    ) -> Result<()> {
        let bytes = encode_program_dump(program, program_number, &self.codec_config(device))?;
        self.send(device, &bytes)
    }

    pub fn request_program(&self, device: DeviceId, program_number: u8) -> Result<()> {
        let bytes = encode_program_request(program_number, &self.codec_config(device))?;
        self.send(device, &bytes)
    }

    pub fn request_all_dump(&self, device: DeviceId) -> Result<()> {
        let bytes = encode_all_dump_request(&self.codec_config(device));
        self.send(device, &bytes)
    }

    pub fn send_parameter_change(
        &self,
        device: DeviceId,
        channel: u8,
        parameter: ParameterId,
        value: u8,
    ) -> Result<()> {
        let bytes = encode_parameter_change(channel, parameter, value)?;
        self.send(device, &bytes)
    }
}

impl Default for ConnectionCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
