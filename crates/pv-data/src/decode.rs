//! Packet codec
//!
//! A script command is the base64 encoding of a JSON [`WirePacket`].
//! Packets too large for one script item are split over several
//! fragments; the decoded bytes of all pieces are concatenated before the
//! JSON is parsed.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use pv_core::{DeckId, EventKind, EventRecord, MediaTime, SlideScope};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::script::ScriptType;
use crate::DataError;

/// One presentation update as carried in a script command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WirePacket {
    /// Absent for single-deck recordings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deck: Option<Uuid>,
    /// Absent for updates that apply to every slide of the deck
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slide: Option<u32>,
    pub event: EventKind,
}

impl WirePacket {
    pub fn into_record(self, timestamp: MediaTime) -> EventRecord {
        let deck = self.deck.map(DeckId).unwrap_or(DeckId::NONE);
        let scope = self.slide.map(SlideScope::Slide).unwrap_or(SlideScope::AllSlides);
        EventRecord::new(timestamp, deck, scope, self.event)
    }
}

pub fn decode_command(command: &str) -> Result<Vec<u8>, DataError> {
    Ok(BASE64.decode(command.trim())?)
}

pub fn decode_packet(bytes: &[u8]) -> Result<WirePacket, DataError> {
    serde_json::from_slice(bytes).map_err(|e| DataError::MalformedPayload(e.to_string()))
}

pub fn encode_packet(packet: &WirePacket) -> Result<String, DataError> {
    Ok(BASE64.encode(serde_json::to_vec(packet)?))
}

/// Split an encoded packet into `pieces` script commands. The pieces are
/// cut on the decoded bytes so each one is valid base64 on its own.
pub fn encode_fragments(packet: &WirePacket, pieces: usize) -> Result<Vec<String>, DataError> {
    let bytes = serde_json::to_vec(packet)?;
    let size = bytes.len().div_ceil(pieces.max(1)).max(1);
    Ok(bytes.chunks(size).map(|chunk| BASE64.encode(chunk)).collect())
}

/// Rebuilds fragmented packets from script items in arrival order.
///
/// Fragments of one packet are assumed to arrive back to back; the
/// assembled packet takes the time of its first piece.
#[derive(Debug, Default)]
pub struct FragmentAssembler {
    pending: Option<(MediaTime, Vec<u8>)>,
}

impl FragmentAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one decoded command. Returns a complete packet once its last
    /// piece (or a whole packet) arrives.
    pub fn push(&mut self, script_type: ScriptType, time: MediaTime, bytes: Vec<u8>) -> Option<(MediaTime, Vec<u8>)> {
        match script_type {
            ScriptType::Fragment => {
                if let Some((_, buffer)) = &mut self.pending {
                    buffer.extend_from_slice(&bytes);
                } else {
                    self.pending = Some((time, bytes));
                }
                None
            }
            ScriptType::Whole | ScriptType::Navigation => match self.pending.take() {
                Some((first_time, mut buffer)) => {
                    buffer.extend_from_slice(&bytes);
                    Some((first_time, buffer))
                }
                None => Some((time, bytes)),
            },
        }
    }

    /// End of input. A packet still missing its last piece is dropped.
    pub fn finish(&mut self) -> bool {
        match self.pending.take() {
            Some((time, buffer)) => {
                warn!("Dropping incomplete fragmented packet at {} ({} bytes)", time, buffer.len());
                true
            }
            None => false,
        }
    }
}
