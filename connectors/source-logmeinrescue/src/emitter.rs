//! Singer message output.

use std::io::Write;

use chrono::{SecondsFormat, Utc};

use rescue_tap_types::catalog::Schema;
use rescue_tap_types::message::Message;
use rescue_tap_types::state::TapState;

use crate::error::Result;
use crate::report::Record;

/// Sink for sync output.
pub trait RecordEmitter {
    /// Announce a stream before its first record.
    ///
    /// # Errors
    ///
    /// Returns an error if the message can't be written.
    fn write_schema(&mut self, stream: &str, schema: &Schema, key_properties: &[String]) -> Result<()>;

    /// Emit one record.
    ///
    /// # Errors
    ///
    /// Returns an error if the message can't be written.
    fn write_record(&mut self, stream: &str, record: Record) -> Result<()>;

    /// Emit a state checkpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the message can't be written.
    fn write_state(&mut self, state: &TapState) -> Result<()>;
}

/// Writes one JSON message per line.
#[derive(Debug)]
pub struct SingerEmitter<W: Write> {
    out: W,
}

impl<W: Write> SingerEmitter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write(&mut self, message: &Message) -> Result<()> {
        serde_json::to_writer(&mut self.out, message)?;
        self.out.write_all(b"\n")?;
        Ok(())
    }
}

impl<W: Write> RecordEmitter for SingerEmitter<W> {
    fn write_schema(&mut self, stream: &str, schema: &Schema, key_properties: &[String]) -> Result<()> {
        self.write(&Message::Schema {
            stream: stream.to_string(),
            schema: schema.clone(),
            key_properties: key_properties.to_vec(),
        })
    }

    fn write_record(&mut self, stream: &str, record: Record) -> Result<()> {
        self.write(&Message::Record {
            stream: stream.to_string(),
            record,
            time_extracted: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)),
        })
    }

    fn write_state(&mut self, state: &TapState) -> Result<()> {
        self.write(&Message::State {
            value: state.clone(),
        })?;
        self.out.flush()?;
        Ok(())
    }
}
