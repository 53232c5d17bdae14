//! Scripted in-memory [`RescueApi`] and a collecting emitter for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use rescue_tap_types::catalog::Schema;
use rescue_tap_types::error::ConnectorError;
use rescue_tap_types::message::Message;
use rescue_tap_types::state::TapState;

use crate::client::{RescueApi, TechnicianPage};
use crate::emitter::RecordEmitter;
use crate::primary::TechnicianId;
use crate::report::{Record, Report, ReportArea, SyncWindow};

/// Mock client that replays scripted pages and reports and records every
/// request it receives.
#[derive(Default)]
pub(crate) struct MockApi {
    pages: Mutex<VecDeque<TechnicianPage>>,
    technicians_error: Option<ConnectorError>,
    reports: HashMap<TechnicianId, Report>,
    report_errors: HashMap<TechnicianId, ConnectorError>,
    page_requests: Mutex<Vec<Option<String>>>,
    report_requests: Mutex<Vec<(TechnicianId, SyncWindow)>>,
}

impl MockApi {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_pages(mut self, pages: Vec<TechnicianPage>) -> Self {
        self.pages = Mutex::new(pages.into());
        self
    }

    pub(crate) fn failing_technicians(mut self, err: ConnectorError) -> Self {
        self.technicians_error = Some(err);
        self
    }

    /// Script a tab-delimited report for `id`. Unscripted ids answer with
    /// no data.
    pub(crate) fn with_report(mut self, id: TechnicianId, table: &str) -> Self {
        self.reports.insert(id, Report::parse(table));
        self
    }

    pub(crate) fn failing_report(mut self, id: TechnicianId, err: ConnectorError) -> Self {
        self.report_errors.insert(id, err);
        self
    }

    pub(crate) fn page_requests(&self) -> Vec<Option<String>> {
        self.page_requests.lock().unwrap().clone()
    }

    /// Technician ids of every report request, in call order.
    pub(crate) fn report_calls(&self) -> Vec<TechnicianId> {
        self.report_requests
            .lock()
            .unwrap()
            .iter()
            .map(|(id, _)| *id)
            .collect()
    }

    pub(crate) fn report_windows(&self) -> Vec<SyncWindow> {
        self.report_requests
            .lock()
            .unwrap()
            .iter()
            .map(|(_, w)| *w)
            .collect()
    }
}

#[async_trait]
impl RescueApi for MockApi {
    async fn fetch_technicians(&self, page: Option<&str>) -> Result<TechnicianPage, ConnectorError> {
        self.page_requests
            .lock()
            .unwrap()
            .push(page.map(str::to_string));
        if let Some(err) = &self.technicians_error {
            return Err(err.clone());
        }
        Ok(self.pages.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn fetch_report(
        &self,
        _area: ReportArea,
        technician: TechnicianId,
        window: &SyncWindow,
    ) -> Result<Option<Report>, ConnectorError> {
        self.report_requests
            .lock()
            .unwrap()
            .push((technician, *window));
        if let Some(err) = self.report_errors.get(&technician) {
            return Err(err.clone());
        }
        Ok(self
            .reports
            .get(&technician)
            .filter(|r| !r.is_empty())
            .cloned())
    }
}

/// Emitter that keeps every message in memory.
#[derive(Debug, Default)]
pub(crate) struct CollectingEmitter {
    pub(crate) messages: Vec<Message>,
}

impl RecordEmitter for CollectingEmitter {
    fn write_schema(
        &mut self,
        stream: &str,
        schema: &Schema,
        key_properties: &[String],
    ) -> crate::error::Result<()> {
        self.messages.push(Message::Schema {
            stream: stream.to_string(),
            schema: schema.clone(),
            key_properties: key_properties.to_vec(),
        });
        Ok(())
    }

    fn write_record(&mut self, stream: &str, record: Record) -> crate::error::Result<()> {
        self.messages.push(Message::Record {
            stream: stream.to_string(),
            record,
            time_extracted: None,
        });
        Ok(())
    }

    fn write_state(&mut self, state: &TapState) -> crate::error::Result<()> {
        self.messages.push(Message::State {
            value: state.clone(),
        });
        Ok(())
    }
}
