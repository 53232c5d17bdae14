//! LogMeIn Rescue API client.
//!
//! The Rescue API answers plain text: a status line (`OK` on success)
//! followed by an optional tab-delimited table. Requests are issued one at a
//! time; nothing here retries.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use tokio::sync::OnceCell;

use rescue_tap_types::error::ConnectorError;

use crate::config::Config;
use crate::primary::TechnicianId;
use crate::report::{Record, Report, ReportArea, SyncWindow};

const MAX_LOG_BODY_CHARS: usize = 512;
const REPORT_DATE_FMT: &str = "%m/%d/%Y %H:%M:%S";
const TECHNICIAN_NODE_TYPE: &str = "Technician";

/// Status lines meaning the session or credentials were rejected.
const AUTH_STATUSES: &[&str] = &[
    "INVALID",
    "INVALID_SECRETAUTHCODE",
    "INVALIDAUTHCODE",
    "NOTLOGGEDIN",
    "USER_DELETED_OR_DISABLED",
];

/// Status lines meaning "nothing for this node", not a failure.
const NO_DATA_STATUSES: &[&str] = &["NODATA", "NOTECHNICIAN", "INVALID_NODE"];

/// One page of primary-entity records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TechnicianPage {
    pub records: Vec<Record>,
    /// Token for the following page; `None` means end of data.
    pub next_page: Option<String>,
}

/// Remote operations the tap needs.
///
/// Implementations raise on transport or auth failure and return an empty
/// result, not an error, when a node simply has no data.
#[async_trait]
pub trait RescueApi: Send + Sync {
    /// Fetch one page of technicians. `page` is the token from the previous
    /// page, `None` for the first.
    async fn fetch_technicians(&self, page: Option<&str>) -> Result<TechnicianPage, ConnectorError>;

    /// Fetch one technician's report for `area` over `window`.
    ///
    /// `Ok(None)` means the technician has no rows in the window.
    async fn fetch_report(
        &self,
        area: ReportArea,
        technician: TechnicianId,
        window: &SyncWindow,
    ) -> Result<Option<Report>, ConnectorError>;
}

/// Parsed reply of a single API call.
#[derive(Debug, PartialEq, Eq)]
enum Reply {
    Ok(String),
    NoData,
}

fn parse_reply(endpoint: &str, body: &str) -> Result<Reply, ConnectorError> {
    let body = body.trim_start_matches('\u{feff}');
    let (status, rest) = body.split_once('\n').unwrap_or((body, ""));
    match status.trim() {
        "OK" => Ok(Reply::Ok(rest.to_string())),
        s if NO_DATA_STATUSES.contains(&s) => Ok(Reply::NoData),
        s if AUTH_STATUSES.contains(&s) => Err(ConnectorError::auth(
            s,
            format!("{endpoint} rejected the session: {s}"),
        )),
        "" => Err(ConnectorError::data(
            "EMPTY_RESPONSE",
            format!("{endpoint} returned an empty body"),
        )),
        s => Err(ConnectorError::data(
            "UNEXPECTED_STATUS",
            format!("{endpoint} returned status '{s}'"),
        )),
    }
}

fn preview(body: &str) -> String {
    let mut preview = body.chars().take(MAX_LOG_BODY_CHARS).collect::<String>();
    if body.chars().count() > MAX_LOG_BODY_CHARS {
        preview.push_str("...");
    }
    preview
}

fn normalize(column: &str) -> String {
    column
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn column<'a>(row: &'a Record, names: &[&str]) -> Option<&'a str> {
    row.iter()
        .find(|(k, _)| names.contains(&normalize(k).as_str()))
        .and_then(|(_, v)| v.as_str())
}

fn parse_node_id(raw: &str, field: &str) -> Result<i64, ConnectorError> {
    raw.trim().parse::<i64>().map_err(|_| {
        ConnectorError::data("BAD_NODE_ID", format!("{field} '{raw}' is not an integer"))
    })
}

/// Map a hierarchy row to a technician record. Non-technician nodes are
/// skipped.
fn technician_from_row(row: &Record) -> Result<Option<Record>, ConnectorError> {
    let is_technician = column(row, &["type", "nodetype"])
        .is_some_and(|t| t.eq_ignore_ascii_case(TECHNICIAN_NODE_TYPE));
    if !is_technician {
        return Ok(None);
    }

    let id = column(row, &["nodeid", "id"]).ok_or_else(|| {
        ConnectorError::data("MISSING_NODE_ID", "hierarchy row has no node id column")
    })?;
    let parent_id = column(row, &["parentid"])
        .map(|p| parse_node_id(p, "parent id"))
        .transpose()?;

    let text = |names: &[&str]| column(row, names).map_or(Value::Null, |s| Value::from(s));

    let mut record = Record::new();
    record.insert("id".into(), Value::from(parse_node_id(id, "node id")?));
    record.insert("name".into(), text(&["name"]));
    record.insert("nickname".into(), text(&["nickname"]));
    record.insert("email".into(), text(&["email"]));
    record.insert("type".into(), text(&["type", "nodetype"]));
    record.insert("status".into(), text(&["status"]));
    record.insert("description".into(), text(&["description"]));
    record.insert("parent_id".into(), parent_id.map_or(Value::Null, Value::from));
    Ok(Some(record))
}

/// HTTP client for the Rescue text API.
///
/// Logs in lazily on first use and reuses the auth code for the rest of the
/// run.
#[derive(Debug)]
pub struct RescueClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    auth_code: OnceCell<String>,
}

impl RescueClient {
    /// Build a client from tap config.
    ///
    /// # Errors
    ///
    /// Returns a config-category error if the HTTP client can't be built.
    pub fn new(config: &Config) -> Result<Self, ConnectorError> {
        let mut builder =
            reqwest::Client::builder().timeout(Duration::from_secs(config.request_timeout_secs));
        if let Some(agent) = &config.user_agent {
            builder = builder.user_agent(agent.clone());
        }
        let http = builder
            .build()
            .map_err(|e| ConnectorError::config("HTTP_CLIENT", e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
            auth_code: OnceCell::new(),
        })
    }

    /// Issue a GET and return the body of a 2xx response.
    async fn send(&self, endpoint: &str, params: &[(&str, String)]) -> Result<String, ConnectorError> {
        let url = format!("{}/{endpoint}", self.base_url);
        tracing::debug!(endpoint, "Rescue API request");

        // without_url: the query string can carry credentials
        let response = self
            .http
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|e| {
                ConnectorError::transient_network(
                    "REQUEST_FAILED",
                    format!("{endpoint}: {}", e.without_url()),
                )
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ConnectorError::transient_network(
                "BODY_READ_FAILED",
                format!("{endpoint}: {}", e.without_url()),
            )
        })?;

        if status.is_success() {
            return Ok(body);
        }

        tracing::debug!(endpoint, %status, body = %preview(&body), "Rescue API error response");
        let message = format!("{endpoint} returned HTTP {status}");
        let err = if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            ConnectorError::auth("HTTP_STATUS", message)
        } else {
            ConnectorError::transient_network("HTTP_STATUS", message)
        };
        Err(err.with_status(status.as_u16()))
    }

    async fn login(&self) -> Result<String, ConnectorError> {
        let endpoint = "requestAuthCode.aspx";
        let body = self
            .send(
                endpoint,
                &[("email", self.username.clone()), ("pwd", self.password.clone())],
            )
            .await?;

        let Reply::Ok(rest) = parse_reply(endpoint, &body)? else {
            return Err(ConnectorError::auth("NO_AUTHCODE", "login returned no data"));
        };
        let code = rest
            .lines()
            .find_map(|line| line.trim().strip_prefix("AUTHCODE:"))
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .ok_or_else(|| {
                ConnectorError::data("NO_AUTHCODE", "login response carried no AUTHCODE line")
            })?;

        tracing::info!(username = %self.username, "Authenticated with LogMeIn Rescue");
        Ok(code.to_string())
    }

    async fn auth_code(&self) -> Result<&str, ConnectorError> {
        self.auth_code
            .get_or_try_init(|| self.login())
            .await
            .map(String::as_str)
    }

    /// Authenticated call returning the parsed reply.
    async fn call(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Reply, ConnectorError> {
        let mut all = Vec::with_capacity(params.len() + 1);
        all.extend_from_slice(params);
        all.push(("authcode", self.auth_code().await?.to_string()));
        let body = self.send(endpoint, &all).await?;
        parse_reply(endpoint, &body)
    }
}

#[async_trait]
impl RescueApi for RescueClient {
    async fn fetch_technicians(&self, page: Option<&str>) -> Result<TechnicianPage, ConnectorError> {
        // The hierarchy comes back whole; there is never a second page.
        if page.is_some() {
            return Ok(TechnicianPage::default());
        }

        let table = match self.call("getHierarchy_v2.aspx", &[]).await? {
            Reply::Ok(table) => table,
            Reply::NoData => return Ok(TechnicianPage::default()),
        };

        let mut records = Vec::new();
        for row in Report::parse(&table).records() {
            if let Some(record) = technician_from_row(&row)? {
                records.push(record);
            }
        }
        tracing::debug!(technicians = records.len(), "Parsed technician hierarchy");

        Ok(TechnicianPage {
            records,
            next_page: None,
        })
    }

    async fn fetch_report(
        &self,
        area: ReportArea,
        technician: TechnicianId,
        window: &SyncWindow,
    ) -> Result<Option<Report>, ConnectorError> {
        self.call("setReportArea.aspx", &[("area", area.code().to_string())])
            .await?;
        self.call(
            "setReportDate_v2.aspx",
            &[
                ("bdate", window.start.format(REPORT_DATE_FMT).to_string()),
                ("edate", window.end.format(REPORT_DATE_FMT).to_string()),
            ],
        )
        .await?;
        self.call("setOutput.aspx", &[("output", "TEXT".to_string())])
            .await?;

        let reply = self
            .call(
                "getReport_v2.aspx",
                &[
                    ("node", technician.to_string()),
                    ("nodetype", "NODE".to_string()),
                ],
            )
            .await?;

        let Reply::Ok(table) = reply else {
            return Ok(None);
        };
        let report = Report::parse(&table);
        Ok((!report.is_empty()).then_some(report))
    }
}
