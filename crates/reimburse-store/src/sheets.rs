use reimburse_core::{CellRef, Sheet};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{RecordStore, StoreError};

pub const DEFAULT_API_BASE: &str = "https://sheets.googleapis.com/v4";

/// Worksheet in a Google spreadsheet, accessed over the Sheets v4 REST API.
///
/// Authorization is the caller's concern: the store is handed a bearer token
/// that is already valid for the spreadsheet.
pub struct GoogleSheetsStore {
    client: Client,
    api_base: Url,
    spreadsheet_id: String,
    worksheet: String,
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValueUpdate<'a> {
    range: &'a str,
    major_dimension: &'static str,
    values: [[&'a str; 1]; 1],
}

impl GoogleSheetsStore {
    pub fn new(
        api_base: &str,
        spreadsheet_id: &str,
        worksheet: &str,
        access_token: &str,
    ) -> Result<Self, StoreError> {
        let api_base = Url::parse(api_base.trim_end_matches('/'))
            .map_err(|e| StoreError::Config(format!("api base {api_base:?}: {e}")))?;
        if api_base.cannot_be_a_base() {
            return Err(StoreError::Config(format!("api base {api_base} is not a base URL")));
        }
        Ok(Self {
            client: Client::new(),
            api_base,
            spreadsheet_id: spreadsheet_id.to_string(),
            worksheet: worksheet.to_string(),
            access_token: access_token.to_string(),
        })
    }

    fn with_auth(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.bearer_auth(&self.access_token)
    }

    /// `.../spreadsheets/{id}/values/{range}`
    pub(crate) fn values_url(&self, range: &str) -> Url {
        let mut url = self.api_base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["spreadsheets", self.spreadsheet_id.as_str(), "values", range]);
        }
        url
    }

    /// A1 range for the whole worksheet or a single cell of it.
    pub(crate) fn range(&self, cell: Option<CellRef>) -> String {
        let tab = format!("'{}'", self.worksheet.replace('\'', "''"));
        match cell {
            Some(cell) => format!("{tab}!{}{}", column_letters(cell.column), cell.row),
            None => tab,
        }
    }
}

impl RecordStore for GoogleSheetsStore {
    fn read_sheet(&self) -> Result<Sheet, StoreError> {
        let url = self.values_url(&self.range(None));
        let resp = self
            .with_auth(self.client.get(url))
            .send()
            .map_err(|e| StoreError::Unavailable(format!("connection failed: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(StoreError::Unavailable(describe_failure(status, &body)));
        }
        let range: ValueRange = resp
            .json()
            .map_err(|e| StoreError::Unavailable(format!("bad response body: {e}")))?;
        let grid = range
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect();
        Ok(Sheet::from_grid(grid))
    }

    fn update_cell(&self, cell: CellRef, value: &str) -> Result<(), StoreError> {
        if cell.row == 0 || cell.column == 0 {
            return Err(StoreError::WriteRejected(format!(
                "cell ({}, {}) is out of range",
                cell.row, cell.column
            )));
        }
        let range = self.range(Some(cell));
        let mut url = self.values_url(&range);
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");
        let body = ValueUpdate {
            range: &range,
            major_dimension: "ROWS",
            values: [[value]],
        };
        let resp = self
            .with_auth(self.client.put(url).json(&body))
            .send()
            .map_err(|e| StoreError::WriteRejected(format!("connection failed: {e}")))?;
        let status = resp.status();
        if status.is_success() {
            tracing::debug!(%range, "cell updated");
            Ok(())
        } else {
            let body = resp.text().unwrap_or_default();
            Err(StoreError::WriteRejected(describe_failure(status, &body)))
        }
    }

    fn describe(&self) -> String {
        format!("sheets:{}/{}", self.spreadsheet_id, self.worksheet)
    }
}

fn describe_failure(status: StatusCode, body: &str) -> String {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string());
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            format!("authorization rejected ({status}): {detail}")
        }
        StatusCode::NOT_FOUND => format!("spreadsheet or worksheet not found: {detail}"),
        _ => format!("{status}: {detail}"),
    }
}

/// Formatted values arrive as strings; anything else is rendered as JSON text.
fn cell_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Spreadsheet column letters for a 1-based column number: 1 is A, 27 is AA.
pub fn column_letters(mut column: u32) -> String {
    let mut letters = Vec::new();
    while column > 0 {
        let rem = (column - 1) % 26;
        letters.push(b'A' + rem as u8);
        column = (column - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(worksheet: &str) -> GoogleSheetsStore {
        GoogleSheetsStore::new(DEFAULT_API_BASE, "abc123", worksheet, "token").unwrap()
    }

    #[test]
    fn column_letters_cover_multi_letter_columns() {
        assert_eq!(column_letters(1), "A");
        assert_eq!(column_letters(10), "J");
        assert_eq!(column_letters(26), "Z");
        assert_eq!(column_letters(27), "AA");
        assert_eq!(column_letters(52), "AZ");
        assert_eq!(column_letters(53), "BA");
        assert_eq!(column_letters(702), "ZZ");
        assert_eq!(column_letters(703), "AAA");
        assert_eq!(column_letters(0), "");
    }

    #[test]
    fn range_quotes_worksheet_name() {
        let s = store("Form Responses 1");
        assert_eq!(s.range(None), "'Form Responses 1'");
        assert_eq!(s.range(Some(CellRef::new(5, 7))), "'Form Responses 1'!G5");
        assert_eq!(store("Bob's").range(None), "'Bob''s'");
    }

    #[test]
    fn values_url_appends_segments() {
        let s = store("Sheet1");
        let url = s.values_url(&s.range(Some(CellRef::new(2, 1))));
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/abc123/values/'Sheet1'!A2"
        );
    }

    #[test]
    fn trailing_slash_in_api_base_is_ignored() {
        let s = GoogleSheetsStore::new("http://127.0.0.1:9/v4/", "id", "S", "t").unwrap();
        assert_eq!(
            s.values_url("'S'").as_str(),
            "http://127.0.0.1:9/v4/spreadsheets/id/values/'S'"
        );
    }

    #[test]
    fn value_update_body_shape() {
        let body = ValueUpdate {
            range: "'Sheet1'!G2",
            major_dimension: "ROWS",
            values: [["Approved"]],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["majorDimension"], "ROWS");
        assert_eq!(json["values"][0][0], "Approved");
    }

    #[test]
    fn failure_messages_classify_auth() {
        let msg = describe_failure(
            StatusCode::FORBIDDEN,
            r#"{"error":{"message":"The caller does not have permission"}}"#,
        );
        assert!(msg.starts_with("authorization rejected"));
        assert!(msg.contains("does not have permission"));
    }

    #[test]
    fn non_string_cells_are_stringified() {
        assert_eq!(cell_text(serde_json::json!(1500)), "1500");
        assert_eq!(cell_text(serde_json::Value::Null), "");
        assert_eq!(cell_text(serde_json::json!("x")), "x");
    }

    #[test]
    fn unreachable_api_is_unavailable() {
        // Port 9 (discard) on loopback is not expected to speak HTTP.
        let s = GoogleSheetsStore::new("http://127.0.0.1:9/v4", "id", "S", "t").unwrap();
        assert!(matches!(s.read_sheet(), Err(StoreError::Unavailable(_))));
    }
}
