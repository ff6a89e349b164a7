//! Implements the `Sheet` trait using the `sheets::Client` to interact with a Google sheet.

use crate::error::Res;
use crate::store::{Sheet, TokenProvider};
use anyhow::Context;
use sheets::types::{
    DateTimeRenderOption, Dimension, InsertDataOption, ValueInputOption, ValueRange,
    ValueRenderOption,
};
use sheets::ClientError;
use tracing::{debug, trace};

/// Implements the `Sheet` trait with the Google Sheets API. It holds a `TokenProvider` on which
/// it calls refresh before each request to keep the access token up-to-date.
pub(super) struct GoogleSheet {
    spreadsheet_id: String,
    token_provider: TokenProvider,
    client: sheets::Client,
}

impl GoogleSheet {
    pub(super) async fn new(
        spreadsheet_id: impl Into<String>,
        mut token_provider: TokenProvider,
    ) -> Res<Self> {
        let client = create_sheets_client(&mut token_provider).await?;
        Ok(Self {
            spreadsheet_id: spreadsheet_id.into(),
            token_provider,
            client,
        })
    }

    /// Refreshes the sheets client with a new access token if needed
    async fn refresh_client(&mut self) -> Res<()> {
        self.client = create_sheets_client(&mut self.token_provider).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl Sheet for GoogleSheet {
    async fn get(&mut self, sheet_name: &str) -> Res<Vec<Vec<String>>> {
        trace!("get for {sheet_name}");
        self.refresh_client().await?;
        let range = format!("{sheet_name}!A:H");
        let response = self
            .client
            .spreadsheets()
            .values_get(
                &self.spreadsheet_id,
                &range,
                DateTimeRenderOption::FormattedString,
                Dimension::Rows,
                ValueRenderOption::FormattedValue,
            )
            .await
            .map_err(map_client_error)
            .with_context(|| format!("Failed to fetch {sheet_name} sheet data"))?;
        debug!(
            "Fetched {} rows from {sheet_name}",
            response.body.values.len()
        );
        Ok(response.body.values)
    }

    async fn append_rows(&mut self, sheet_name: &str, rows: &[Vec<String>]) -> Res<()> {
        if rows.is_empty() {
            return Ok(());
        }
        self.refresh_client().await?;
        let range = format!("{sheet_name}!A:H");
        trace!("append_rows for {range}");

        let body = ValueRange {
            major_dimension: Some(Dimension::Rows),
            range: range.clone(),
            values: rows.to_vec(),
        };

        // RAW keeps cells as typed: no formulas and no locale-dependent date or number parsing
        let response = self
            .client
            .spreadsheets()
            .values_append(
                &self.spreadsheet_id,
                &range,
                false,
                InsertDataOption::InsertRows,
                DateTimeRenderOption::Noop,
                ValueRenderOption::Noop,
                ValueInputOption::Raw,
                &body,
            )
            .await
            .map_err(map_client_error)
            .with_context(|| format!("Failed to append to {sheet_name}"))?;
        debug!(
            "Appended {} rows to {sheet_name} at {}",
            rows.len(),
            response.body.updates.map(|u| u.updated_range).unwrap_or_default()
        );
        Ok(())
    }
}

/// Creates a new sheets client with a refreshed access token.
async fn create_sheets_client(token_provider: &mut TokenProvider) -> Res<sheets::Client> {
    let access_token = token_provider.token_with_refresh().await?;

    // The sheets crate wants OAuth client details, but API calls only need the access token.
    // Refreshing is handled by `TokenProvider`.
    Ok(sheets::Client::new(
        String::new(),
        String::new(),
        String::new(),
        access_token.to_string(),
        String::new(),
    ))
}

fn map_client_error(e: ClientError) -> anyhow::Error {
    let error_name = match &e {
        ClientError::EmptyRefreshToken => "EmptyRefreshToken".to_string(),
        ClientError::FromUtf8Error(inner) => format!("FromUtf8Error {inner}"),
        ClientError::UrlParserError(inner) => format!("UrlParserError {inner}"),
        ClientError::SerdeJsonError(inner) => format!("SerdeJsonError {inner}"),
        ClientError::ReqwestError(inner) => format!("ReqwestError {inner}"),
        ClientError::InvalidHeaderValue(inner) => format!("InvalidHeaderValue {inner}"),
        ClientError::ReqwestMiddleWareError(inner) => format!("ReqwestMiddleWareError {inner}"),
        ClientError::HttpError { .. } => "HttpError".to_string(),
        ClientError::Other(_) => "Other".to_string(),
    };
    anyhow::Error::new(e).context(error_name)
}
