//! SQL Server record store over TDS.

use super::store::{ExternalRecord, RecordQuery, RecordStore};
use crate::error::RecordStoreError;
use async_trait::async_trait;
use tiberius::{Client, Config, Row};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, OnceCell};
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, info};

/// Latest reported row for an accession and test code, excluding one result
/// state. Every column is cast to text so the row maps onto plain strings.
const FIND_RECORD_SQL: &str = r#"
SELECT TOP (1)
      CAST(l.Accession AS varchar(64))                    AS accession
    , CAST(RTRIM(pd.[First Name]) AS varchar(128))        AS first_name
    , CAST(RTRIM(pd.[Last Name]) AS varchar(128))         AS last_name
    , CAST(RTRIM(pd.[Middle Initial]) AS varchar(64))     AS middle_name
    , CONVERT(varchar(33), pd.DOB, 127)                   AS dob
    , CAST(l.[Client ID] AS varchar(64))                  AS client_id
    , CAST(l.[Client Name] AS varchar(256))               AS client_name
    , CAST(l.[Phys  Name] AS varchar(256))                AS physician_name
    , CAST(RTRIM(LTRIM(l.Result)) AS varchar(64))         AS result_state
    , CAST(pd.Address AS varchar(256))                    AS address
    , CAST(pd.City AS varchar(128))                       AS city
    , CAST(pd.[State] AS varchar(32))                     AS state
    , CAST(pd.Zip AS varchar(32))                         AS zip
    , CAST(pd.Phone AS varchar(64))                       AS phone
FROM logtest_history l
JOIN PL_Patient_Demographics pd ON l.Accession = pd.Accession
WHERE l.Accession = @P1
  AND l.[Test Code] = @P2
  AND l.Result <> @P3
ORDER BY l.[Final Report Date] DESC
"#;

type TdsClient = Client<Compat<TcpStream>>;

/// Record store backed by one long-lived TDS connection.
///
/// The connection is opened on the first lookup, so a run with nothing to
/// reconcile never touches the server. A failed connect is retried on the
/// next lookup. Lookups are sequential; the mutex only satisfies `&mut`
/// access to the client from a shared handle.
pub struct MssqlRecordStore {
    config: Config,
    client: OnceCell<Mutex<TdsClient>>,
}

impl MssqlRecordStore {
    /// Parse an ADO.NET style connection string. No connection is made yet.
    pub fn new(connection_string: &str) -> Result<Self, RecordStoreError> {
        Ok(Self {
            config: Config::from_ado_string(connection_string)?,
            client: OnceCell::new(),
        })
    }

    async fn client(&self) -> Result<&Mutex<TdsClient>, RecordStoreError> {
        self.client
            .get_or_try_init(|| async {
                let addr = self.config.get_addr();
                let tcp = TcpStream::connect(addr.as_str()).await?;
                tcp.set_nodelay(true)?;
                let client = Client::connect(self.config.clone(), tcp.compat_write()).await?;

                info!(addr = %addr, "Connected to record store");
                Ok::<_, RecordStoreError>(Mutex::new(client))
            })
            .await
    }
}

#[async_trait]
impl RecordStore for MssqlRecordStore {
    async fn find_record(
        &self,
        query: &RecordQuery<'_>,
    ) -> Result<Option<ExternalRecord>, RecordStoreError> {
        let mut client = self.client().await?.lock().await;
        let row = client
            .query(
                FIND_RECORD_SQL,
                &[&query.accession, &query.external_code, &query.exclude_state],
            )
            .await?
            .into_row()
            .await?;

        debug!(
            accession = %query.accession,
            external_code = %query.external_code,
            found = row.is_some(),
            "Record store lookup"
        );

        row.map(|row| record_from_row(&row)).transpose()
    }
}

fn text(row: &Row, column: &str) -> Result<String, RecordStoreError> {
    Ok(row
        .try_get::<&str, _>(column)?
        .map(str::to_string)
        .unwrap_or_default())
}

fn record_from_row(row: &Row) -> Result<ExternalRecord, RecordStoreError> {
    Ok(ExternalRecord {
        accession: text(row, "accession")?,
        first_name: text(row, "first_name")?,
        last_name: text(row, "last_name")?,
        middle_name: text(row, "middle_name")?,
        dob: text(row, "dob")?,
        client_id: text(row, "client_id")?,
        client_name: text(row, "client_name")?,
        physician_name: text(row, "physician_name")?,
        result_state: text(row, "result_state")?,
        address: text(row, "address")?,
        city: text(row, "city")?,
        state: text(row, "state")?,
        zip: text(row, "zip")?,
        phone: text(row, "phone")?,
    })
}
