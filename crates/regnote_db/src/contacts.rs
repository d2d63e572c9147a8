//! Client contact reference data.

use crate::error::Result;
use crate::types::{ClientContact, ContactKind};
use crate::LedgerDb;
use sqlx::Row;
use tracing::warn;

impl LedgerDb {
    /// List contacts, optionally for a single client.
    ///
    /// Rows with an unrecognized type are skipped with a warning rather than
    /// failing the whole load.
    pub async fn list_client_contacts(&self, client_id: Option<&str>) -> Result<Vec<ClientContact>> {
        let rows = match client_id {
            Some(client_id) => {
                sqlx::query(
                    "SELECT type_id, address, client_id FROM client_contacts WHERE client_id = ? ORDER BY client_id, type_id, address",
                )
                .bind(client_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT type_id, address, client_id FROM client_contacts ORDER BY client_id, type_id, address",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        let mut contacts = Vec::with_capacity(rows.len());
        for row in rows {
            let type_id: String = row.get("type_id");
            let address: String = row.get("address");
            let client_id: String = row.get("client_id");
            match ContactKind::parse(&type_id) {
                Some(kind) => contacts.push(ClientContact {
                    kind,
                    address,
                    client_id,
                }),
                None => warn!(client_id = %client_id, address = %address, type_id = %type_id, "Skipping contact with unknown type"),
            }
        }
        Ok(contacts)
    }

    /// Add a contact. Returns false if the same contact already exists.
    pub async fn add_client_contact(&self, contact: &ClientContact) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO client_contacts (type_id, address, client_id)
            VALUES (?, ?, ?)
            ON CONFLICT(client_id, type_id, address) DO NOTHING
            "#,
        )
        .bind(contact.kind.as_str())
        .bind(contact.address.trim())
        .bind(contact.client_id.trim())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove an address from a client, across all recipient kinds.
    ///
    /// Returns the number of rows removed.
    pub async fn remove_client_contact(&self, client_id: &str, address: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM client_contacts WHERE client_id = ? AND address = ?")
            .bind(client_id.trim())
            .bind(address.trim())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
