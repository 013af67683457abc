//! Allow-list management

use bson::{doc, DateTime};
use tracing::info;

use crate::db::mongo::with_retry;
use crate::db::schemas::{AllowedNetworksDoc, NetworkEntryKind, ALLOWED_NETWORKS_KEY};
use crate::policy::AllowList;
use crate::types::{Result, WaypointError};

use super::Store;

impl Store {
    /// The singleton allow-list document, created empty on first read
    pub async fn allowed_networks(&self) -> Result<AllowedNetworksDoc> {
        let existing = with_retry(self.retry, || {
            self.networks.find_one(doc! { "key": ALLOWED_NETWORKS_KEY })
        })
        .await?;
        if let Some(found) = existing {
            return Ok(found);
        }

        let mut fresh = AllowedNetworksDoc::empty();
        let id = with_retry(self.retry, || self.networks.insert_one(fresh.clone())).await?;
        fresh._id = Some(id);
        info!("seeded empty network allow-list");
        Ok(fresh)
    }

    /// Compiled allow-list for policy checks
    pub async fn network_allow_list(&self) -> Result<AllowList> {
        let doc = self.allowed_networks().await?;
        Ok(AllowList::from_doc(&doc, self.settings.attendance_open))
    }

    /// Add one entry to the allow-list
    pub async fn add_network_entry(
        &self,
        kind: NetworkEntryKind,
        value: &str,
        updated_by: &str,
    ) -> Result<AllowedNetworksDoc> {
        let value = value.trim();
        if value.is_empty() {
            return Err(WaypointError::InvalidInput(
                "allow-list entry cannot be empty".into(),
            ));
        }
        let mut doc = self.allowed_networks().await?;
        if !doc.add_entry(kind, value) {
            return Ok(doc);
        }
        self.save_networks(&mut doc, updated_by).await?;
        info!(?kind, value = %value, by = %updated_by, "allow-list entry added");
        Ok(doc)
    }

    /// Remove one entry from the allow-list
    pub async fn remove_network_entry(
        &self,
        kind: NetworkEntryKind,
        value: &str,
        updated_by: &str,
    ) -> Result<AllowedNetworksDoc> {
        let mut doc = self.allowed_networks().await?;
        if !doc.remove_entry(kind, value) {
            return Err(WaypointError::NotFound(format!(
                "allow-list entry {:?}",
                value
            )));
        }
        self.save_networks(&mut doc, updated_by).await?;
        info!(?kind, value = %value, by = %updated_by, "allow-list entry removed");
        Ok(doc)
    }

    /// Replace the whole allow-list in one write
    pub async fn replace_networks(
        &self,
        mut replacement: AllowedNetworksDoc,
        updated_by: &str,
    ) -> Result<AllowedNetworksDoc> {
        // Keep the singleton key regardless of what the caller sent
        replacement.key = ALLOWED_NETWORKS_KEY.to_string();
        self.save_networks(&mut replacement, updated_by).await?;
        info!(by = %updated_by, "allow-list replaced");
        Ok(replacement)
    }

    async fn save_networks(
        &self,
        doc: &mut AllowedNetworksDoc,
        updated_by: &str,
    ) -> Result<()> {
        doc.updated_by = Some(updated_by.to_string());
        doc.updated_at = Some(DateTime::now());

        // The only skipped optionals, updated_by and updated_at, are set
        // just above, so a plain $set cannot leave stale values behind.
        // _id is immutable and must not appear in the $set document
        doc._id = None;
        let update = bson::to_document(doc)
            .map_err(|e| WaypointError::Database(format!("serialize allow-list: {}", e)))?;
        with_retry(self.retry, || {
            self.networks.upsert_one(
                doc! { "key": ALLOWED_NETWORKS_KEY },
                doc! { "$set": update.clone() },
            )
        })
        .await?;
        Ok(())
    }
}
