use serde::Deserialize;
use serde_json::{json, Value};

use super::{decode, DeviceClient, DeviceError, Record, Result};

const CREATE_OBJECTS: &str = "/create_objects.fcgi";
const MODIFY_OBJECTS: &str = "/modify_objects.fcgi";
const DESTROY_OBJECTS: &str = "/destroy_objects.fcgi";
const LOAD_OBJECTS: &str = "/load_objects.fcgi";

pub const USERS: &str = "users";
pub const GROUPS: &str = "groups";
pub const USER_GROUPS: &str = "user_groups";

/// Optional parts of a `load_objects` request. Unset parts are left out of
/// the request entirely.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub fields: Option<Vec<String>>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub filter: Option<Record>,
}

impl LoadOptions {
    pub fn filter(filter: Record) -> Self {
        Self {
            filter: Some(filter),
            ..Self::default()
        }
    }

    fn into_payload(self, collection: &str) -> Record {
        let mut payload = Record::new();
        payload.insert("object".into(), json!(collection));
        if let Some(fields) = self.fields.filter(|f| !f.is_empty()) {
            payload.insert("fields".into(), json!(fields));
        }
        if let Some(limit) = self.limit {
            payload.insert("limit".into(), json!(limit));
        }
        if let Some(offset) = self.offset {
            payload.insert("offset".into(), json!(offset));
        }
        if let Some(filter) = self.filter.filter(|f| !f.is_empty()) {
            payload.insert("where".into(), envelope(collection, filter));
        }
        payload
    }
}

/// The device expects filters keyed by the collection they apply to.
fn envelope(collection: &str, predicate: Record) -> Value {
    json!({ collection: predicate })
}

fn id_filter(id: i64) -> Record {
    let mut filter = Record::new();
    filter.insert("id".into(), json!(id));
    filter
}

impl DeviceClient {
    /// Create `values` in one batch. Ids come back in input order; a reply
    /// without ids means nothing was created.
    pub async fn create_objects(&mut self, collection: &str, values: Vec<Record>) -> Result<Vec<i64>> {
        #[derive(Deserialize)]
        struct CreateResponse {
            #[serde(default)]
            ids: Option<Vec<i64>>,
        }

        let payload = json!({ "object": collection, "values": values });
        let data = self.post_json(CREATE_OBJECTS, &payload).await?;
        let reply: CreateResponse = decode(CREATE_OBJECTS, &data)?;
        Ok(reply.ids.unwrap_or_default())
    }

    /// Set `values` on every record matching `predicate`. Returns the count
    /// the device reports, zero included.
    pub async fn modify_objects(
        &mut self,
        collection: &str,
        values: Record,
        predicate: Record,
    ) -> Result<u64> {
        #[derive(Deserialize)]
        struct ModifyResponse {
            #[serde(default)]
            modified: u64,
        }

        let payload = json!({
            "object": collection,
            "values": values,
            "where": envelope(collection, predicate),
        });
        let data = self.post_json(MODIFY_OBJECTS, &payload).await?;
        let reply: ModifyResponse = decode(MODIFY_OBJECTS, &data)?;
        Ok(reply.modified)
    }

    pub async fn destroy_objects(&mut self, collection: &str, predicate: Record) -> Result<u64> {
        #[derive(Deserialize)]
        struct DestroyResponse {
            #[serde(default)]
            destroyed: u64,
        }

        let payload = json!({
            "object": collection,
            "where": envelope(collection, predicate),
        });
        let data = self.post_json(DESTROY_OBJECTS, &payload).await?;
        let reply: DestroyResponse = decode(DESTROY_OBJECTS, &data)?;
        Ok(reply.destroyed)
    }

    pub async fn load_objects(&mut self, collection: &str, options: LoadOptions) -> Result<Vec<Record>> {
        #[derive(Deserialize)]
        struct LoadResponse {
            #[serde(default)]
            objects: Vec<Record>,
        }

        let payload = options.into_payload(collection);
        let data = self.post_json(LOAD_OBJECTS, &payload).await?;
        let reply: LoadResponse = decode(LOAD_OBJECTS, &data)?;
        Ok(reply.objects)
    }

    // -- Users ------------------------------------------------------------------

    /// Create one user. `extra` fields are sent as given and win over
    /// `registration` and `name` on a clash.
    pub async fn create_user(&mut self, registration: &str, name: &str, extra: Record) -> Result<i64> {
        let mut values = Record::new();
        values.insert("registration".into(), json!(registration));
        values.insert("name".into(), json!(name));
        values.extend(extra);

        let ids = self.create_objects(USERS, vec![values]).await?;
        ids.first().copied().ok_or_else(|| {
            DeviceError::EmptyResult(format!(
                "failed to create user {registration:?}: no id returned"
            ))
        })
    }

    pub async fn update_user(&mut self, id: i64, fields: Record) -> Result<()> {
        let modified = self.modify_objects(USERS, fields, id_filter(id)).await?;
        if modified == 0 {
            return Err(DeviceError::EmptyResult(format!(
                "no user modified when updating id {id}"
            )));
        }
        Ok(())
    }

    pub async fn delete_user(&mut self, id: i64) -> Result<()> {
        let destroyed = self.destroy_objects(USERS, id_filter(id)).await?;
        if destroyed == 0 {
            return Err(DeviceError::EmptyResult(format!(
                "no user removed when deleting id {id}"
            )));
        }
        Ok(())
    }

    pub async fn list_users(&mut self, filters: Record) -> Result<Vec<Record>> {
        self.load_objects(USERS, LoadOptions::filter(filters)).await
    }

    // -- Groups -----------------------------------------------------------------

    pub async fn create_group(&mut self, name: &str) -> Result<i64> {
        let mut values = Record::new();
        values.insert("name".into(), json!(name));

        let ids = self.create_objects(GROUPS, vec![values]).await?;
        ids.first().copied().ok_or_else(|| {
            DeviceError::EmptyResult(format!("failed to create group {name:?}: no id returned"))
        })
    }

    pub async fn add_user_to_group(&mut self, user_id: i64, group_id: i64) -> Result<()> {
        let mut values = Record::new();
        values.insert("user_id".into(), json!(user_id));
        values.insert("group_id".into(), json!(group_id));

        let ids = self.create_objects(USER_GROUPS, vec![values]).await?;
        if ids.is_empty() {
            return Err(DeviceError::EmptyResult(format!(
                "user {user_id} was not added to group {group_id}"
            )));
        }
        Ok(())
    }
}
