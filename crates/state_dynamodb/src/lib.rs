use async_trait::async_trait;
use aws_sdk_dynamodb::operation::get_item::GetItemOutput;
use aws_sdk_dynamodb::types::AttributeValue;
use model::EndpointRecord;
use serde::{Deserialize, Serialize};
use state::StateOperation::{Clear, Get, Set};
use state::{EndpointStore, StateError};
use std::collections::HashMap;

const INSTALLATION_ID: &str = "installation_id";

/// Table item holding the endpoint record of one installation.
#[derive(Debug, Serialize, Deserialize)]
struct EndpointItem {
    installation_id: String,
    endpoint_arn: String,
    token: String,
    enabled: bool,
}

/// Endpoint store keeping one item per installation in a DynamoDB table.
/// `PutItem` replaces the whole item, so writes are atomic.
#[derive(Clone, Debug)]
pub struct DynamoDbEndpointStore {
    table_name: String,
    installation_id: String,
    dynamodb_client: aws_sdk_dynamodb::Client,
    consistent_read: bool,
}

impl DynamoDbEndpointStore {
    pub fn new(
        dynamodb_client: aws_sdk_dynamodb::Client,
        table_name: impl Into<String>,
        installation_id: impl Into<String>,
    ) -> Self {
        DynamoDbEndpointStore {
            table_name: table_name.into(),
            installation_id: installation_id.into(),
            dynamodb_client,
            consistent_read: true,
        }
    }

    pub fn with_consistent_read(mut self, consistent_read: bool) -> Self {
        self.consistent_read = consistent_read;
        self
    }

    fn key(&self) -> HashMap<String, AttributeValue> {
        HashMap::from([(
            INSTALLATION_ID.to_string(),
            AttributeValue::S(self.installation_id.clone()),
        )])
    }
}

#[async_trait]
impl EndpointStore for DynamoDbEndpointStore {
    async fn get(&self) -> Result<Option<EndpointRecord>, StateError> {
        let output: GetItemOutput = self
            .dynamodb_client
            .get_item()
            .table_name(&self.table_name)
            .consistent_read(self.consistent_read)
            .set_key(Some(self.key()))
            .send()
            .await
            .map_err(|err| StateError::backend(&self.installation_id, Get, err))?;

        let Some(item) = output.item else {
            return Ok(None);
        };

        let item: EndpointItem = serde_dynamo::from_item(item)
            .map_err(|err| StateError::corrupt(&self.installation_id, err))?;

        Ok(Some(EndpointRecord {
            endpoint_arn: item.endpoint_arn,
            token: item.token,
            enabled: item.enabled,
        }))
    }

    async fn set(&self, record: EndpointRecord) -> Result<(), StateError> {
        let item: HashMap<String, AttributeValue> = serde_dynamo::to_item(EndpointItem {
            installation_id: self.installation_id.clone(),
            endpoint_arn: record.endpoint_arn,
            token: record.token,
            enabled: record.enabled,
        })
        .map_err(|err| StateError::backend(&self.installation_id, Set, err))?;

        self.dynamodb_client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|err| StateError::backend(&self.installation_id, Set, err))?;

        tracing::debug!(
            installation_id = %self.installation_id,
            table_name = %self.table_name,
            "Stored endpoint record"
        );

        Ok(())
    }

    async fn clear(&self) -> Result<(), StateError> {
        self.dynamodb_client
            .delete_item()
            .table_name(&self.table_name)
            .set_key(Some(self.key()))
            .send()
            .await
            .map_err(|err| StateError::backend(&self.installation_id, Clear, err))?;

        Ok(())
    }
}
