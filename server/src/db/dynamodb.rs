use anyhow::Context;
use async_trait::async_trait;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::types::{
    AttributeDefinition, BillingMode, GlobalSecondaryIndex, KeySchemaElement, KeyType,
    Projection, ProjectionType, ScalarAttributeType,
};
use tracing::{debug, info};

use super::codec::describe_key;
use super::queries::{self, key_condition, pk_sk_key};
use super::{Index, Item, PK_ATTR, PrimaryKey, Query, SK_ATTR, ScanFilter, StorageClient};
use crate::error::{Error, Result};

/// `StorageClient` over one DynamoDB table with four GSIs.
pub struct DynamoStore {
    client: Client,
}

impl DynamoStore {
    /// Builds a client from the standard AWS environment. `endpoint` points
    /// the client at a local DynamoDB instead of the regional service.
    pub async fn connect(endpoint: Option<&str>) -> Result<Self> {
        let sdk_config = aws_config::load_from_env().await;
        let client = match endpoint {
            Some(url) => {
                let config = aws_sdk_dynamodb::config::Builder::from(&sdk_config)
                    .endpoint_url(url)
                    .build();
                info!("Initialized DynamoDB client against endpoint {}", url);
                Client::from_conf(config)
            }
            None => {
                info!("Initialized DynamoDB client");
                Client::new(&sdk_config)
            }
        };
        Ok(Self { client })
    }

    /// Creates the table with its indexes unless it already exists.
    pub async fn ensure_table(&self, table_name: &str) -> Result<()> {
        match self
            .client
            .describe_table()
            .table_name(table_name)
            .send()
            .await
        {
            Ok(_) => {
                debug!("Table {} already exists", table_name);
                return Ok(());
            }
            Err(e) => {
                // LocalStack and DynamoDB Local disagree on the error type here
                debug!(
                    "Table {} does not exist (error: {}), creating it",
                    table_name, e
                );
            }
        }

        info!("Creating DynamoDB table: {}", table_name);

        let mut request = self
            .client
            .create_table()
            .table_name(table_name)
            .attribute_definitions(string_attribute(PK_ATTR)?)
            .attribute_definitions(string_attribute(SK_ATTR)?)
            .key_schema(key_element(PK_ATTR, KeyType::Hash)?)
            .key_schema(key_element(SK_ATTR, KeyType::Range)?)
            .billing_mode(BillingMode::PayPerRequest);

        for index in Index::ALL {
            let gsi = GlobalSecondaryIndex::builder()
                .index_name(index.name())
                .key_schema(key_element(index.pk_attr(), KeyType::Hash)?)
                .key_schema(key_element(index.sk_attr(), KeyType::Range)?)
                .projection(
                    Projection::builder()
                        .projection_type(ProjectionType::All)
                        .build(),
                )
                .build()
                .context("Failed to build GSI")?;
            request = request
                .attribute_definitions(string_attribute(index.pk_attr())?)
                .attribute_definitions(string_attribute(index.sk_attr())?)
                .global_secondary_indexes(gsi);
        }

        request
            .send()
            .await
            .context("Failed to create main table")?;

        info!("Created DynamoDB table: {}", table_name);
        Ok(())
    }
}

fn string_attribute(name: &str) -> Result<AttributeDefinition> {
    let definition = AttributeDefinition::builder()
        .attribute_name(name)
        .attribute_type(ScalarAttributeType::S)
        .build()
        .with_context(|| format!("Failed to build {} attribute", name))?;
    Ok(definition)
}

fn key_element(name: &str, key_type: KeyType) -> Result<KeySchemaElement> {
    let element = KeySchemaElement::builder()
        .attribute_name(name)
        .key_type(key_type)
        .build()
        .with_context(|| format!("Failed to build {} key", name))?;
    Ok(element)
}

#[async_trait]
impl StorageClient for DynamoStore {
    async fn get(&self, table: &str, key: &PrimaryKey) -> Result<Option<Item>> {
        let response = self
            .client
            .get_item()
            .table_name(table)
            .set_key(Some(pk_sk_key(key)))
            .consistent_read(true)
            .send()
            .await
            .context("Failed to get item")?;

        Ok(response.item)
    }

    async fn put(&self, table: &str, item: Item) -> Result<()> {
        self.client
            .put_item()
            .table_name(table)
            .set_item(Some(item))
            .send()
            .await
            .context("Failed to put item")?;

        Ok(())
    }

    async fn put_if_absent(&self, table: &str, item: Item) -> Result<()> {
        let key = describe_key(&item);
        let (condition, names) = queries::not_exists_condition();

        let result = self
            .client
            .put_item()
            .table_name(table)
            .set_item(Some(item))
            .condition_expression(condition)
            .set_expression_attribute_names(Some(names))
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_conditional_check_failed_exception() {
                    debug!("Conditional put rejected for {}", key);
                    Err(Error::conflict("item"))
                } else {
                    Err(anyhow::Error::new(service_error)
                        .context("Failed to create item")
                        .into())
                }
            }
        }
    }

    async fn delete(&self, table: &str, key: &PrimaryKey) -> Result<()> {
        self.client
            .delete_item()
            .table_name(table)
            .set_key(Some(pk_sk_key(key)))
            .send()
            .await
            .context("Failed to delete item")?;

        Ok(())
    }

    async fn query(&self, table: &str, query: &Query) -> Result<Vec<Item>> {
        let expr = key_condition(query);
        let mut items = Vec::new();
        let mut start_key = None;

        loop {
            let response = self
                .client
                .query()
                .table_name(table)
                .set_index_name(query.index.map(|index| index.name().to_string()))
                .key_condition_expression(&expr.expression)
                .set_expression_attribute_names(Some(expr.names.clone()))
                .set_expression_attribute_values(Some(expr.values.clone()))
                .set_exclusive_start_key(start_key)
                .send()
                .await
                .context("Failed to query items")?;

            items.extend(response.items.unwrap_or_default());
            match response.last_evaluated_key {
                Some(last) if !last.is_empty() => start_key = Some(last),
                _ => break,
            }
        }

        debug!(
            "Query {} on {:?} returned {} items",
            query.partition,
            query.index.map(|index| index.name()),
            items.len()
        );
        Ok(items)
    }

    async fn scan(&self, table: &str, filter: Option<&ScanFilter>) -> Result<Vec<Item>> {
        let expr = filter.and_then(queries::scan_filter);
        let mut items = Vec::new();
        let mut start_key = None;

        loop {
            let mut request = self
                .client
                .scan()
                .table_name(table)
                .set_exclusive_start_key(start_key);
            if let Some(expr) = &expr {
                request = request
                    .filter_expression(&expr.expression)
                    .set_expression_attribute_names(Some(expr.names.clone()))
                    .set_expression_attribute_values(Some(expr.values.clone()));
            }

            let response = request.send().await.context("Failed to scan table")?;

            items.extend(response.items.unwrap_or_default());
            match response.last_evaluated_key {
                Some(last) if !last.is_empty() => start_key = Some(last),
                _ => break,
            }
        }

        Ok(items)
    }
}
