use anyhow::Context;
use arrow::{array::Array, record_batch::RecordBatch, util::display::array_value_to_string};
use async_trait::async_trait;
use serde_json::Value;
use snowflake_api::{QueryResult, SnowflakeApi, SnowflakeApiError};

use crate::{
    config::ProviderConfig,
    error::{ProviderError, Result},
    sdk::{client::QueryExecutor, record::RowSet},
    tracking::strip_tag,
};

/// [`QueryExecutor`] backed by the Snowflake SQL API with key-pair auth.
pub struct SnowflakeExecutor {
    api: SnowflakeApi,
}

impl SnowflakeExecutor {
    pub fn connect(config: &ProviderConfig) -> anyhow::Result<Self> {
        let api = SnowflakeApi::with_certificate_auth(
            &config.account,
            Some(&config.warehouse),
            None,
            None,
            &config.user,
            Some(&config.role),
            &config.private_key,
        )
        .with_context(|| format!("failed to set up Snowflake client for account {}", config.account))?;
        Ok(SnowflakeExecutor { api })
    }

    async fn run(&self, sql: &str) -> Result<QueryResult> {
        self.api.exec(sql).await.map_err(|e| match e {
            SnowflakeApiError::ApiError(code, message) => ProviderError::Remote {
                statement: strip_tag(sql).to_string(),
                message: format!("{code}: {message}"),
            },
            other => ProviderError::Transport(other.to_string()),
        })
    }
}

#[async_trait]
impl QueryExecutor for SnowflakeExecutor {
    async fn exec(&self, sql: &str) -> Result<()> {
        self.run(sql).await.map(|_| ())
    }

    async fn query(&self, sql: &str) -> Result<RowSet> {
        match self.run(sql).await? {
            QueryResult::Json(json) => {
                let columns = json.schema.iter().map(|f| f.name.clone()).collect();
                Ok(RowSet::from_json_rows(columns, &json.value)?)
            }
            QueryResult::Arrow(batches) => arrow_to_rows(&batches),
            QueryResult::Empty => Ok(RowSet::default()),
        }
    }
}

/// Every cell as its display string, nulls as null, matching what JSON results carry.
fn arrow_to_rows(batches: &[RecordBatch]) -> Result<RowSet> {
    let Some(first) = batches.first() else {
        return Ok(RowSet::default());
    };
    let columns = first.schema().fields().iter().map(|f| f.name().clone()).collect();
    let mut rows = RowSet::new(columns);

    for batch in batches {
        for row in 0..batch.num_rows() {
            let cells = batch
                .columns()
                .iter()
                .map(|column| {
                    if column.is_null(row) {
                        Ok(Value::Null)
                    } else {
                        array_value_to_string(column, row)
                            .map(Value::String)
                            .map_err(|e| ProviderError::Transport(format!("failed to decode arrow cell: {e}")))
                    }
                })
                .collect::<Result<Vec<_>>>()?;
            rows.push_row(cells);
        }
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::{
        array::{Int64Array, StringArray},
        datatypes::{DataType, Field, Schema},
    };

    use super::*;

    #[test]
    fn test_arrow_batches_become_rows() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("name", DataType::Utf8, false),
            Field::new("max_nodes", DataType::Int64, true),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec!["P1", "P2"])),
                Arc::new(Int64Array::from(vec![Some(3), None])),
            ],
        )
        .unwrap();

        let rows = arrow_to_rows(&[batch]).unwrap();
        let records: Vec<_> = rows.iter_records().collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get_string("name").as_deref(), Some("P1"));
        assert_eq!(records[0].get_i64("max_nodes").unwrap(), Some(3));
        assert_eq!(records[1].get_i64("max_nodes").unwrap(), None);
    }

    #[test]
    fn test_no_batches_is_empty() {
        assert!(arrow_to_rows(&[]).unwrap().is_empty());
    }
}
