//! Vector index using LanceDB for nearest-neighbour search

use std::sync::Arc;

use arrow_array::{Array, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator, StringArray};
use arrow_schema::{DataType, Field, Schema};
use futures::TryStreamExt;
use lance_arrow::FixedSizeListArrayExt;
use lancedb::connect;
use lancedb::query::{ExecutableQuery, QueryBase};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{Error, Result};

const TABLE_NAME: &str = "entries";

/// Vector index backed by LanceDB. Holds only ids and vectors; text lives in the docstore.
pub struct VectorStorage {
    db: lancedb::Connection,
    dimensions: usize,
}

impl VectorStorage {
    /// Open (or create) the vector index for `dimensions`-long vectors
    pub async fn new(config: &Config, dimensions: usize) -> Result<Self> {
        let path = config.vector_db_path();
        let uri = path
            .to_str()
            .ok_or_else(|| Error::config(format!("Vector index path is not UTF-8: {:?}", path)))?;

        let db = connect(uri)
            .execute()
            .await
            .map_err(|e| Error::vector_db(e.to_string()))?;

        let storage = Self { db, dimensions };
        storage.ensure_table().await?;

        Ok(storage)
    }

    fn schema(&self) -> Schema {
        Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    self.dimensions as i32,
                ),
                false,
            ),
        ])
    }

    async fn ensure_table(&self) -> Result<()> {
        let tables = self
            .db
            .table_names()
            .execute()
            .await
            .map_err(|e| Error::vector_db(e.to_string()))?;

        if !tables.contains(&TABLE_NAME.to_string()) {
            let schema = Arc::new(self.schema());
            let empty_batch = RecordBatch::new_empty(schema.clone());
            let reader = RecordBatchIterator::new(vec![empty_batch].into_iter().map(Ok), schema);

            self.db
                .create_table(TABLE_NAME, Box::new(reader))
                .execute()
                .await
                .map_err(|e| Error::vector_db(e.to_string()))?;

            tracing::debug!(table = TABLE_NAME, dimensions = self.dimensions, "created vector table");
        }

        Ok(())
    }

    async fn table(&self) -> Result<lancedb::Table> {
        self.db
            .open_table(TABLE_NAME)
            .execute()
            .await
            .map_err(|e| Error::vector_db(e.to_string()))
    }

    /// Append vectors in one batch. Every vector must match the index dimension.
    pub async fn add(&self, entries: &[(Uuid, Vec<f32>)]) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut values = Vec::with_capacity(entries.len() * self.dimensions);
        for (id, embedding) in entries {
            if embedding.len() != self.dimensions {
                return Err(Error::vector_db(format!(
                    "Embedding dimension mismatch for {}: expected {}, got {}",
                    id,
                    self.dimensions,
                    embedding.len()
                )));
            }
            values.extend_from_slice(embedding);
        }

        let id_array = StringArray::from(
            entries
                .iter()
                .map(|(id, _)| id.to_string())
                .collect::<Vec<_>>(),
        );
        let vector_array =
            FixedSizeListArray::try_new_from_values(Float32Array::from(values), self.dimensions as i32)
                .map_err(|e: arrow_schema::ArrowError| Error::vector_db(e.to_string()))?;

        let schema = Arc::new(self.schema());
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![Arc::new(id_array) as Arc<dyn Array>, Arc::new(vector_array)],
        )
        .map_err(|e| Error::vector_db(e.to_string()))?;

        let reader = RecordBatchIterator::new(vec![batch].into_iter().map(Ok), schema);

        self.table()
            .await?
            .add(Box::new(reader))
            .execute()
            .await
            .map_err(|e| Error::vector_db(e.to_string()))?;

        Ok(())
    }

    /// Return up to `limit` nearest ids by L2 distance, closest first
    pub async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<VectorHit>> {
        if query_embedding.len() != self.dimensions {
            return Err(Error::vector_db(format!(
                "Query dimension mismatch: expected {}, got {}",
                self.dimensions,
                query_embedding.len()
            )));
        }
        if limit == 0 {
            return Ok(Vec::new());
        }

        let stream = self
            .table()
            .await?
            .vector_search(query_embedding.to_vec())
            .map_err(|e: lancedb::Error| Error::vector_db(e.to_string()))?
            .limit(limit)
            .execute()
            .await
            .map_err(|e: lancedb::Error| Error::vector_db(e.to_string()))?;

        let batches: Vec<RecordBatch> = stream
            .try_collect::<Vec<RecordBatch>>()
            .await
            .map_err(|e: lancedb::Error| Error::vector_db(e.to_string()))?;

        let mut hits = Vec::new();
        for batch in batches {
            let ids = batch
                .column_by_name("id")
                .ok_or_else(|| Error::vector_db("Missing id column"))?
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| Error::vector_db("id column is not StringArray"))?;
            let distances = batch
                .column_by_name("_distance")
                .ok_or_else(|| Error::vector_db("Missing _distance column"))?
                .as_any()
                .downcast_ref::<Float32Array>()
                .ok_or_else(|| Error::vector_db("_distance column is not Float32Array"))?;

            for i in 0..batch.num_rows() {
                hits.push(VectorHit {
                    id: Uuid::parse_str(ids.value(i)).map_err(|e| Error::vector_db(e.to_string()))?,
                    distance: distances.value(i),
                });
            }
        }

        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(limit);

        Ok(hits)
    }

    /// Drop every vector and start from an empty table
    pub async fn clear(&self) -> Result<()> {
        self.db
            .drop_table(TABLE_NAME)
            .await
            .map_err(|e| Error::vector_db(e.to_string()))?;
        self.ensure_table().await
    }
}

/// An id returned from a nearest-neighbour search
#[derive(Debug, Clone, PartialEq)]
pub struct VectorHit {
    pub id: Uuid,
    /// Squared L2 distance as reported by LanceDB
    pub distance: f32,
}
