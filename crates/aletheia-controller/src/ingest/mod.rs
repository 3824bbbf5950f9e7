//! Ingest gateway: the controller's single stateful service object.

mod gateway;

pub use gateway::{
    IngestError, IngestGateway, LOG_BUFFER_SIZE, METRIC_BUFFER_SIZE, SNAPSHOT_SIZE,
};
