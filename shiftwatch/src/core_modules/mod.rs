// Leaves first: pixels -> mask -> blobs -> running totals -> metrics -> report.
pub mod background_model;
pub mod morphology;
pub mod contours;
pub mod blob;
pub mod blob_extractor;
pub mod aggregator;
pub mod metrics;
pub mod report;
pub mod alerts;
