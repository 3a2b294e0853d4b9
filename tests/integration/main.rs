//! Integration tests for featured-backfill

mod pipeline_tests;
