#![cfg(feature = "test-utils")]

mod delta_test;
mod pipeline_test;
mod postgres_store_test;
