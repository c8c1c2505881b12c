//! API Tests
//!
//! - part_01: single-record prediction (form, JSON, multipart fields)
//! - part_02: CSV batches and upload errors
//! - part_03: health, readiness, metrics, listings and routing

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use tower::ServiceExt;

use super::test_helpers::*;
use super::*;

mod part_01;
mod part_02;
