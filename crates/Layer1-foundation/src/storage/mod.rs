//! Storage module for DockaShell
//!
//! - `json`: JSON - 설정 파일 저장/로드

mod json;

pub use json::{JsonStore, HOME_ENV};
