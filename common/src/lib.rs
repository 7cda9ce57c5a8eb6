//! LesionVision Common Library
//!
//! CLIとHTTP APIで共有される型と純粋ロジック（ネットワークI/Oなし）

pub mod types;
pub mod aggregate;
pub mod data_url;
pub mod layout;
pub mod report;
pub mod error;

pub use types::{
    CategorySelection, DetectionAggregate, DetectionOutcome, DetectionRequest, LesionCategory,
    PatientInfo, PatientRecord,
};
pub use aggregate::{merge_aggregates, ScanSession};
pub use report::{assemble_report, ImageKind, ReportDocument, ReportImage, ReportSection};
pub use error::{Error, Result};
