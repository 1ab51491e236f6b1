// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Built-in steps used by the CLI and tests.

mod detect_empty_stream;
mod dummy;
mod generate_rows;
mod row_counter;

pub use detect_empty_stream::{DetectEmptyStreamConfig, DetectEmptyStreamStep};
pub use dummy::{DummyConfig, DummyStep};
pub use generate_rows::{GenerateRowsConfig, GenerateRowsStep};
pub use row_counter::{RowCounterConfig, RowCounterStep};
