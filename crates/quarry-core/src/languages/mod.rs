//! Dialect implementations of `SourceParser`.

mod python;

pub use python::{clean_docstring, PythonParser};
