//! Storage test suite
