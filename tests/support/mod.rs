//! Instrumented compute resources for driving the pipeline through its
//! failure paths.

#![allow(dead_code)]

pub mod mock_resource;
