//! Integration tests for the share orchestration core

mod share_flow;
