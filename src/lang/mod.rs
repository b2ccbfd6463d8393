//! # Fency Runtime Values
//!
//! This module defines the value model shared by the emitter and the
//! virtual machine. Values enter a program as pool constants or as the
//! product of opcodes, and a subset of them survives serialization into
//! compiled program files.

pub mod value;
