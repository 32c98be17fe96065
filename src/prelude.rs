//! # binscope Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the binscope library. Import this module to get quick access to the essential
//! types for container inspection and debug-information assembly.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all binscope operations
pub use crate::Error;

/// The result type used throughout binscope
pub use crate::Result;

/// Allocation bounds and duplicate handling applied while loading
pub use crate::{DuplicatePolicy, LoadOptions};

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// Family-independent container access
pub use crate::{BinaryFile, Object};

/// Concrete containers
pub use crate::{ElfFile, WasmFile};

/// Identification from the magic prologue
pub use crate::{identify, Family, WordSize};

/// Low-level file parsing utilities
pub use crate::Parser;

// ================================================================================================
// Sections and Segments
// ================================================================================================

/// The family-independent section view
pub use crate::{Section, SectionFlags, SectionKind};

/// Program segments and address translation
pub use crate::elf::segment::{Segment, SegmentKind};

/// Applying relocations to section copies
pub use crate::elf::relocation::RelocationResolver;

/// Raw wasm section kinds
pub use crate::wasm::WasmSectionKind;

// ================================================================================================
// Debug Information
// ================================================================================================

/// The assembled debug-information bundle
pub use crate::{DebugSection, DebugSectionDescriptor, DwarfConfig, DwarfInfo};
