// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(clippy::too_many_arguments)]
//#![deny(unsafe_code)]
// - 'file/physical.rs' uses mmap to map a file into memory

//! # binscope
//!
//! A read-only container reader for ELF executables and WebAssembly modules, built to feed
//! DWARF debug information to a downstream consumer.
//!
//! `binscope` identifies a container by its magic prologue, walks its section or segment
//! tables lazily, translates virtual addresses into file offsets, and assembles the named
//! debug sections into an owned bundle, applying relocations and inflating `.zdebug_*`
//! sections on request. It never interprets DWARF itself.
//!
//! ## Features
//!
//! - **📦 Efficient memory access** - Memory-mapped input, sections borrow straight from the mapping
//! - **🔍 Two container families** - 32/64-bit ELF in either byte order, and WebAssembly modules
//! - **🧭 Address translation** - Virtual address to file offset over every `PT_LOAD` segment
//! - **🐞 Debug information** - `.debug_*` and `.zdebug_*` sections with optional relocation
//! - **🛡️ Bounded** - Every declared size is checked against the input and the configured limits
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use binscope::prelude::*;
//! use std::path::Path;
//!
//! let object = Object::from_file(Path::new("a.out"))?;
//! println!("{}: {} sections", object.machine_arch(), object.num_sections());
//!
//! for section in object.sections() {
//!     let section = section?;
//!     println!("{:<20} {:?} {:#x} {} bytes", section.name, section.kind, section.offset, section.size());
//! }
//!
//! if object.has_dwarf_info()? {
//!     let dwarf = object.dwarf_info(true)?;
//!     for (role, section) in dwarf.sections() {
//!         println!("{:?}: {} bytes", role, section.size);
//!     }
//! }
//! # Ok::<(), binscope::Error>(())
//! ```
//!
//! ### Address Translation
//!
//! ```rust,no_run
//! use binscope::ElfFile;
//! use std::path::Path;
//!
//! let elf = ElfFile::from_file(Path::new("/bin/true"))?;
//! for offset in elf.address_offsets(elf.header().e_entry, 16) {
//!     println!("entry point lives at file offset {:#x}", offset?);
//! }
//! # Ok::<(), binscope::Error>(())
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, Error>`](Result):
//!
//! ```rust,no_run
//! use binscope::{Error, Object};
//!
//! match Object::from_file(std::path::Path::new("tests/samples/unknown.bin")) {
//!     Ok(_) => println!("Loaded"),
//!     Err(Error::NotSupported) => println!("Neither ELF nor wasm"),
//!     Err(Error::Malformed { message, .. }) => println!("Malformed file: {}", message),
//!     Err(e) => println!("Other error: {}", e),
//! }
//! ```
//!
//! ## Logging
//!
//! The crate emits [`tracing`](https://docs.rs/tracing) events: `debug` for loads, relocation
//! and decompression, `trace` for each wasm section walked, and `warn` when a duplicate
//! custom section name replaces an earlier one. Install any subscriber to see them.
//!
//! ## Development and Testing
//!
//! ### Fuzzing
//!
//! ```bash
//! cargo +nightly fuzz run object --release
//! ```
//!
//! ### Testing
//!
//! ```bash
//! cargo test
//! cargo bench
//! ```

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit- and integration-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust,no_run
/// use binscope::prelude::*;
///
/// let object = Object::from_file("module.wasm".as_ref())?;
/// let dwarf = object.dwarf_info(false)?;
/// # Ok::<(), binscope::Error>(())
/// ```
pub mod prelude;

/// Input handling: backends, identification, load options and low-level decoding.
///
/// - [`file::Backend`] - Byte source abstraction, with [`file::Memory`] and [`file::Physical`]
/// - [`file::identify::identify`] - Container identification from the magic prologue
/// - [`file::parser::Parser`] - Cursor with LEB128 and length-prefixed string decoding
/// - [`file::options::LoadOptions`] - Allocation bounds and duplicate handling
pub mod file;

/// The family-independent container view, [`BinaryFile`] and [`Object`].
pub mod object;

/// The segmented (ELF) container family.
///
/// # Key Types
///
/// - [`ElfFile`] - The loaded container
/// - [`elf::segment::Segment`] and [`elf::segment::AddressOffsets`] - Program headers and address translation
/// - [`elf::symbols::SymbolTable`], [`elf::relocation::RelocationTable`], [`elf::dynamic::DynamicIter`]
pub mod elf;

/// The module (WebAssembly) container family.
pub mod wasm;

/// DWARF debug-information assembly and `.zdebug` decompression.
pub mod dwarf;

/// `binscope` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always
/// [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `binscope` Error type
///
/// The main error type for all operations in this crate.
pub use error::Error;

/// Allocation bounds and duplicate handling applied while loading.
pub use file::options::{DuplicatePolicy, LoadOptions};

/// Low-level cursor over a byte slice.
pub use file::parser::Parser;

/// Container identification.
pub use file::identify::{identify, Family, Identity, WordSize};

/// Family-independent container access.
pub use object::{
    section::{Section, SectionFlags, SectionKind},
    BinaryFile, Object,
};

/// The segmented container.
pub use elf::ElfFile;

/// The module container.
pub use wasm::WasmFile;

/// The assembled debug-information bundle.
pub use dwarf::{DebugSection, DebugSectionDescriptor, DwarfConfig, DwarfInfo};
