//! Fixture builders shared by the integration tests.
#![allow(dead_code)]

use std::io::Write;

use flate2::{write::ZlibEncoder, Compression};

pub const SHT_PROGBITS: u32 = 1;
pub const SHT_SYMTAB: u32 = 2;
pub const SHT_STRTAB: u32 = 3;
pub const SHT_RELA: u32 = 4;
pub const SHT_REL: u32 = 9;
pub const PT_LOAD: u32 = 1;
pub const PT_NOTE: u32 = 4;
pub const R_X86_64_64: u32 = 1;
pub const R_X86_64_PC32: u32 = 2;
pub const R_X86_64_32: u32 = 10;
pub const R_386_32: u32 = 1;
pub const R_386_PC32: u32 = 2;
pub const R_AARCH64_ABS64: u32 = 257;
pub const R_AARCH64_ABS32: u32 = 258;
pub const R_AARCH64_PREL32: u32 = 261;
pub const EM_386: u16 = 3;
pub const EM_X86_64: u16 = 62;
pub const EM_AARCH64: u16 = 183;

pub fn uleb128(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

/// Wrap `payload` in the `ZLIB` envelope, declaring `declared_size` as its inflated length.
pub fn zlib_envelope(payload: &[u8], declared_size: u64) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(payload).unwrap();

    let mut out = b"ZLIB".to_vec();
    out.extend_from_slice(&declared_size.to_be_bytes());
    out.extend_from_slice(&encoder.finish().unwrap());
    out
}

/// WebAssembly module builder.
#[derive(Default)]
pub struct Module {
    body: Vec<u8>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a raw section and return the file offset of its payload.
    pub fn chunk(&mut self, kind: u8, payload: &[u8]) -> u64 {
        self.body.push(kind);
        uleb128(&mut self.body, payload.len() as u64);
        let offset = 8 + self.body.len() as u64;
        self.body.extend_from_slice(payload);
        offset
    }

    /// Append a custom section and return the file offset of its data.
    pub fn custom(&mut self, name: &str, data: &[u8]) -> u64 {
        let mut payload = Vec::new();
        uleb128(&mut payload, name.len() as u64);
        payload.extend_from_slice(name.as_bytes());
        let data_offset = payload.len() as u64;
        payload.extend_from_slice(data);
        self.chunk(0, &payload) + data_offset
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = b"\0asm".to_vec();
        out.extend_from_slice(&1u32.to_le_bytes());
        out.extend_from_slice(&self.body);
        out
    }
}

/// One section of an [`Elf`] image.
pub struct Shdr {
    pub name: &'static str,
    pub sh_type: u32,
    pub addr: u64,
    pub link: u32,
    pub info: u32,
    pub entsize: u64,
    pub data: Vec<u8>,
}

impl Shdr {
    pub fn new(name: &'static str, sh_type: u32, data: Vec<u8>) -> Self {
        Shdr {
            name,
            sh_type,
            addr: 0,
            link: 0,
            info: 0,
            entsize: 0,
            data,
        }
    }

    pub fn linked(mut self, link: u32, info: u32) -> Self {
        self.link = link;
        self.info = info;
        self
    }
}

/// Class and byte order of an image.
#[derive(Clone, Copy)]
pub struct Encoding {
    pub is_64: bool,
    pub big_endian: bool,
}

impl Encoding {
    pub const LE64: Encoding = Encoding {
        is_64: true,
        big_endian: false,
    };

    fn u16(&self, out: &mut Vec<u8>, value: u16) {
        out.extend_from_slice(&if self.big_endian {
            value.to_be_bytes()
        } else {
            value.to_le_bytes()
        });
    }

    fn u32(&self, out: &mut Vec<u8>, value: u32) {
        out.extend_from_slice(&if self.big_endian {
            value.to_be_bytes()
        } else {
            value.to_le_bytes()
        });
    }

    fn u64(&self, out: &mut Vec<u8>, value: u64) {
        out.extend_from_slice(&if self.big_endian {
            value.to_be_bytes()
        } else {
            value.to_le_bytes()
        });
    }

    /// Address-sized field.
    fn word(&self, out: &mut Vec<u8>, value: u64) {
        if self.is_64 {
            self.u64(out, value);
        } else {
            self.u32(out, value as u32);
        }
    }

    /// A 4-byte value in this byte order.
    pub fn bytes32(&self, value: u32) -> [u8; 4] {
        if self.big_endian {
            value.to_be_bytes()
        } else {
            value.to_le_bytes()
        }
    }

    /// Symbol entries as `(name, value)`, the null symbol first.
    pub fn symbols(&self, entries: &[(u32, u64)]) -> Vec<u8> {
        let mut out = vec![0u8; self.sym_size()];
        for &(name, value) in entries {
            self.u32(&mut out, name);
            if self.is_64 {
                out.push(0x11);
                out.push(0);
                self.u16(&mut out, 1);
                self.u64(&mut out, value);
                self.u64(&mut out, 8);
            } else {
                self.u32(&mut out, value as u32);
                self.u32(&mut out, 8);
                out.push(0x11);
                out.push(0);
                self.u16(&mut out, 1);
            }
        }
        out
    }

    pub fn sym_size(&self) -> usize {
        if self.is_64 {
            24
        } else {
            16
        }
    }

    fn r_info(&self, sym: u32, r_type: u32) -> u64 {
        if self.is_64 {
            (u64::from(sym) << 32) | u64::from(r_type)
        } else {
            u64::from((sym << 8) | (r_type & 0xff))
        }
    }

    /// Implicit-addend entries as `(offset, sym, type)`.
    pub fn rel(&self, entries: &[(u64, u32, u32)]) -> Vec<u8> {
        let mut out = Vec::new();
        for &(offset, sym, r_type) in entries {
            self.word(&mut out, offset);
            self.word(&mut out, self.r_info(sym, r_type));
        }
        out
    }

    /// Explicit-addend entries as `(offset, sym, type, addend)`.
    pub fn rela(&self, entries: &[(u64, u32, u32, i64)]) -> Vec<u8> {
        let mut out = Vec::new();
        for &(offset, sym, r_type, addend) in entries {
            self.word(&mut out, offset);
            self.word(&mut out, self.r_info(sym, r_type));
            self.word(&mut out, addend as u64);
        }
        out
    }
}

/// `Elf64_Sym` entries, the null symbol first.
pub fn symbols(entries: &[(u32, u64)]) -> Vec<u8> {
    Encoding::LE64.symbols(entries)
}

/// `Elf64_Rela` entries as `(offset, sym, type, addend)`.
pub fn rela(entries: &[(u64, u32, u32, i64)]) -> Vec<u8> {
    Encoding::LE64.rela(entries)
}

/// ELF image builder, little-endian x86-64 unless built with [`Elf::with`].
///
/// Layout: header, program headers, section contents, `.shstrtab`, section headers.
pub struct Elf {
    encoding: Encoding,
    machine: u16,
    sections: Vec<Shdr>,
    /// `(p_type, offset, vaddr, filesz)`
    segments: Vec<(u32, u64, u64, u64)>,
}

impl Elf {
    pub fn new() -> Self {
        Self::with(Encoding::LE64, EM_X86_64)
    }

    pub fn with(encoding: Encoding, machine: u16) -> Self {
        Elf {
            encoding,
            machine,
            sections: Vec::new(),
            segments: Vec::new(),
        }
    }

    /// Append a section and return its index.
    pub fn section(&mut self, section: Shdr) -> u32 {
        self.sections.push(section);
        self.sections.len() as u32
    }

    pub fn segment(&mut self, p_type: u32, offset: u64, vaddr: u64, filesz: u64) {
        self.segments.push((p_type, offset, vaddr, filesz));
    }

    pub fn build(&self) -> Vec<u8> {
        let e = self.encoding;
        let (ehsize, phentsize, shentsize) = if e.is_64 { (64, 56, 64) } else { (52, 32, 40) };

        let mut names = vec![0u8];
        let mut name_offsets = Vec::new();
        for section in &self.sections {
            name_offsets.push(names.len() as u32);
            names.extend_from_slice(section.name.as_bytes());
            names.push(0);
        }
        let shstrtab_name = names.len() as u32;
        names.extend_from_slice(b".shstrtab\0");

        let mut out = vec![0u8; ehsize + phentsize * self.segments.len()];
        let mut placed = Vec::new();
        for section in &self.sections {
            while out.len() % 8 != 0 {
                out.push(0);
            }
            placed.push(out.len() as u64);
            out.extend_from_slice(&section.data);
        }
        let shstrtab_offset = out.len() as u64;
        out.extend_from_slice(&names);

        let segment_end = self
            .segments
            .iter()
            .map(|&(_, offset, _, size)| (offset + size) as usize)
            .max()
            .unwrap_or(0);
        if out.len() < segment_end {
            out.resize(segment_end, 0);
        }
        while out.len() % 8 != 0 {
            out.push(0);
        }

        let shoff = out.len() as u64;
        let shnum = self.sections.len() as u16 + 2;

        out.resize(out.len() + shentsize, 0);
        for ((section, &name), &offset) in self.sections.iter().zip(&name_offsets).zip(&placed) {
            self.shdr(
                &mut out,
                [name, section.sh_type],
                [section.addr, offset, section.data.len() as u64, section.entsize],
                [section.link, section.info],
            );
        }
        self.shdr(
            &mut out,
            [shstrtab_name, SHT_STRTAB],
            [0, shstrtab_offset, names.len() as u64, 0],
            [0, 0],
        );

        let mut header = Vec::with_capacity(ehsize);
        header.extend_from_slice(b"\x7fELF");
        header.push(if e.is_64 { 2 } else { 1 });
        header.push(if e.big_endian { 2 } else { 1 });
        header.push(1);
        header.resize(16, 0);
        e.u16(&mut header, 1);
        e.u16(&mut header, self.machine);
        e.u32(&mut header, 1);
        e.word(&mut header, 0);
        let phoff = if self.segments.is_empty() { 0 } else { ehsize as u64 };
        e.word(&mut header, phoff);
        e.word(&mut header, shoff);
        e.u32(&mut header, 0);
        for value in [
            ehsize as u16,
            phentsize as u16,
            self.segments.len() as u16,
            shentsize as u16,
            shnum,
            shnum - 1,
        ] {
            e.u16(&mut header, value);
        }

        for &(p_type, offset, vaddr, filesz) in &self.segments {
            e.u32(&mut header, p_type);
            if e.is_64 {
                e.u32(&mut header, 4);
                for value in [offset, vaddr, vaddr, filesz, filesz, 0x1000] {
                    e.u64(&mut header, value);
                }
            } else {
                for value in [offset, vaddr, vaddr, filesz, filesz] {
                    e.u32(&mut header, value as u32);
                }
                e.u32(&mut header, 4);
                e.u32(&mut header, 0x1000);
            }
        }

        out[..header.len()].copy_from_slice(&header);
        out
    }

    fn shdr(
        &self,
        out: &mut Vec<u8>,
        name_type: [u32; 2],
        addr_offset_size_entsize: [u64; 4],
        link_info: [u32; 2],
    ) {
        let e = self.encoding;
        let [addr, offset, size, entsize] = addr_offset_size_entsize;
        e.u32(out, name_type[0]);
        e.u32(out, name_type[1]);
        e.word(out, 0);
        e.word(out, addr);
        e.word(out, offset);
        e.word(out, size);
        e.u32(out, link_info[0]);
        e.u32(out, link_info[1]);
        e.word(out, 1);
        e.word(out, entsize);
    }
}
