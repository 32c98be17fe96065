mod common;

use binscope::prelude::*;
use common::{
    rela, symbols, zlib_envelope, Elf, Encoding, Shdr, EM_386, EM_AARCH64, PT_LOAD, PT_NOTE,
    R_386_32, R_386_PC32, R_AARCH64_ABS32, R_AARCH64_ABS64, R_AARCH64_PREL32, R_X86_64_32,
    R_X86_64_64, R_X86_64_PC32, SHT_PROGBITS, SHT_REL, SHT_RELA, SHT_STRTAB, SHT_SYMTAB,
};

/// `.debug_info` with a 64-bit slot at 0 and a 32-bit slot at 8, relocated against `main`.
fn relocatable(entries: &[(u64, u32, u32, i64)]) -> Vec<u8> {
    let mut info = vec![0u8; 16];
    info[8..12].copy_from_slice(&0xdead_beefu32.to_le_bytes());
    info[12..16].copy_from_slice(&[1, 2, 3, 4]);

    let mut elf = Elf::new();
    elf.section(Shdr {
        addr: 0x40_1000,
        ..Shdr::new(".text", SHT_PROGBITS, vec![0x90; 32])
    });
    let debug_info = elf.section(Shdr::new(".debug_info", SHT_PROGBITS, info));
    let strtab = elf.section(Shdr::new(".strtab", SHT_STRTAB, b"\0main\0".to_vec()));
    let symtab = elf.section(
        Shdr {
            entsize: 24,
            ..Shdr::new(".symtab", SHT_SYMTAB, symbols(&[(1, 0x40_1000)]))
        }
        .linked(strtab, 0),
    );
    elf.section(
        Shdr {
            entsize: 24,
            ..Shdr::new(".rela.debug_info", SHT_RELA, rela(entries))
        }
        .linked(symtab, debug_info),
    );
    elf.build()
}

#[test]
fn sections_of_relocatable() {
    let object = Object::from_mem(relocatable(&[])).unwrap();
    assert_eq!(object.family(), Family::Segmented);
    assert_eq!(object.machine_arch(), "x64");
    assert_eq!(object.num_sections(), 7);

    let names: Vec<_> = object
        .sections()
        .map(|section| section.unwrap().name)
        .collect();
    assert_eq!(
        names,
        vec![
            "",
            ".text",
            ".debug_info",
            ".strtab",
            ".symtab",
            ".rela.debug_info",
            ".shstrtab",
        ]
    );

    let text = object.section_by_name(".text").unwrap().unwrap();
    assert_eq!(text.address, 0x40_1000);
    assert_eq!(text.kind, SectionKind::Raw);
    assert_eq!(text.size(), 32);

    let symtab = object.section(4).unwrap();
    assert_eq!(symtab.kind, SectionKind::SymbolTable { strtab: 3 });
    let elf = object.as_elf().unwrap();
    let table = elf.symbols(&symtab).unwrap();
    assert_eq!(table.len(), 2);
    let main = table.get(1).unwrap();
    assert_eq!(main.name, "main");
    assert_eq!(main.value, 0x40_1000);

    assert_eq!(
        object.section(5).unwrap().kind,
        SectionKind::Relocation {
            addend: true,
            symtab: 4,
            target: 2,
        }
    );
    assert!(object.section(7).is_err());
}

#[test]
fn relocated_debug_info() {
    let object = Object::from_mem(relocatable(&[
        (0, 1, R_X86_64_64, 0x10),
        (8, 1, R_X86_64_32, 4),
        (12, 0, 0, 0),
    ]))
    .unwrap();

    let dwarf = object.dwarf_info(true).unwrap();
    let info = dwarf.section(DebugSection::Info).unwrap();
    assert_eq!(&info.data[0..8], &0x40_1010u64.to_le_bytes());
    assert_eq!(&info.data[8..12], &0x40_1004u32.to_le_bytes());
    assert_eq!(&info.data[12..16], &[1, 2, 3, 4]);
    assert_eq!(
        *dwarf.config(),
        DwarfConfig {
            little_endian: true,
            default_address_size: 8,
            machine_arch: "x64",
        }
    );

    let raw = object.dwarf_info(false).unwrap();
    let info = raw.section(DebugSection::Info).unwrap();
    assert_eq!(&info.data[0..8], &[0; 8]);
    assert_eq!(&info.data[8..12], &0xdead_beefu32.to_le_bytes());

    // the container bytes stay untouched
    let section = object.section_by_name(".debug_info").unwrap().unwrap();
    assert_eq!(&section.data()[0..8], &[0; 8]);
}

#[test]
fn unsupported_relocation_type() {
    // R_X86_64_PLT32
    let object = Object::from_mem(relocatable(&[(0, 1, 4, 0)])).unwrap();

    assert!(matches!(object.dwarf_info(true), Err(Error::NotSupported)));
    assert!(object.dwarf_info(false).is_ok());
}

#[test]
fn pc_relative_eh_frame_relocation() {
    let mut elf = Elf::new();
    elf.section(Shdr::new(".text", SHT_PROGBITS, vec![0x90; 32]));
    let eh_frame = elf.section(Shdr::new(".eh_frame", SHT_PROGBITS, vec![0; 48]));
    let strtab = elf.section(Shdr::new(".strtab", SHT_STRTAB, b"\0.text\0".to_vec()));
    let symtab = elf.section(
        Shdr {
            entsize: 24,
            ..Shdr::new(".symtab", SHT_SYMTAB, symbols(&[(1, 0x40_1000)]))
        }
        .linked(strtab, 0),
    );
    elf.section(
        Shdr {
            entsize: 24,
            ..Shdr::new(
                ".rela.eh_frame",
                SHT_RELA,
                rela(&[
                    (0x20, 1, R_X86_64_PC32, 0),
                    (0x24, 0, R_X86_64_PC32, 0),
                    (0x28, 1, R_X86_64_PC32, -4),
                ]),
            )
        }
        .linked(symtab, eh_frame),
    );
    let object = Object::from_mem(elf.build()).unwrap();

    assert!(object.has_dwarf_info().unwrap());
    let dwarf = object.dwarf_info(true).unwrap();
    let frames = dwarf.section(DebugSection::EhFrame).unwrap();
    assert_eq!(&frames.data[..0x20], &[0; 0x20]);
    assert_eq!(&frames.data[0x20..0x24], &0x40_0fe0u32.to_le_bytes());
    assert_eq!(&frames.data[0x24..0x28], &0xffff_ffdcu32.to_le_bytes());
    assert_eq!(&frames.data[0x28..0x2c], &0x40_0fd4u32.to_le_bytes());
    assert_eq!(&frames.data[0x2c..], &[0; 4]);
}

/// i386 object whose `.debug_info` is patched by a `.rel` table with in-place addends.
fn i386_relocatable(encoding: Encoding) -> Vec<u8> {
    let mut info = Vec::new();
    info.extend_from_slice(&encoding.bytes32(0x10));
    info.extend_from_slice(&encoding.bytes32(-4i32 as u32));
    info.extend_from_slice(&encoding.bytes32(0xdead_beef));

    let mut elf = Elf::with(encoding, EM_386);
    elf.section(Shdr {
        addr: 0x804_8000,
        ..Shdr::new(".text", SHT_PROGBITS, vec![0x90; 16])
    });
    let debug_info = elf.section(Shdr::new(".debug_info", SHT_PROGBITS, info));
    let strtab = elf.section(Shdr::new(".strtab", SHT_STRTAB, b"\0main\0".to_vec()));
    let symtab = elf.section(
        Shdr {
            entsize: 16,
            ..Shdr::new(
                ".symtab",
                SHT_SYMTAB,
                encoding.symbols(&[(1, 0x804_8000)]),
            )
        }
        .linked(strtab, 0),
    );
    elf.section(
        Shdr {
            entsize: 8,
            ..Shdr::new(
                ".rel.debug_info",
                SHT_REL,
                encoding.rel(&[(0, 1, R_386_32), (4, 1, R_386_PC32)]),
            )
        }
        .linked(symtab, debug_info),
    );
    elf.build()
}

#[test]
fn rel_debug_info_with_implicit_addends() {
    for big_endian in [false, true] {
        let encoding = Encoding {
            is_64: false,
            big_endian,
        };
        let object = Object::from_mem(i386_relocatable(encoding)).unwrap();
        assert_eq!(object.machine_arch(), "x86");

        let elf = object.as_elf().unwrap();
        let rel = elf.section_by_name(".rel.debug_info").unwrap().unwrap();
        assert_eq!(
            rel.kind,
            SectionKind::Relocation {
                addend: false,
                symtab: 4,
                target: 2,
            }
        );
        let entries: Vec<_> = elf
            .relocations(&rel)
            .unwrap()
            .iter()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].offset, 4);
        assert_eq!(entries[1].sym, 1);
        assert_eq!(entries[1].r_type, R_386_PC32);
        assert_eq!(entries[1].addend, None);

        let dwarf = object.dwarf_info(true).unwrap();
        let info = dwarf.section(DebugSection::Info).unwrap();
        assert_eq!(&info.data[0..4], &encoding.bytes32(0x804_8010));
        assert_eq!(&info.data[4..8], &encoding.bytes32(0x804_7ff8));
        assert_eq!(&info.data[8..12], &encoding.bytes32(0xdead_beef));
        assert_eq!(
            *dwarf.config(),
            DwarfConfig {
                little_endian: !big_endian,
                default_address_size: 4,
                machine_arch: "x86",
            }
        );
    }
}

#[test]
fn big_endian_aarch64_relocations() {
    let encoding = Encoding {
        is_64: true,
        big_endian: true,
    };
    let mut elf = Elf::with(encoding, EM_AARCH64);
    let debug_info = elf.section(Shdr::new(".debug_info", SHT_PROGBITS, vec![0xff; 16]));
    let strtab = elf.section(Shdr::new(".strtab", SHT_STRTAB, b"\0_start\0".to_vec()));
    let symtab = elf.section(
        Shdr {
            entsize: 24,
            ..Shdr::new(".symtab", SHT_SYMTAB, encoding.symbols(&[(1, 0x40_0000)]))
        }
        .linked(strtab, 0),
    );
    elf.section(
        Shdr {
            entsize: 24,
            ..Shdr::new(
                ".rela.debug_info",
                SHT_RELA,
                encoding.rela(&[
                    (0, 1, R_AARCH64_ABS64, 0x10),
                    (8, 1, R_AARCH64_ABS32, 4),
                    (12, 1, R_AARCH64_PREL32, 0),
                ]),
            )
        }
        .linked(symtab, debug_info),
    );
    let object = Object::from_mem(elf.build()).unwrap();
    assert_eq!(object.machine_arch(), "AArch64");

    let dwarf = object.dwarf_info(true).unwrap();
    let info = dwarf.section(DebugSection::Info).unwrap();
    assert_eq!(&info.data[0..8], &0x40_0010u64.to_be_bytes());
    assert_eq!(&info.data[8..12], &0x40_0004u32.to_be_bytes());
    assert_eq!(&info.data[12..16], &0x3f_fff4u32.to_be_bytes());
    assert!(!dwarf.config().little_endian);
}

#[test]
fn relocation_past_section_end() {
    let object = Object::from_mem(relocatable(&[(12, 1, R_X86_64_64, 0)])).unwrap();

    assert!(matches!(
        object.dwarf_info(true),
        Err(Error::OutOfBounds { .. })
    ));
}

#[test]
fn compressed_elf_sections() {
    let abbrev = b"\x01\x11\x01\x25\x0e\x00\x00\x00".repeat(600);

    let mut elf = Elf::new();
    elf.section(Shdr::new(
        ".zdebug_info",
        SHT_PROGBITS,
        zlib_envelope(&[7; 11], 11),
    ));
    elf.section(Shdr::new(
        ".zdebug_abbrev",
        SHT_PROGBITS,
        zlib_envelope(&abbrev, abbrev.len() as u64),
    ));
    let object = Object::from_mem(elf.build()).unwrap();

    assert!(object.has_dwarf_info().unwrap());
    let dwarf = object.dwarf_info(true).unwrap();
    assert!(dwarf.is_compressed());
    assert_eq!(dwarf.section(DebugSection::Info).unwrap().data, vec![7; 11]);
    assert_eq!(dwarf.section(DebugSection::Abbrev).unwrap().data, abbrev);
    assert_eq!(dwarf.sections().count(), 2);
}

#[test]
fn address_offsets_over_load_segments() {
    let mut elf = Elf::new();
    elf.section(Shdr::new(".text", SHT_PROGBITS, vec![0xc3; 16]));
    elf.segment(PT_LOAD, 0, 0x40_0000, 0x200);
    elf.segment(PT_NOTE, 0x100, 0x40_0100, 0x20);
    elf.segment(PT_LOAD, 0x200, 0x60_0000, 0x100);
    elf.segment(PT_LOAD, 0x100, 0x40_0100, 0x100);
    let object = Object::from_mem(elf.build()).unwrap();
    assert_eq!(object.num_segments(), 4);

    let offsets = |start, size| {
        object
            .address_offsets(start, size)
            .collect::<Result<Vec<u64>>>()
            .unwrap()
    };

    assert_eq!(offsets(0x40_0010, 4), vec![0x10]);
    assert_eq!(offsets(0x60_0080, 16), vec![0x280]);
    // mapped by two load segments, the note segment is ignored
    assert_eq!(offsets(0x40_0110, 8), vec![0x110, 0x110]);
    assert_eq!(offsets(0x40_01fe, 4), Vec::<u64>::new());
    assert_eq!(offsets(0x50_0000, 1), Vec::<u64>::new());

    let elf = object.as_elf().unwrap();
    let kinds: Vec<_> = elf.segments().map(|segment| segment.unwrap().kind).collect();
    assert_eq!(
        kinds,
        vec![
            SegmentKind::Load,
            SegmentKind::Note,
            SegmentKind::Load,
            SegmentKind::Load,
        ]
    );
}

#[test]
fn truncated_section_table() {
    let mut data = relocatable(&[]);
    data.truncate(data.len() - 32);

    // tables are walked lazily, so the damage surfaces on access
    let elf = ElfFile::from_mem(data).unwrap();
    assert_eq!(elf.num_sections(), 7);
    assert!(matches!(elf.section(6), Err(Error::OutOfBounds { .. })));
    assert!(elf.section_by_name(".text").is_err());
}
