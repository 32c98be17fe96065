#![no_main]

use std::hint::black_box;

use libfuzzer_sys::fuzz_target;
use binscope::{BinaryFile, LoadOptions, Object};

fuzz_target!(|data: &[u8]| {
    let Ok(object) = Object::from_mem_with_options(data.to_vec(), LoadOptions::strict()) else {
        return;
    };

    for section in object.sections() {
        if let Ok(section) = section {
            black_box(section.data().len());
        }
    }
    let _ = object.address_offsets(0x1000, 0x10).count();
    if object.has_dwarf_info().unwrap_or(false) {
        let _ = object.dwarf_info(true);
    }
});
