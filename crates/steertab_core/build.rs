use std::env;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

// Register block of one table, in hardware order. Every register is one 32-bit word.
const REGISTERS: [&str; 9] = [
    "config",
    "bank_select",
    "entry_addr",
    "entry_data",
    "entry_ctrl",
    "slot_write",
    "slot_read_addr",
    "slot_read_data",
    "status",
];

fn main() {
    let path = Path::new(&env::var("OUT_DIR").unwrap()).join("regmap.rs");
    let mut file = BufWriter::new(File::create(&path).unwrap());
    let mut m: phf_codegen::OrderedMap<&'static str> = phf_codegen::OrderedMap::new();
    let mut offset: u32 = 0;

    for name in REGISTERS {
        m.entry(name, format!("{:#06x}u32", offset).as_str());
        offset += 4;
    }

    write!(
        &mut file,
        "pub static REGISTER_MAP: phf::OrderedMap<&'static str, u32> = {}",
        m.build()
    )
    .unwrap();
    writeln!(&mut file, ";\n").unwrap();
    writeln!(&mut file, "pub const REGISTER_BLOCK_SIZE: u32 = {}u32;\n", offset).unwrap();
    println!("cargo:rerun-if-changed=build.rs");
}
