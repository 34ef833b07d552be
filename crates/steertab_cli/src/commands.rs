use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use steertab_bank::{prelude::*, sim::TABLE_STRIDE};
use steertab_core::{
    classify::TableGeometry,
    quant::to_slot,
    regs::{REGISTER_BLOCK_SIZE, REGISTER_MAP},
    table::{bin_capacity, build_table, reconstruct, EncodingMode},
};
use steertab_io::prelude::*;

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))
}

fn load_layout(path: &Path) -> Result<Layout> {
    let content = read(path)?;
    LayoutLoader::default()
        .load(&content)
        .with_context(|| format!("in {}", path.display()))
}

/// Simulated card holding one table, laid out where a card with `table + 1` tables would put it.
fn device(table: TableId, geometry: TableGeometry, mode: EncodingMode) -> Result<SimDevice> {
    let base = table
        .checked_mul(TABLE_STRIDE)
        .with_context(|| format!("table {table} is outside the register space"))?;
    let dev = SimDevice::new();
    dev.add_table(table, base, geometry, mode);
    Ok(dev)
}

pub fn check(geometry: TableGeometry, path: &Path) -> Result<()> {
    let layout = load_layout(path)?;
    build_table(&layout.ranges(), layout.mode, geometry.output_bits)?;

    let capacity = bin_capacity(layout.mode, geometry.output_bits);
    println!(
        "table {}: {} bins, {} mode, room for {}",
        layout.table,
        layout.len(),
        layout.mode,
        capacity
    );
    for (idx, (name, range)) in layout.iter().enumerate() {
        let span = range.to_string();
        if idx >= capacity {
            println!("  {name:<16} {span:<12} dropped");
        } else if range.is_empty() {
            println!("  {name:<16} {span:<12} unused");
        } else {
            let (start, end) = (to_slot(range.min), to_slot(range.max));
            println!(
                "  {name:<16} {span:<12} slots {start}..={} ({})",
                end - 1,
                end - start
            );
        }
    }
    Ok(())
}

pub fn build(geometry: TableGeometry, path: &Path) -> Result<()> {
    let layout = load_layout(path)?;
    let dev = device(layout.table, geometry, layout.mode)?;
    let mut table = BankedTable::open(&dev, layout.table, EntryConfig::default())?;

    table.apply_layout(&layout.ranges())?;
    let bank = table.current_bank()?;
    let live = table.read_table_bank(bank)?;
    let restored = reconstruct(&live, layout.len(), table.encoding());
    for bin in &restored.fragmented {
        warn!(bin, name = layout.bin_name(*bin), "bin slots are not contiguous");
    }

    println!("table {} live on bank {}", layout.table, bank);
    for (idx, range) in restored.ranges.iter().enumerate() {
        println!("  {:<16} {}", layout.bin_name(idx).unwrap_or("?"), range);
    }
    Ok(())
}

pub fn rules(geometry: TableGeometry, path: &Path, flip: bool) -> Result<()> {
    let content = read(path)?;
    let set = RulesLoader::default()
        .load(&content)
        .with_context(|| format!("in {}", path.display()))?;
    let dev = device(set.table, geometry, EncodingMode::Exclusive)?;
    let mut table = BankedTable::open(&dev, set.table, set.entry)?;

    let mut mismatches = 0;
    for rule in &set.rules {
        let rb = rule.apply_verify(&mut table)?;
        if !rb.is_match() {
            mismatches += 1;
            warn!(
                address = rb.address,
                written = rb.written,
                read = rb.read,
                "entry read back differs"
            );
            println!(
                "  mismatch at {:#06x}: wrote {}, read {}",
                rb.address, rb.written, rb.read
            );
        }
    }
    info!(rules = set.rules.len(), mismatches, "rules written");

    if flip {
        let bank = table.swap_banks()?;
        println!(
            "table {}: {} rules live on bank {}",
            set.table,
            set.rules.len(),
            bank
        );
    } else {
        println!(
            "table {}: {} rules staged on bank {}",
            set.table,
            set.rules.len(),
            table.current_bank()?.other()
        );
    }
    Ok(())
}

pub fn regs() -> Result<()> {
    for (name, offset) in REGISTER_MAP.entries() {
        println!("  {offset:#04x}  {name}");
    }
    println!("  block size {REGISTER_BLOCK_SIZE:#04x}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use steertab_core::SteerError;

    use super::*;

    fn demo(name: &str) -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../demos")
            .join(name)
    }

    fn geometry() -> TableGeometry {
        TableGeometry {
            input_bits: 14,
            output_bits: 6,
            hash_bits: 4,
            color_bits: 8,
            interface_bits: 2,
        }
    }

    #[test]
    fn test_demos() {
        check(geometry(), &demo("web.layout")).unwrap();
        build(geometry(), &demo("web.layout")).unwrap();
        rules(geometry(), &demo("web.rules"), true).unwrap();
        rules(geometry(), &demo("web.rules"), false).unwrap();
        regs().unwrap();
    }

    #[test]
    fn test_narrow_table_rejects_rules() {
        let narrow = TableGeometry {
            color_bits: 4,
            ..geometry()
        };
        let err = rules(narrow, &demo("web.rules"), true).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SteerError>(),
            Some(SteerError::InvalidFieldWidth { field: "color", .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = check(geometry(), &demo("missing.layout")).unwrap_err();
        assert!(err.to_string().contains("missing.layout"));
    }
}
