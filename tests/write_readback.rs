//! # Write/Read-Back Integration Tests
//!
//! End-to-end scenarios through the registry: a write-mode connection
//! persists words fed over its data bus, and a read-mode connection on the
//! same backing file reproduces them bit for bit. Also pins a reference
//! scenario (4 address bits, 8-bit words, 8-word pages, latency 24, data
//! rate 2) and the out-of-range address boundary.

use pagebus::bus;
use pagebus::geom::{Direction, Layouts, Position, STROBE_OFFSET};
use pagebus::world::{ColorSchemes, SignalIo, SimWorld};
use pagebus::{
    ConnMode, ConnectionProperties, MemoryCatalog, OwnerId, QuotaLimits, Registry,
};
use tempfile::TempDir;

const WRITER_ORIGIN: Position = Position::new(0, 64, 0);
const READER_ORIGIN: Position = Position::new(0, 64, 10);

struct Rig {
    registry: Registry<MemoryCatalog>,
    world: SimWorld,
    _dir: TempDir,
}

fn props(
    mode: ConnMode,
    origin: Position,
    latency: u32,
    data_rate: u32,
) -> ConnectionProperties {
    let layout = (Layouts::new().default_spec())(Direction::East, 4, 8);
    ConnectionProperties {
        mode,
        origin,
        layout,
        scheme: ColorSchemes::new().default_scheme(),
        address_bits: 4,
        word_size: 8,
        page_size_words: 8,
        page_count: 16,
        latency,
        data_rate,
        file: "disk.bin".to_string(),
    }
}

fn rig() -> Rig {
    let dir = tempfile::tempdir().unwrap();
    Rig {
        registry: Registry::new(dir.path(), QuotaLimits::default(), MemoryCatalog::new()),
        world: SimWorld::new(),
        _dir: dir,
    }
}

fn drive_address(world: &mut SimWorld, origin: Position, address: u32) {
    let layout = (Layouts::new().default_spec())(Direction::East, 4, 8);
    bus::write_bits(
        world,
        origin.offset(layout.address),
        4,
        layout.address_spacing,
        address,
    );
}

fn set_data(world: &mut SimWorld, origin: Position, word: u32) {
    let layout = (Layouts::new().default_spec())(Direction::East, 4, 8);
    bus::write_bits(
        world,
        origin.offset(layout.data),
        8,
        layout.data_spacing,
        word,
    );
}

fn data_bus(world: &SimWorld, origin: Position) -> u32 {
    let layout = (Layouts::new().default_spec())(Direction::East, 4, 8);
    bus::read_bits(world, origin.offset(layout.data), 8, layout.data_spacing)
}

/// Run one full write transaction feeding `words` in slot order.
/// Assumes latency 0, data rate 1: word `i` transfers at tick `2i + 1`.
fn run_write(rig: &mut Rig, address: u32, words: &[u8]) {
    drive_address(&mut rig.world, WRITER_ORIGIN, address);
    rig.world.set_signal(WRITER_ORIGIN.offset(STROBE_OFFSET), true);

    for tick in 0..=(words.len() * 2) {
        set_data(&mut rig.world, WRITER_ORIGIN, u32::from(words[(tick / 2).min(words.len() - 1)]));
        rig.registry.step_all(&mut rig.world);
        if tick == 0 {
            rig.world.set_signal(WRITER_ORIGIN.offset(STROBE_OFFSET), false);
        }
    }
}

/// Run one full read transaction, collecting the words the device drives.
/// Assumes latency 0, data rate 1.
fn run_read(rig: &mut Rig, address: u32, words: usize) -> Vec<u8> {
    drive_address(&mut rig.world, READER_ORIGIN, address);
    rig.world.set_signal(READER_ORIGIN.offset(STROBE_OFFSET), true);

    let mut seen = Vec::new();
    for tick in 0..=(words * 2) {
        rig.registry.step_all(&mut rig.world);
        if tick == 0 {
            rig.world.set_signal(READER_ORIGIN.offset(STROBE_OFFSET), false);
        }
        if tick % 2 == 0 && seen.len() < words {
            seen.push(data_bus(&rig.world, READER_ORIGIN) as u8);
        }
    }
    seen
}

#[test]
fn round_trip_reproduces_every_word() {
    let mut rig = rig();
    let owner = OwnerId(1);
    rig.registry
        .register(owner, props(ConnMode::Write, WRITER_ORIGIN, 0, 1), &mut rig.world)
        .unwrap();
    rig.registry
        .register(owner, props(ConnMode::Read, READER_ORIGIN, 0, 1), &mut rig.world)
        .unwrap();

    let words = [0x01, 0x80, 0xA5, 0x5A, 0xFF, 0x00, 0x3C, 0xC3];
    run_write(&mut rig, 5, &words);

    assert_eq!(run_read(&mut rig, 5, 8), words);
    // A page nobody wrote reads as zeroes.
    assert_eq!(run_read(&mut rig, 6, 8), [0u8; 8]);
}

#[test]
fn all_address_bits_high_is_a_valid_page() {
    let mut rig = rig();
    let owner = OwnerId(1);
    rig.registry
        .register(owner, props(ConnMode::Write, WRITER_ORIGIN, 0, 1), &mut rig.world)
        .unwrap();
    rig.registry
        .register(owner, props(ConnMode::Read, READER_ORIGIN, 0, 1), &mut rig.world)
        .unwrap();

    let words = [9u8; 8];
    run_write(&mut rig, 15, &words);
    assert_eq!(run_read(&mut rig, 15, 8), words);

    let stored = std::fs::read(
        rig.registry
            .owner_sandbox(owner)
            .resolve("disk.bin")
            .unwrap(),
    )
    .unwrap();
    assert_eq!(stored.len(), 16 * 8);
    assert_eq!(&stored[15 * 8..], words);
}

#[test]
fn out_of_range_address_runs_but_persists_nothing() {
    let mut rig = rig();
    let owner = OwnerId(1);
    let mut write_props = props(ConnMode::Write, WRITER_ORIGIN, 0, 1);
    write_props.page_count = 10;
    rig.registry
        .register(owner, write_props, &mut rig.world)
        .unwrap();

    // Address 15 decodes fine but lies beyond the 10 configured pages.
    run_write(&mut rig, 15, &[0xEE; 8]);
    assert!(!rig
        .registry
        .owner_sandbox(owner)
        .resolve("disk.bin")
        .unwrap()
        .exists());
}

#[test]
fn slow_device_commits_one_page_at_the_right_offset() {
    let mut rig = rig();
    let owner = OwnerId(2);
    rig.registry
        .register(owner, props(ConnMode::Write, WRITER_ORIGIN, 24, 2), &mut rig.world)
        .unwrap();

    let words: Vec<u8> = (0x10..0x18).collect();
    drive_address(&mut rig.world, WRITER_ORIGIN, 0b0011);
    rig.world.set_signal(WRITER_ORIGIN.offset(STROBE_OFFSET), true);

    // First word at tick 2*24 = 48, one word per 2*2 = 4 ticks, terminal
    // check at tick 48 + 8*4 = 80.
    for tick in 1u32..=80 {
        let slot = if tick >= 48 { ((tick - 48) / 4).min(7) } else { 0 };
        set_data(&mut rig.world, WRITER_ORIGIN, u32::from(words[slot as usize]));
        rig.registry.step_all(&mut rig.world);
        if tick == 1 {
            rig.world.set_signal(WRITER_ORIGIN.offset(STROBE_OFFSET), false);
        }
    }

    let stored = std::fs::read(
        rig.registry
            .owner_sandbox(owner)
            .resolve("disk.bin")
            .unwrap(),
    )
    .unwrap();
    assert_eq!(stored.len(), 4 * 8);
    assert_eq!(&stored[3 * 8..], words.as_slice());
}
