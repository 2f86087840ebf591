//! # Layout Presets
//!
//! Named recipes for arranging a connection's bus lines, looked up by the
//! host at registration time. Every preset is a [`LayoutSpec`]: a pure
//! function of direction and bus widths.
//!
//! | Name      | Shape                                                      |
//! |-----------|------------------------------------------------------------|
//! | `line`    | Address then data in one straight run, 2 blocks apart      |
//! | `towers`  | One column per line, bits stacked vertically               |
//! | `diag:a1` | Diagonal staircase, address above, one-block rise          |
//! | `diag:b1` | Diagonal staircase, data above, one-block rise             |
//! | `diag:a2` | Diagonal staircase, address above, two-block rise          |
//! | `diag:b2` | Diagonal staircase, data above, two-block rise             |
//!
//! The diagonal and tower presets flip both lines so the physically lowest
//! or nearest position carries the least significant bit, which is how the
//! lines read most naturally when built by hand.

use hashbrown::HashMap;

use super::{BlockOffset, Direction, Layout};

/// Builds a [`Layout`] for the given direction and bus widths.
pub type LayoutSpec = fn(Direction, u32, u32) -> Layout;

fn line(dir: Direction, address_bits: u32, _data_bits: u32) -> Layout {
    let spacing = dir.spacing().mul(2);
    Layout {
        address: spacing,
        address_spacing: spacing,
        data: spacing.mul(1 + address_bits as i32),
        data_spacing: spacing,
    }
}

fn towers(dir: Direction, address_bits: u32, data_bits: u32) -> Layout {
    let spacing = dir.spacing().mul(2);
    Layout {
        address: spacing,
        address_spacing: BlockOffset::new(0, 2, 0),
        data: spacing.mul(2),
        data_spacing: BlockOffset::new(0, 2, 0),
    }
    .flip_address(address_bits)
    .flip_data(data_bits)
}

fn diag_a1(dir: Direction, address_bits: u32, data_bits: u32) -> Layout {
    let spacing = dir.spacing().add(BlockOffset::new(0, 1, 0)).mul(2);
    Layout {
        address: BlockOffset::new(0, 2, 0),
        address_spacing: spacing,
        data: dir.spacing().mul(2),
        data_spacing: spacing,
    }
    .flip_address(address_bits)
    .flip_data(data_bits)
}

fn diag_b1(dir: Direction, address_bits: u32, data_bits: u32) -> Layout {
    let spacing = dir.spacing().add(BlockOffset::new(0, 1, 0)).mul(2);
    Layout {
        address: dir.spacing().mul(2),
        address_spacing: spacing,
        data: BlockOffset::new(0, 2, 0),
        data_spacing: spacing,
    }
    .flip_address(address_bits)
    .flip_data(data_bits)
}

fn diag_a2(dir: Direction, address_bits: u32, data_bits: u32) -> Layout {
    let spacing = dir.spacing().add(BlockOffset::new(0, 1, 0)).mul(2);
    Layout {
        address: BlockOffset::new(0, 3, 0),
        address_spacing: spacing,
        data: dir.spacing().mul(3),
        data_spacing: spacing,
    }
    .flip_address(address_bits)
    .flip_data(data_bits)
}

fn diag_b2(dir: Direction, address_bits: u32, data_bits: u32) -> Layout {
    let spacing = dir.spacing().add(BlockOffset::new(0, 1, 0)).mul(2);
    Layout {
        address: dir.spacing().mul(3),
        address_spacing: spacing,
        data: BlockOffset::new(0, 3, 0),
        data_spacing: spacing,
    }
    .flip_address(address_bits)
    .flip_data(data_bits)
}

/// Registry of named layout presets.
pub struct Layouts {
    specs: HashMap<&'static str, LayoutSpec>,
}

impl Layouts {
    pub fn new() -> Self {
        let mut specs: HashMap<&'static str, LayoutSpec> = HashMap::new();
        specs.insert("line", line as LayoutSpec);
        specs.insert("towers", towers as LayoutSpec);
        specs.insert("diag:a1", diag_a1 as LayoutSpec);
        specs.insert("diag:b1", diag_b1 as LayoutSpec);
        specs.insert("diag:a2", diag_a2 as LayoutSpec);
        specs.insert("diag:b2", diag_b2 as LayoutSpec);
        Self { specs }
    }

    pub fn get(&self, name: &str) -> Option<LayoutSpec> {
        self.specs.get(name).copied()
    }

    pub fn default_spec(&self) -> LayoutSpec {
        line
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.specs.keys().copied()
    }
}

impl Default for Layouts {
    fn default() -> Self {
        Self::new()
    }
}
