//! # Material Palette
//!
//! The fixed materials a connection paints into the world, plus the named
//! color schemes owners can pick for their address and data lines. Schemes
//! are rendering-only: nothing in the state machine depends on which tags a
//! scheme carries.

use hashbrown::HashMap;

use super::MaterialTag;

/// Fixed material set shared by every connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Materials {
    /// Marker placed at the origin; its disappearance makes a connection
    /// stale.
    pub origin: MaterialTag,
    /// Shown on any bit or strobe position that is currently active.
    pub on_block: MaterialTag,
    /// Strobe marker for read-mode connections.
    pub read_bit: MaterialTag,
    /// Strobe marker for write-mode connections.
    pub write_bit: MaterialTag,
}

impl Default for Materials {
    fn default() -> Self {
        Self {
            origin: MaterialTag("sea_lantern"),
            on_block: MaterialTag("shroomlight"),
            read_bit: MaterialTag("lime_wool"),
            write_bit: MaterialTag("red_wool"),
        }
    }
}

/// Per-connection materials for the address and data lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorScheme {
    pub address: MaterialTag,
    pub data: MaterialTag,
}

/// Registry of named color schemes.
pub struct ColorSchemes {
    schemes: HashMap<&'static str, ColorScheme>,
}

impl ColorSchemes {
    pub fn new() -> Self {
        let mut schemes = HashMap::new();
        schemes.insert(
            "wool",
            ColorScheme {
                address: MaterialTag("blue_wool"),
                data: MaterialTag("brown_wool"),
            },
        );
        schemes.insert(
            "capo",
            ColorScheme {
                address: MaterialTag("purple_terracotta"),
                data: MaterialTag("blue_terracotta"),
            },
        );
        Self { schemes }
    }

    pub fn get(&self, name: &str) -> Option<ColorScheme> {
        self.schemes.get(name).copied()
    }

    pub fn default_scheme(&self) -> ColorScheme {
        self.schemes["wool"]
    }
}

impl Default for ColorSchemes {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_schemes_resolve() {
        let schemes = ColorSchemes::new();
        assert!(schemes.get("wool").is_some());
        assert!(schemes.get("capo").is_some());
        assert!(schemes.get("plaid").is_none());
        assert_eq!(schemes.default_scheme(), schemes.get("wool").unwrap());
    }
}
